//! Controller module for the voice assistant.
//!
//! This module wires the full activate → listen → interpret → render loop
//! and owns every piece of mutable interaction state.
//!
//! # Architecture
//!
//! ```text
//! ControllerEvent (mpsc)  ← UI button/input, recognizer signals,
//!        │                   interpret replies, follow-up timers
//!        ▼
//! VoiceController::run()  ← async tokio task, the only writer
//!        │
//!        ├─ Activated / TextSubmitted → bump cycle, start work
//!        ├─ Recognizer { cycle, … }   → dropped when cycle is stale
//!        └─ Reply { cycle, … }        → dropped when cycle is stale
//!
//! DisplayUpdate (unbounded mpsc) ──▶ drained by egui update() each frame
//! ```
//!
//! Spawned tasks (HTTP interpret, follow-up timers) hold a clone of the
//! event sender and re-enter the queue instead of mutating anything, so
//! every transition happens in one place and in one order.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use voice_assistant::config::AppConfig;
//! use voice_assistant::controller::VoiceController;
//! use voice_assistant::display::Messages;
//! use voice_assistant::recognize::SimulatedRecognizer;
//! use voice_assistant::service::HttpResponseService;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let (events_tx, events_rx) = mpsc::channel(32);
//!     let (display_tx, _display_rx) = mpsc::unbounded_channel();
//!
//!     let recognizer = SimulatedRecognizer::from_config(&config.recognition, events_tx.clone());
//!     let service = Arc::new(HttpResponseService::from_config(&config.service));
//!
//!     let controller = VoiceController::new(
//!         Some(Box::new(recognizer)),
//!         service,
//!         display_tx,
//!         events_tx.clone(),
//!         Messages::default(),
//!         Duration::from_millis(config.service.follow_up_delay_ms),
//!     );
//!
//!     tokio::spawn(async move { controller.run(events_rx).await });
//!
//!     // events_tx is handed to the UI for button and input events.
//! }
//! ```

pub mod machine;
pub mod session;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use machine::{ControllerEvent, VoiceController};
pub use session::{Failure, Phase, Session};
