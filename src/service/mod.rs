//! Interpretation-server module for the voice assistant.
//!
//! This module provides:
//! * [`ResponseService`] — async trait implemented by all interpret backends.
//! * [`HttpResponseService`] — JSON-over-HTTP backend (the normal one).
//! * [`ServerReply`] — normalised reply, shape-tolerant via
//!   [`ServerReply::from_wire`].
//! * [`ServiceError`] — error variants for interpret operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_assistant::config::AppConfig;
//! use voice_assistant::service::{HttpResponseService, ResponseService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let service = HttpResponseService::from_config(&config.service);
//!
//!     match service.interpret("Que dit Jean 3 verset 16 ?").await {
//!         Ok(reply) if reply.is_error() => println!("erreur: {:?}", reply.error_message),
//!         Ok(reply) => println!("{}", reply.text),
//!         Err(e) => eprintln!("transport: {e}"),
//!     }
//! }
//! ```

pub mod client;
pub mod reply;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HttpResponseService, ResponseService, ServiceError};
pub use reply::ServerReply;
