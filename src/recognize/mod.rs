//! Speech-recognition module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               SpeechRecognizer (trait)                  │
//! │                                                         │
//! │   controller ──start(cycle)──▶ backend                  │
//! │              ──stop()───────▶                           │
//! │                                                         │
//! │   backend ──RecognizerSignal{Started,Result,            │
//! │              Error,Ended} tagged with cycle──▶ events   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends never mutate state directly; they push cycle-tagged signals
//! into the controller's event queue and the controller decides what (if
//! anything) each signal means for the current cycle.

pub mod adapter;
pub mod simulated;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use adapter::{RecognizerError, RecognizerSignal, SpeechRecognizer};
pub use simulated::SimulatedRecognizer;

// test-only re-export so the controller test module can import the mock
// without `use voice_assistant::recognize::adapter::MockRecognizer`.
#[cfg(test)]
pub use adapter::{MockRecognizer, RecognizerCall};
