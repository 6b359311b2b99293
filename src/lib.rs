//! Voice assistant — floating desktop widget backed by an HTTP
//! interpretation server.
//!
//! The assistant runs one conversation turn at a time: capture a spoken or
//! typed command, send it to the interpretation server, render the answer,
//! and (when the server asks for it) open a follow-up page in the browser.
//! The crate is split along those seams:
//!
//! ```text
//!   ┌────────────┐   ControllerEvent    ┌──────────────────────┐
//!   │ app (egui) │ ───────────────────▶ │ controller           │
//!   │            │ ◀─────────────────── │  session + run loop  │
//!   └────────────┘    DisplayUpdate     └─────┬──────────┬─────┘
//!                                  start/stop │          │ interpret
//!                                             ▼          ▼
//!                                      ┌───────────┐ ┌─────────┐
//!                                      │ recognize │ │ service │
//!                                      └───────────┘ └─────────┘
//! ```
//!
//! * [`config`]     — TOML settings and on-disk paths.
//! * [`display`]    — plain data types describing what the window shows.
//! * [`recognize`]  — speech-capture backends behind a common trait.
//! * [`service`]    — HTTP client and reply normalisation.
//! * [`controller`] — the state machine that sequences a turn.
//! * [`app`]        — the egui/eframe floating widget.

pub mod app;
pub mod config;
pub mod controller;
pub mod display;
pub mod recognize;
pub mod service;
