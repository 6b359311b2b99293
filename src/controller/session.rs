//! Interaction phases and per-session state.
//!
//! [`Phase`] drives the controller's state machine.  [`Session`] carries the
//! current cycle number plus everything needed to derive what the window
//! shows; [`Session::snapshot`] is that derivation, shared by the startup
//! path and the tests.
//!
//! The cycle number is the only staleness mechanism in the app: every
//! recognizer signal and every interpret reply is tagged with the cycle it
//! belongs to, and the controller discards anything tagged with an older
//! cycle.  Nothing is ever cancelled; late work is simply ignored.

use crate::display::{DisplaySnapshot, Messages, StatusCategory, StatusLine, TriggerMode};
use crate::service::ServerReply;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Phases of one voice interaction.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──activate──▶ Listening
///          ──transcript──▶ Awaiting ──reply ok──▶ Done
///          │                        ──reply err─▶ Errored
///          ──recognizer error──▶ Idle (error status shown)
///          ──ended, nothing captured──▶ Idle
/// Done / Errored ──activate──▶ Listening   (next cycle)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to start a turn.
    Idle,

    /// A listening cycle is underway; the recognizer owns the microphone.
    Listening,

    /// A transcript was accepted and sent to the interpretation server.
    Awaiting,

    /// The server's reply has been rendered.
    Done,

    /// The request failed (transport or application error).  The next
    /// activation starts a fresh cycle.
    Errored,
}

impl Phase {
    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Listening => "Listening",
            Phase::Awaiting => "Awaiting",
            Phase::Done => "Done",
            Phase::Errored => "Errored",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// What went wrong, when something did.
///
/// Distinguishes the three ways a turn can fail because each renders
/// differently: a recognition failure keeps the session in `Idle` with an
/// error status, while transport and application failures end the turn in
/// `Errored` with different reply-surface texts.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The recognizer reported a platform error code mid-cycle.
    Recognition(String),
    /// The server could not be reached, timed out, or answered garbage.
    Transport,
    /// The server answered properly but reported a domain error.
    Application,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything the controller knows about the current interaction.
///
/// Plain data; all mutation happens in the controller's event handlers, and
/// the display derivations below are the only readers.
#[derive(Debug, Clone)]
pub struct Session {
    /// Current phase of the interaction.
    pub phase: Phase,

    /// Monotonic cycle counter.  `0` until the first turn begins; bumped by
    /// every voice activation and every typed submission.
    pub cycle: u64,

    /// `true` when no speech backend exists.  Voice stays disabled for the
    /// whole session; typed commands still work.
    pub unsupported: bool,

    /// The recognizer confirmed capture is live for the current cycle.
    pub recognizer_started: bool,

    /// The recognizer finished winding down for the current cycle (or was
    /// never involved, for typed turns).
    pub recognizer_done: bool,

    /// The accepted transcript for the current cycle.
    pub transcript: Option<String>,

    /// The server's reply for the current cycle, once it arrived.
    pub reply: Option<ServerReply>,

    /// What failed, when `phase` is `Errored` or an error status is shown
    /// in `Idle`.
    pub failure: Option<Failure>,
}

impl Session {
    /// Fresh session.  `unsupported` is fixed for the session's lifetime.
    pub fn new(unsupported: bool) -> Self {
        Self {
            phase: Phase::Idle,
            cycle: 0,
            unsupported,
            recognizer_started: false,
            recognizer_done: false,
            transcript: None,
            reply: None,
            failure: None,
        }
    }

    /// `true` while the recognizer owns the microphone: listening, or a
    /// request is in flight and the backend has not yet wound down.
    ///
    /// ```
    /// use voice_assistant::controller::{Phase, Session};
    ///
    /// let mut session = Session::new(false);
    /// assert!(!session.recognizer_engaged());
    /// session.phase = Phase::Listening;
    /// assert!(session.recognizer_engaged());
    /// ```
    pub fn recognizer_engaged(&self) -> bool {
        match self.phase {
            Phase::Listening => true,
            Phase::Awaiting => !self.recognizer_done,
            _ => false,
        }
    }

    /// What the voice button currently does.
    pub fn trigger(&self) -> TriggerMode {
        if self.unsupported {
            return TriggerMode::Disabled;
        }
        match self.phase {
            Phase::Listening => TriggerMode::Stop,
            _ if self.recognizer_engaged() => TriggerMode::Disabled,
            _ => TriggerMode::Start,
        }
    }

    /// The status line for the current state.
    pub fn status(&self, messages: &Messages) -> StatusLine {
        if self.unsupported {
            return StatusLine::new(StatusCategory::Error, messages.unsupported.clone());
        }
        match self.phase {
            Phase::Idle => match &self.failure {
                Some(Failure::Recognition(code)) => {
                    StatusLine::new(StatusCategory::Error, messages.recognition_error(code))
                }
                _ => StatusLine::new(StatusCategory::Ready, messages.ready.clone()),
            },
            Phase::Listening if self.recognizer_started => {
                StatusLine::new(StatusCategory::Listening, messages.listening.clone())
            }
            // Activated but capture not yet confirmed.
            Phase::Listening => StatusLine::new(StatusCategory::Ready, messages.ready.clone()),
            Phase::Awaiting => {
                StatusLine::new(StatusCategory::Processing, messages.processing.clone())
            }
            Phase::Done => StatusLine::new(StatusCategory::Success, messages.success.clone()),
            Phase::Errored => match &self.failure {
                Some(Failure::Transport) => {
                    StatusLine::new(StatusCategory::Error, messages.connection_status.clone())
                }
                _ => StatusLine::new(StatusCategory::Error, messages.application_status.clone()),
            },
        }
    }

    /// The reply-surface text for the current state.
    pub fn response_text(&self, messages: &Messages) -> String {
        match self.phase {
            Phase::Done => self
                .reply
                .as_ref()
                .map(|reply| reply.text.clone())
                .unwrap_or_default(),
            Phase::Errored => match &self.failure {
                Some(Failure::Transport) => messages.connection_error.clone(),
                _ => messages.apology.clone(),
            },
            _ => String::new(),
        }
    }

    /// Derive the full window contents for this session.
    pub fn snapshot(&self, messages: &Messages) -> DisplaySnapshot {
        DisplaySnapshot {
            status: self.status(messages),
            transcript: self.transcript.clone().unwrap_or_default(),
            response: self.response_text(messages),
            trigger: self.trigger(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
