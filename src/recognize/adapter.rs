//! Core `SpeechRecognizer` trait and recognizer signals.
//!
//! # Overview
//!
//! [`SpeechRecognizer`] is the interface the controller drives.  A backend
//! is owned exclusively by the controller task (`Box<dyn SpeechRecognizer>`),
//! so the trait only requires `Send`, not `Sync`.
//!
//! Backends report what happens during a listening cycle by sending
//! [`RecognizerSignal`] values into the controller's event queue, each tagged
//! with the cycle number that was passed to [`SpeechRecognizer::start`].
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) records every call so
//! controller tests can assert on start/stop behaviour without timers.

use thiserror::Error;

// ---------------------------------------------------------------------------
// RecognizerSignal
// ---------------------------------------------------------------------------

/// What a recognizer backend reports during one listening cycle.
///
/// # Contract
///
/// Per successful [`SpeechRecognizer::start`] call, a backend emits:
/// - zero or one `Started`,
/// - zero or one `Result`,
/// - zero or one `Error`,
/// - exactly one `Ended`, always last.
///
/// Any prefix is legal (a backend may die before confirming capture, or end
/// without ever producing text).  Nothing may follow `Ended`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerSignal {
    /// Capture is live; the user is being listened to.
    Started,
    /// A final transcript for this cycle.
    Result(String),
    /// The backend failed mid-cycle; carries the platform error code
    /// (e.g. `"no-speech"`, `"audio-capture"`).
    Error(String),
    /// The cycle is over, whatever happened before.
    Ended,
}

// ---------------------------------------------------------------------------
// RecognizerError
// ---------------------------------------------------------------------------

/// Errors returned synchronously by [`SpeechRecognizer::start`].
#[derive(Debug, Clone, Error)]
pub enum RecognizerError {
    /// A listening cycle is already running; stop it first.
    #[error("recognition is already active")]
    AlreadyActive,

    /// The backend could not begin capturing.
    #[error("recognizer failed to start: {0}")]
    StartFailed(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// Interface for speech-recognition backends.
///
/// `start` begins one listening cycle; every signal the backend emits for
/// that cycle must carry the given `cycle` number so stale signals from an
/// abandoned cycle can be told apart from current ones.  `stop` asks the
/// backend to wind down early — it must still emit `Ended` for the cycle,
/// and `stop` on an inactive backend is a no-op.
pub trait SpeechRecognizer: Send {
    /// Begin a listening cycle tagged with `cycle`.
    fn start(&mut self, cycle: u64) -> Result<(), RecognizerError>;

    /// Ask the current cycle to finish early.
    fn stop(&mut self);
}

// Compile-time assertion: Box<dyn SpeechRecognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// Call recorded by [`MockRecognizer`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerCall {
    Start(u64),
    Stop,
}

/// A test double that records calls instead of capturing audio.
///
/// The controller test drives recognizer signals into the event queue by
/// hand, so the mock never emits anything itself.
#[cfg(test)]
pub struct MockRecognizer {
    calls: std::sync::Arc<std::sync::Mutex<Vec<RecognizerCall>>>,
    start_error: Option<RecognizerError>,
}

#[cfg(test)]
impl MockRecognizer {
    /// Create a mock whose `start` always succeeds, plus a handle to its
    /// call log.
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<RecognizerCall>>>) {
        let calls = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                calls: std::sync::Arc::clone(&calls),
                start_error: None,
            },
            calls,
        )
    }

    /// Create a mock whose `start` always fails with `error`.
    pub fn failing(
        error: RecognizerError,
    ) -> (Self, std::sync::Arc<std::sync::Mutex<Vec<RecognizerCall>>>) {
        let (mut mock, calls) = Self::new();
        mock.start_error = Some(error);
        (mock, calls)
    }
}

#[cfg(test)]
impl SpeechRecognizer for MockRecognizer {
    fn start(&mut self, cycle: u64) -> Result<(), RecognizerError> {
        self.calls.lock().unwrap().push(RecognizerCall::Start(cycle));
        match &self.start_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.calls.lock().unwrap().push(RecognizerCall::Stop);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_start_cycles_and_stops() {
        let (mut mock, calls) = MockRecognizer::new();

        mock.start(1).expect("start");
        mock.stop();
        mock.start(2).expect("start");

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                RecognizerCall::Start(1),
                RecognizerCall::Stop,
                RecognizerCall::Start(2)
            ]
        );
    }

    #[test]
    fn failing_mock_returns_configured_error() {
        let (mut mock, calls) = MockRecognizer::failing(RecognizerError::StartFailed(
            "microphone busy".into(),
        ));

        let err = mock.start(1).unwrap_err();
        assert!(matches!(err, RecognizerError::StartFailed(_)));
        assert_eq!(*calls.lock().unwrap(), vec![RecognizerCall::Start(1)]);
    }

    #[test]
    fn box_dyn_recognizer_compiles() {
        // If this test compiles, the trait is object-safe.
        let (mock, _calls) = MockRecognizer::new();
        let mut recognizer: Box<dyn SpeechRecognizer> = Box::new(mock);
        recognizer.stop();
    }

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            RecognizerError::AlreadyActive.to_string(),
            "recognition is already active"
        );
        assert!(RecognizerError::StartFailed("mic gone".into())
            .to_string()
            .contains("mic gone"));
    }
}
