//! Built-in recognizer that simulates a speech platform.
//!
//! [`SimulatedRecognizer`] emits a configurable phrase after a short
//! listening window, honouring the full signal contract (`Started`, then
//! optionally `Result`, then `Ended`).  It is the default backend: demos
//! work out of the box, and platforms without a native speech engine still
//! get a complete interaction loop.  The signal timing runs on spawned tokio
//! tasks, exactly as a real platform binding would deliver callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::RecognitionConfig;
use crate::controller::ControllerEvent;
use crate::recognize::adapter::{RecognizerError, RecognizerSignal, SpeechRecognizer};

/// Delay before `Started` is emitted, standing in for microphone warm-up.
const STARTUP_DELAY: Duration = Duration::from_millis(150);

/// How long the simulated capture window stays open before the canned
/// phrase is "recognised".
const CAPTURE_WINDOW: Duration = Duration::from_millis(900);

// ---------------------------------------------------------------------------
// SimulatedRecognizer
// ---------------------------------------------------------------------------

/// Emits a canned phrase on a timer, via the controller's event queue.
///
/// `RecognitionConfig::language` is ignored by this backend; only platform
/// bindings use it.
pub struct SimulatedRecognizer {
    events: mpsc::Sender<ControllerEvent>,
    phrase: String,
    active: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl SimulatedRecognizer {
    /// Build a recognizer that reports into `events`.
    pub fn from_config(config: &RecognitionConfig, events: mpsc::Sender<ControllerEvent>) -> Self {
        Self {
            events,
            phrase: config.simulated_phrase.clone(),
            active: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
        }
    }
}

impl SpeechRecognizer for SimulatedRecognizer {
    fn start(&mut self, cycle: u64) -> Result<(), RecognizerError> {
        if self.active.load(Ordering::SeqCst) {
            return Err(RecognizerError::AlreadyActive);
        }
        self.active.store(true, Ordering::SeqCst);

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let events = self.events.clone();
        let phrase = self.phrase.clone();
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            tokio::time::sleep(STARTUP_DELAY).await;
            let _ = events
                .send(ControllerEvent::Recognizer {
                    cycle,
                    signal: RecognizerSignal::Started,
                })
                .await;

            tokio::select! {
                _ = &mut stop_rx => {
                    // Stopped early — no transcript for this cycle.
                }
                _ = tokio::time::sleep(CAPTURE_WINDOW) => {
                    let _ = events
                        .send(ControllerEvent::Recognizer {
                            cycle,
                            signal: RecognizerSignal::Result(phrase),
                        })
                        .await;
                }
            }

            // `active` must read false by the time `Ended` is observable,
            // or an immediate restart would be rejected.
            active.store(false, Ordering::SeqCst);
            let _ = events
                .send(ControllerEvent::Recognizer {
                    cycle,
                    signal: RecognizerSignal::Ended,
                })
                .await;
        });

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Err here means the cycle already finished on its own.
            let _ = stop_tx.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
