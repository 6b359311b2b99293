//! Voice controller — drives the activate → listen → interpret → render loop.
//!
//! [`VoiceController`] owns the [`Session`] and responds to
//! [`ControllerEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Event flow
//!
//! ```text
//! ControllerEvent::Activated
//!   ├─ trigger Start → cycle += 1, recognizer.start(cycle)   [Listening]
//!   ├─ trigger Stop  → recognizer.stop()  (Ended will follow)
//!   └─ trigger Disabled → ignored
//!
//! ControllerEvent::Recognizer { cycle, signal }     (stale cycle → dropped)
//!   ├─ Started      → clear surfaces, show listening
//!   ├─ Result(text) → spawn interpret task            [Awaiting]
//!   ├─ Error(code)  → show code, back to ready        [Idle]
//!   └─ Ended        → re-enable the trigger; ready if nothing was captured
//!
//! ControllerEvent::Reply { cycle, outcome }          (stale cycle → dropped)
//!   ├─ Ok, success  → render text, schedule follow-up [Done]
//!   ├─ Ok, error    → apology                         [Errored]
//!   └─ Err          → connection error                [Errored]
//! ```
//!
//! All state changes happen inside [`VoiceController::handle_event`], on the
//! controller task.  Spawned work (interpret requests, follow-up timers)
//! never touches the session or the display directly; it re-enters the
//! event queue through the controller's own sender, tagged with the cycle it
//! was spawned for, and the cycle check on arrival decides whether it still
//! matters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::display::{DisplayUpdate, Messages, StatusCategory, StatusLine, TriggerMode};
use crate::recognize::{RecognizerSignal, SpeechRecognizer};
use crate::service::{ResponseService, ServerReply, ServiceError};

use super::session::{Failure, Phase, Session};

// ---------------------------------------------------------------------------
// ControllerEvent
// ---------------------------------------------------------------------------

/// Everything that can happen to the controller, from any source.
#[derive(Debug)]
pub enum ControllerEvent {
    /// The user pressed the voice button.
    Activated,

    /// The user submitted a typed command.
    TextSubmitted(String),

    /// A recognizer backend reported progress for `cycle`.
    Recognizer {
        cycle: u64,
        signal: RecognizerSignal,
    },

    /// The interpret task spawned for `cycle` finished.
    Reply {
        cycle: u64,
        outcome: Result<ServerReply, ServiceError>,
    },

    /// The post-reply delay elapsed; time to open the follow-up page.
    FollowUpDue { url: String },

    /// Stop the controller loop.  Needed because the controller holds a
    /// clone of its own sender, so the channel never closes on its own.
    Shutdown,
}

// ---------------------------------------------------------------------------
// VoiceController
// ---------------------------------------------------------------------------

/// Drives the complete voice-interaction loop.
///
/// Create with [`VoiceController::new`], then call [`run`](Self::run) inside
/// a tokio task.
pub struct VoiceController {
    session: Session,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    service: Arc<dyn ResponseService>,
    display_tx: mpsc::UnboundedSender<DisplayUpdate>,
    events_tx: mpsc::Sender<ControllerEvent>,
    messages: Messages,
    follow_up_delay: Duration,
}

impl VoiceController {
    /// Create a new controller.
    ///
    /// # Arguments
    ///
    /// * `recognizer`      — speech backend, or `None` when the platform has
    ///   none (voice is then reported unsupported for the whole session).
    /// * `service`         — interpret backend (e.g. `HttpResponseService`).
    /// * `display_tx`      — channel the UI drains every frame.
    /// * `events_tx`       — clone of the sender feeding [`run`](Self::run);
    ///   spawned tasks use it to re-enter the event queue.
    /// * `messages`        — user-facing strings.
    /// * `follow_up_delay` — wait between rendering a reply and opening its
    ///   follow-up URL.
    pub fn new(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        service: Arc<dyn ResponseService>,
        display_tx: mpsc::UnboundedSender<DisplayUpdate>,
        events_tx: mpsc::Sender<ControllerEvent>,
        messages: Messages,
        follow_up_delay: Duration,
    ) -> Self {
        let session = Session::new(recognizer.is_none());
        Self {
            session,
            recognizer,
            service,
            display_tx,
            events_tx,
            messages,
            follow_up_delay,
        }
    }

    /// The current session, for callers that want to inspect state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the controller until a [`ControllerEvent::Shutdown`] arrives or
    /// `events_rx` closes.
    ///
    /// Presents the initial window state first, so the UI shows something
    /// sensible before the first interaction.
    pub async fn run(mut self, mut events_rx: mpsc::Receiver<ControllerEvent>) {
        self.present();
        if self.session.unsupported {
            log::warn!("controller: no speech backend — voice disabled, typed commands only");
        }

        while let Some(event) = events_rx.recv().await {
            if matches!(event, ControllerEvent::Shutdown) {
                log::info!("controller: shutdown requested");
                break;
            }
            self.handle_event(event);
        }

        log::info!("controller: event loop finished");
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    /// Apply one event to the session.  Synchronous: every transition
    /// completes before the next event is looked at.
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Activated => self.handle_activated(),
            ControllerEvent::TextSubmitted(text) => self.handle_text(text),
            ControllerEvent::Recognizer { cycle, signal } => {
                self.handle_recognizer(cycle, signal)
            }
            ControllerEvent::Reply { cycle, outcome } => self.handle_reply(cycle, outcome),
            ControllerEvent::FollowUpDue { url } => self.handle_follow_up_due(url),
            // Consumed by run(); nothing to do when called directly.
            ControllerEvent::Shutdown => {}
        }
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// The voice button: what it does depends on what it currently shows.
    fn handle_activated(&mut self) {
        match self.session.trigger() {
            TriggerMode::Disabled => {
                log::debug!("controller: activation ignored (trigger disabled)");
            }
            TriggerMode::Stop => {
                log::debug!("controller: stop requested for cycle {}", self.session.cycle);
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                // The session stays in Listening until the backend emits
                // Ended for this cycle.
            }
            TriggerMode::Start => self.begin_voice_cycle(),
        }
    }

    /// Bump the cycle counter and start listening.
    fn begin_voice_cycle(&mut self) {
        let recognizer = match self.recognizer.as_mut() {
            Some(recognizer) => recognizer,
            // Unsupported sessions report Disabled, so this arm is
            // unreachable through handle_activated.
            None => return,
        };

        self.session.cycle += 1;
        let cycle = self.session.cycle;
        self.session.phase = Phase::Listening;
        self.session.recognizer_started = false;
        self.session.recognizer_done = false;
        self.session.failure = None;

        match recognizer.start(cycle) {
            Ok(()) => {
                log::debug!("controller: cycle {cycle} listening");
                self.push(DisplayUpdate::Trigger(TriggerMode::Stop));
            }
            Err(e) => {
                let code = e.to_string();
                log::warn!("controller: cycle {cycle} failed to start: {code}");
                self.session.phase = Phase::Idle;
                self.session.recognizer_done = true;
                self.session.failure = Some(Failure::Recognition(code.clone()));

                self.push(DisplayUpdate::Status(StatusLine::new(
                    StatusCategory::Error,
                    self.messages.recognition_error(&code),
                )));
                self.push(DisplayUpdate::Trigger(TriggerMode::Start));
            }
        }
    }

    /// A typed command takes a full turn of its own, staling any in-flight
    /// voice work by bumping the cycle.  Ignored while the recognizer is
    /// engaged; works even when voice is unsupported.
    fn handle_text(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            log::debug!("controller: empty typed command ignored");
            return;
        }
        if self.session.recognizer_engaged() {
            log::debug!("controller: typed command ignored while the recognizer is engaged");
            return;
        }

        self.session.cycle += 1;
        let cycle = self.session.cycle;
        self.session.phase = Phase::Awaiting;
        self.session.recognizer_started = false;
        // No recognizer runs for a typed turn.
        self.session.recognizer_done = true;
        self.session.failure = None;
        self.session.transcript = Some(text.clone());
        self.session.reply = None;

        log::info!("controller: cycle {cycle} typed command: {text:?}");

        self.push(DisplayUpdate::Transcript(text.clone()));
        self.push(DisplayUpdate::Response(String::new()));
        self.push(DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Processing,
            self.messages.processing.clone(),
        )));
        self.push(DisplayUpdate::Trigger(self.session.trigger()));
        self.spawn_interpret(cycle, text);
    }

    /// Route one recognizer signal, dropping it if its cycle is stale.
    fn handle_recognizer(&mut self, cycle: u64, signal: RecognizerSignal) {
        if cycle != self.session.cycle {
            log::debug!(
                "controller: dropping stale recognizer signal for cycle {cycle} (current {})",
                self.session.cycle
            );
            return;
        }

        match signal {
            RecognizerSignal::Started => self.on_capture_started(),
            RecognizerSignal::Result(text) => self.on_transcript(cycle, text),
            RecognizerSignal::Error(code) => self.on_recognition_error(code),
            RecognizerSignal::Ended => self.on_capture_ended(),
        }
    }

    /// Capture confirmed: wipe the previous turn off the screen.
    fn on_capture_started(&mut self) {
        if self.session.phase != Phase::Listening {
            log::debug!("controller: Started signal outside Listening ignored");
            return;
        }
        self.session.recognizer_started = true;
        self.session.transcript = None;
        self.session.reply = None;

        self.push(DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Listening,
            self.messages.listening.clone(),
        )));
        self.push(DisplayUpdate::Transcript(String::new()));
        self.push(DisplayUpdate::Response(String::new()));
    }

    /// A transcript was produced: show it and hand it to the server.
    fn on_transcript(&mut self, cycle: u64, text: String) {
        if self.session.phase != Phase::Listening {
            log::debug!("controller: transcript outside Listening ignored");
            return;
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            log::debug!("controller: cycle {cycle} produced an empty transcript — ignored");
            return;
        }

        log::info!("controller: cycle {cycle} transcript: {text:?}");
        self.session.transcript = Some(text.clone());
        self.session.phase = Phase::Awaiting;

        self.push(DisplayUpdate::Transcript(text.clone()));
        self.push(DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Processing,
            self.messages.processing.clone(),
        )));
        self.push(DisplayUpdate::Trigger(self.session.trigger()));
        self.spawn_interpret(cycle, text);
    }

    /// The platform failed mid-capture: show the code, return to ready.
    ///
    /// After a transcript is accepted the interpret request decides the
    /// outcome; a late recognizer error is dropped.
    fn on_recognition_error(&mut self, code: String) {
        if self.session.phase != Phase::Listening {
            log::debug!("controller: recognizer error {code:?} outside Listening ignored");
            return;
        }
        log::warn!("controller: recognition error: {code}");
        self.session.phase = Phase::Idle;
        self.session.failure = Some(Failure::Recognition(code.clone()));

        self.push(DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Error,
            self.messages.recognition_error(&code),
        )));
        self.push(DisplayUpdate::Trigger(TriggerMode::Start));
    }

    /// The cycle's capture is over, whatever happened during it.
    ///
    /// Still Listening here means the cycle produced neither transcript nor
    /// error: return to ready.  In every other phase the screen stands as
    /// it is and only the trigger is refreshed.
    fn on_capture_ended(&mut self) {
        self.session.recognizer_done = true;
        log::debug!("controller: cycle {} capture ended", self.session.cycle);

        if self.session.phase == Phase::Listening {
            self.session.phase = Phase::Idle;
            self.push(DisplayUpdate::Status(StatusLine::new(
                StatusCategory::Ready,
                self.messages.ready.clone(),
            )));
        }
        self.push(DisplayUpdate::Trigger(self.session.trigger()));
    }

    /// Apply an interpret outcome, dropping it if its cycle is stale.
    fn handle_reply(&mut self, cycle: u64, outcome: Result<ServerReply, ServiceError>) {
        if cycle != self.session.cycle {
            log::info!(
                "controller: dropping stale reply for cycle {cycle} (current {})",
                self.session.cycle
            );
            return;
        }
        if self.session.phase != Phase::Awaiting {
            log::warn!(
                "controller: reply for cycle {cycle} arrived in phase {} — ignored",
                self.session.phase.label()
            );
            return;
        }

        match outcome {
            Ok(reply) if reply.is_error() => {
                log::warn!(
                    "controller: cycle {cycle} application error: {:?}",
                    reply.error_message
                );
                self.session.phase = Phase::Errored;
                self.session.failure = Some(Failure::Application);
                self.session.reply = Some(reply);

                // The server's own message is log-only; the user gets the
                // fixed apology.
                self.push(DisplayUpdate::Response(self.messages.apology.clone()));
                self.push(DisplayUpdate::Status(StatusLine::new(
                    StatusCategory::Error,
                    self.messages.application_status.clone(),
                )));
            }
            Ok(reply) => {
                log::info!("controller: cycle {cycle} reply: {:?}", reply.text);
                self.session.phase = Phase::Done;
                self.session.failure = None;

                self.push(DisplayUpdate::Response(reply.text.clone()));
                self.push(DisplayUpdate::Status(StatusLine::new(
                    StatusCategory::Success,
                    self.messages.success.clone(),
                )));
                if let Some(url) = reply.follow_up_url.clone() {
                    self.schedule_follow_up(cycle, url);
                }
                self.session.reply = Some(reply);
            }
            Err(e) => {
                log::error!("controller: cycle {cycle} interpret failed: {e}");
                self.session.phase = Phase::Errored;
                self.session.failure = Some(Failure::Transport);

                self.push(DisplayUpdate::Response(self.messages.connection_error.clone()));
                self.push(DisplayUpdate::Status(StatusLine::new(
                    StatusCategory::Error,
                    self.messages.connection_status.clone(),
                )));
            }
        }

        self.push(DisplayUpdate::Trigger(self.session.trigger()));
    }

    /// The follow-up delay elapsed.  Fire-and-forget: no cycle check, the
    /// page opens even if a new turn started meanwhile.
    fn handle_follow_up_due(&mut self, url: String) {
        log::info!("controller: opening follow-up page: {url}");
        self.push(DisplayUpdate::OpenFollowUp(url));
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Push the whole session onto the display channel.
    fn present(&self) {
        let snapshot = self.session.snapshot(&self.messages);
        self.push(DisplayUpdate::Status(snapshot.status));
        self.push(DisplayUpdate::Transcript(snapshot.transcript));
        self.push(DisplayUpdate::Response(snapshot.response));
        self.push(DisplayUpdate::Trigger(snapshot.trigger));
    }

    fn push(&self, update: DisplayUpdate) {
        // The UI owning the receiver may already be gone during shutdown.
        let _ = self.display_tx.send(update);
    }

    /// Send the transcript to the server off the controller task; the
    /// outcome re-enters the queue as a cycle-tagged Reply event.
    fn spawn_interpret(&self, cycle: u64, transcript: String) {
        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = service.interpret(&transcript).await;
            let _ = events.send(ControllerEvent::Reply { cycle, outcome }).await;
        });
    }

    /// Arrange for the follow-up page to open after the configured delay.
    fn schedule_follow_up(&self, cycle: u64, url: String) {
        let events = self.events_tx.clone();
        let delay = self.follow_up_delay;
        log::debug!(
            "controller: cycle {cycle} follow-up in {} ms: {url}",
            delay.as_millis()
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ControllerEvent::FollowUpDue { url }).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognize::{MockRecognizer, RecognizerCall, RecognizerError};
    use async_trait::async_trait;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Interpret backend that never answers — replies are injected by hand.
    struct PendingService;

    #[async_trait]
    impl ResponseService for PendingService {
        async fn interpret(&self, _transcript: &str) -> Result<ServerReply, ServiceError> {
            std::future::pending().await
        }
    }

    /// Interpret backend that answers every transcript the same way.
    struct ScriptedService(Result<ServerReply, ServiceError>);

    #[async_trait]
    impl ResponseService for ScriptedService {
        async fn interpret(&self, _transcript: &str) -> Result<ServerReply, ServiceError> {
            self.0.clone()
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn reply(text: &str) -> ServerReply {
        ServerReply {
            text: text.into(),
            error_message: None,
            follow_up_url: None,
        }
    }

    fn make_controller(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        service: Arc<dyn ResponseService>,
    ) -> (
        VoiceController,
        mpsc::Receiver<ControllerEvent>,
        mpsc::UnboundedReceiver<DisplayUpdate>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(32);
        let (display_tx, display_rx) = mpsc::unbounded_channel();
        let controller = VoiceController::new(
            recognizer,
            service,
            display_tx,
            events_tx,
            Messages::default(),
            Duration::from_millis(20),
        );
        (controller, events_rx, display_rx)
    }

    fn recognizer_event(cycle: u64, signal: RecognizerSignal) -> ControllerEvent {
        ControllerEvent::Recognizer { cycle, signal }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DisplayUpdate>) -> Vec<DisplayUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    fn last_trigger(updates: &[DisplayUpdate]) -> Option<TriggerMode> {
        updates.iter().rev().find_map(|update| match update {
            DisplayUpdate::Trigger(mode) => Some(*mode),
            _ => None,
        })
    }

    /// Drive a fresh controller through activation, capture confirmation and
    /// a transcript — leaves it in Awaiting for cycle 1.
    fn to_awaiting(controller: &mut VoiceController, transcript: &str) {
        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(1, RecognizerSignal::Started));
        controller.handle_event(recognizer_event(1, RecognizerSignal::Result(transcript.into())));
        assert_eq!(controller.session().phase, Phase::Awaiting);
    }

    // -----------------------------------------------------------------------
    // Startup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn startup_presents_ready_state() {
        let (mock, _calls) = MockRecognizer::new();
        let (controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.present();

        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Ready,
            "Prêt à écouter"
        ))));
        assert!(updates.contains(&DisplayUpdate::Transcript(String::new())));
        assert!(updates.contains(&DisplayUpdate::Response(String::new())));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));
    }

    #[tokio::test]
    async fn missing_recognizer_disables_voice_for_the_session() {
        let (mut controller, _events, mut display) =
            make_controller(None, Arc::new(PendingService));

        controller.present();
        let updates = drain(&mut display);
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Disabled));
        assert!(updates
            .iter()
            .any(|u| matches!(u, DisplayUpdate::Status(s) if s.category == StatusCategory::Error)));

        // Activations go nowhere.
        controller.handle_event(ControllerEvent::Activated);
        assert_eq!(controller.session().phase, Phase::Idle);
        assert_eq!(controller.session().cycle, 0);
        assert!(drain(&mut display).is_empty());
    }

    // -----------------------------------------------------------------------
    // Activation and capture
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn activation_starts_a_listening_cycle() {
        let (mock, calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);

        assert_eq!(controller.session().phase, Phase::Listening);
        assert_eq!(controller.session().cycle, 1);
        assert_eq!(*calls.lock().unwrap(), vec![RecognizerCall::Start(1)]);
        assert_eq!(last_trigger(&drain(&mut display)), Some(TriggerMode::Stop));
    }

    #[tokio::test]
    async fn activation_while_listening_requests_stop() {
        let (mock, calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);
        drain(&mut display);

        controller.handle_event(ControllerEvent::Activated);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![RecognizerCall::Start(1), RecognizerCall::Stop]
        );
        // Still Listening — only the backend's Ended finishes the cycle.
        assert_eq!(controller.session().phase, Phase::Listening);

        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));
        assert_eq!(controller.session().phase, Phase::Idle);
        assert_eq!(last_trigger(&drain(&mut display)), Some(TriggerMode::Start));
    }

    #[tokio::test]
    async fn capture_start_clears_the_previous_turn() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, mut events, mut display) = make_controller(
            Some(Box::new(mock)),
            Arc::new(ScriptedService(Ok(reply("Voici la réponse.")))),
        );

        // First turn start to finish.
        to_awaiting(&mut controller, "Que dit Jean 3 verset 16 ?");
        let reply_event = events.recv().await.expect("reply event");
        controller.handle_event(reply_event);
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));
        assert_eq!(controller.session().phase, Phase::Done);
        drain(&mut display);

        // Second activation: surfaces are wiped once capture is confirmed.
        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(2, RecognizerSignal::Started));

        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Transcript(String::new())));
        assert!(updates.contains(&DisplayUpdate::Response(String::new())));
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Listening,
            "Je vous écoute..."
        ))));
    }

    #[tokio::test]
    async fn transcript_sends_request_and_disables_trigger() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "Que dit Jean 3 verset 16 ?");

        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Transcript(
            "Que dit Jean 3 verset 16 ?".into()
        )));
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Processing,
            "Traitement en cours..."
        ))));
        // The recognizer is still winding down, so no new turn can start.
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Disabled));
    }

    #[tokio::test]
    async fn empty_transcript_is_ignored() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(1, RecognizerSignal::Started));
        drain(&mut display);

        controller.handle_event(recognizer_event(1, RecognizerSignal::Result("   ".into())));
        assert_eq!(controller.session().phase, Phase::Listening);
        assert!(drain(&mut display).is_empty());

        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));
        assert_eq!(controller.session().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn silent_cycle_returns_to_ready() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(1, RecognizerSignal::Started));
        drain(&mut display);

        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));

        assert_eq!(controller.session().phase, Phase::Idle);
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Ready,
            "Prêt à écouter"
        ))));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));
    }

    #[tokio::test]
    async fn recognition_error_shows_code_and_returns_to_idle() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(1, RecognizerSignal::Started));
        drain(&mut display);

        controller.handle_event(recognizer_event(1, RecognizerSignal::Error("no-speech".into())));
        assert_eq!(controller.session().phase, Phase::Idle);

        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Error,
            "Erreur de reconnaissance : no-speech"
        ))));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));

        // Ended after the error must not clobber the error status.
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));
        let updates = drain(&mut display);
        assert_eq!(updates, vec![DisplayUpdate::Trigger(TriggerMode::Start)]);
    }

    #[tokio::test]
    async fn late_ended_reenables_trigger_without_clobbering_processing() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "bonjour");
        drain(&mut display);

        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));

        // Only the trigger changes; the processing status stands.
        let updates = drain(&mut display);
        assert_eq!(updates, vec![DisplayUpdate::Trigger(TriggerMode::Start)]);
        assert_eq!(controller.session().phase, Phase::Awaiting);
        assert!(controller.session().recognizer_done);
    }

    #[tokio::test]
    async fn start_failure_surfaces_a_recognition_error() {
        let (mock, _calls) =
            MockRecognizer::failing(RecognizerError::StartFailed("microphone busy".into()));
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);

        assert_eq!(controller.session().phase, Phase::Idle);
        let updates = drain(&mut display);
        assert!(updates.iter().any(|u| matches!(
            u,
            DisplayUpdate::Status(s)
                if s.category == StatusCategory::Error && s.label.contains("microphone busy")
        )));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));
    }

    // -----------------------------------------------------------------------
    // Replies
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn success_reply_renders_text() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "Que dit Jean 3 verset 16 ?");
        drain(&mut display);

        controller.handle_event(ControllerEvent::Reply {
            cycle: 1,
            outcome: Ok(reply("Car Dieu a tant aimé le monde…")),
        });

        assert_eq!(controller.session().phase, Phase::Done);
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Response(
            "Car Dieu a tant aimé le monde…".into()
        )));
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Success,
            "Réponse prête"
        ))));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));
        // The transcript surface is never touched by a reply.
        assert!(!updates
            .iter()
            .any(|u| matches!(u, DisplayUpdate::Transcript(_))));
    }

    #[tokio::test]
    async fn application_error_shows_apology_not_server_detail() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "Que dit Jean 99 ?");
        drain(&mut display);

        controller.handle_event(ControllerEvent::Reply {
            cycle: 1,
            outcome: Ok(ServerReply {
                text: String::new(),
                error_message: Some("référence introuvable".into()),
                follow_up_url: None,
            }),
        });

        assert_eq!(controller.session().phase, Phase::Errored);
        let messages = Messages::default();
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Response(messages.apology.clone())));
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Error,
            messages.application_status.clone()
        ))));
        // The raw server detail never reaches the screen.
        assert!(!updates.iter().any(|u| match u {
            DisplayUpdate::Response(text) | DisplayUpdate::Transcript(text) =>
                text.contains("introuvable"),
            DisplayUpdate::Status(s) => s.label.contains("introuvable"),
            _ => false,
        }));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Start));
    }

    #[tokio::test]
    async fn transport_failure_keeps_the_transcript() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "bonjour");
        drain(&mut display);

        controller.handle_event(ControllerEvent::Reply {
            cycle: 1,
            outcome: Err(ServiceError::Status(500)),
        });

        assert_eq!(controller.session().phase, Phase::Errored);
        assert_eq!(controller.session().transcript.as_deref(), Some("bonjour"));

        let messages = Messages::default();
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Response(messages.connection_error.clone())));
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Error,
            messages.connection_status.clone()
        ))));
        assert!(!updates
            .iter()
            .any(|u| matches!(u, DisplayUpdate::Transcript(_))));
    }

    #[tokio::test]
    async fn stale_reply_is_discarded() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        // Cycle 1 reaches Awaiting, its recognizer winds down…
        to_awaiting(&mut controller, "premier");
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));

        // …and the user starts cycle 2 before the reply lands.
        controller.handle_event(ControllerEvent::Activated);
        controller.handle_event(recognizer_event(2, RecognizerSignal::Started));
        assert_eq!(controller.session().cycle, 2);
        drain(&mut display);

        controller.handle_event(ControllerEvent::Reply {
            cycle: 1,
            outcome: Ok(reply("réponse périmée")),
        });

        // Nothing rendered, nothing changed.
        assert!(drain(&mut display).is_empty());
        assert_eq!(controller.session().phase, Phase::Listening);
        assert!(controller.session().reply.is_none());
    }

    #[tokio::test]
    async fn stale_recognizer_signal_is_discarded() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        // Cycle 1 winds down, then a typed command bumps to cycle 2.
        to_awaiting(&mut controller, "premier");
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));
        controller.handle_event(ControllerEvent::TextSubmitted("deuxième".into()));
        assert_eq!(controller.session().cycle, 2);
        drain(&mut display);

        // Cycle 1's backend speaks up again — dropped on the cycle tag.
        controller.handle_event(recognizer_event(1, RecognizerSignal::Result("tard".into())));
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));

        assert!(drain(&mut display).is_empty());
        assert_eq!(controller.session().phase, Phase::Awaiting);
        assert_eq!(controller.session().transcript.as_deref(), Some("deuxième"));
    }

    #[tokio::test]
    async fn follow_up_opens_only_after_the_reply_is_rendered() {
        let (mock, _calls) = MockRecognizer::new();
        let follow_up = ServerReply {
            text: "Je vous ouvre le passage.".into(),
            error_message: None,
            follow_up_url: Some("https://example.org/jean/3/16".into()),
        };
        let (mut controller, mut events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(ScriptedService(Ok(follow_up))));

        to_awaiting(&mut controller, "Ouvre Jean 3 verset 16");
        let reply_event = events.recv().await.expect("reply event");
        controller.handle_event(reply_event);

        // The reply is on screen, the page is not open yet.
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Response("Je vous ouvre le passage.".into())));
        assert!(!updates
            .iter()
            .any(|u| matches!(u, DisplayUpdate::OpenFollowUp(_))));

        // After the delay the timer re-enters the queue and the open goes out.
        let due = events.recv().await.expect("follow-up event");
        assert!(matches!(due, ControllerEvent::FollowUpDue { .. }));
        controller.handle_event(due);
        assert_eq!(
            drain(&mut display),
            vec![DisplayUpdate::OpenFollowUp(
                "https://example.org/jean/3/16".into()
            )]
        );
    }

    // -----------------------------------------------------------------------
    // Typed commands
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn typed_command_takes_a_full_turn_even_without_voice() {
        let (mut controller, mut events, mut display) = make_controller(
            None,
            Arc::new(ScriptedService(Ok(reply("Matthieu 5 est ouvert.")))),
        );

        controller.handle_event(ControllerEvent::TextSubmitted(" Ouvre Matthieu 5 ".into()));

        assert_eq!(controller.session().phase, Phase::Awaiting);
        assert_eq!(controller.session().cycle, 1);
        let updates = drain(&mut display);
        assert!(updates.contains(&DisplayUpdate::Transcript("Ouvre Matthieu 5".into())));
        assert!(updates.contains(&DisplayUpdate::Response(String::new())));
        // Voice stays disabled for the unsupported session.
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Disabled));

        let reply_event = events.recv().await.expect("reply event");
        controller.handle_event(reply_event);
        assert_eq!(controller.session().phase, Phase::Done);
        assert!(drain(&mut display)
            .contains(&DisplayUpdate::Response("Matthieu 5 est ouvert.".into())));
    }

    #[tokio::test]
    async fn typed_command_is_ignored_while_listening() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        controller.handle_event(ControllerEvent::Activated);
        drain(&mut display);

        controller.handle_event(ControllerEvent::TextSubmitted("bonjour".into()));

        assert_eq!(controller.session().phase, Phase::Listening);
        assert_eq!(controller.session().cycle, 1);
        assert!(drain(&mut display).is_empty());
    }

    #[tokio::test]
    async fn typed_command_stales_a_pending_voice_reply() {
        let (mock, _calls) = MockRecognizer::new();
        let (mut controller, _events, mut display) =
            make_controller(Some(Box::new(mock)), Arc::new(PendingService));

        to_awaiting(&mut controller, "premier");
        controller.handle_event(recognizer_event(1, RecognizerSignal::Ended));

        controller.handle_event(ControllerEvent::TextSubmitted("deuxième".into()));
        assert_eq!(controller.session().cycle, 2);
        drain(&mut display);

        // The voice cycle's reply arrives too late.
        controller.handle_event(ControllerEvent::Reply {
            cycle: 1,
            outcome: Ok(reply("réponse du premier")),
        });

        assert!(drain(&mut display).is_empty());
        assert_eq!(controller.session().transcript.as_deref(), Some("deuxième"));
        assert_eq!(controller.session().phase, Phase::Awaiting);
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn run_processes_events_until_shutdown() {
        let (events_tx, events_rx) = mpsc::channel(32);
        let (display_tx, mut display_rx) = mpsc::unbounded_channel();
        let (mock, calls) = MockRecognizer::new();

        let controller = VoiceController::new(
            Some(Box::new(mock)),
            Arc::new(PendingService),
            display_tx,
            events_tx.clone(),
            Messages::default(),
            Duration::from_millis(20),
        );

        events_tx.send(ControllerEvent::Activated).await.unwrap();
        events_tx.send(ControllerEvent::Shutdown).await.unwrap();

        // Returns thanks to Shutdown even though we still hold a sender.
        controller.run(events_rx).await;

        assert_eq!(*calls.lock().unwrap(), vec![RecognizerCall::Start(1)]);
        let updates = drain(&mut display_rx);
        assert!(updates.contains(&DisplayUpdate::Status(StatusLine::new(
            StatusCategory::Ready,
            "Prêt à écouter"
        ))));
        assert_eq!(last_trigger(&updates), Some(TriggerMode::Stop));
    }
}
