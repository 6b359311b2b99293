//! Application entry point — Voice Assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Create the controller channels (`events`, `display`).
//! 5. Build the HTTP interpretation client from config.
//! 6. Build the speech recognizer backend (or none — voice stays disabled).
//! 7. Spawn the controller task on the tokio runtime.
//! 8. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use voice_assistant::{
    app::AssistantApp,
    config::{AppConfig, RecognizerBackend},
    controller::{ControllerEvent, VoiceController},
    display::{DisplayUpdate, Messages},
    recognize::{SimulatedRecognizer, SpeechRecognizer},
    service::{HttpResponseService, ResponseService},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_inner_size([340.0, 300.0])
        .with_min_inner_size([280.0, 200.0])
        .with_resizable(false);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Voice assistant starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads — controller loop + HTTP requests)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Channel setup
    let (events_tx, events_rx) = mpsc::channel::<ControllerEvent>(32);
    let (display_tx, display_rx) = mpsc::unbounded_channel::<DisplayUpdate>();

    // 5. HTTP interpretation client
    let service: Arc<dyn ResponseService> =
        Arc::new(HttpResponseService::from_config(&config.service));
    log::info!("Interpretation endpoint: {}", config.service.endpoint());

    // 6. Speech recognizer backend
    let recognizer: Option<Box<dyn SpeechRecognizer>> = match config.recognition.backend {
        RecognizerBackend::Simulated => Some(Box::new(SimulatedRecognizer::from_config(
            &config.recognition,
            events_tx.clone(),
        ))),
        RecognizerBackend::Disabled => {
            log::warn!("Speech recognition disabled by configuration");
            None
        }
    };

    // 7. Controller task — owns the session and drives the display
    let controller = VoiceController::new(
        recognizer,
        service,
        display_tx,
        events_tx.clone(),
        Messages::default(),
        Duration::from_millis(config.service.follow_up_delay_ms),
    );
    rt.spawn(controller.run(events_rx));

    // 8. Build the egui app and run it (blocks until the window is closed)
    let app = AssistantApp::new(events_tx, display_rx, config.clone());
    let options = native_options(&config);

    eframe::run_native(
        "Assistant vocal",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
