//! Floating assistant widget — egui/eframe application.
//!
//! # Architecture
//!
//! [`AssistantApp`] is the top-level [`eframe::App`].  It owns the rendered
//! copy of the display surfaces and two channel endpoints:
//!
//! * `events_tx`  — sends [`ControllerEvent`]s (trigger presses, typed
//!   commands) to the controller task.
//! * `display_rx` — receives [`DisplayUpdate`]s from the controller and
//!   applies them to the local surfaces before each frame is drawn.
//!
//! The widget holds no conversation logic.  Every visible change — status
//! line, transcript, response, trigger mode, follow-up navigation — arrives
//! as a [`DisplayUpdate`] from [`crate::controller::VoiceController`], so the
//! window always shows the controller's view of the current turn.
//!
//! # Widget rows
//!
//! | Row | Content |
//! |-----|---------|
//! | Title bar  | drag area + settings / minimise / close |
//! | Status     | category icon + label ("Je vous écoute...") |
//! | Transcript | what the user said (or typed) |
//! | Response   | the assistant's answer, apology text on failure |
//! | Controls   | talk button + free-text command field |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::controller::ControllerEvent;
use crate::display::{DisplayUpdate, Messages, StatusCategory, StatusLine, TriggerMode};

// ---------------------------------------------------------------------------
// AssistantApp
// ---------------------------------------------------------------------------

/// eframe application — the floating voice-assistant widget.
pub struct AssistantApp {
    // ── Rendered surfaces (mirrors of the controller's snapshot) ─────────
    /// Current status line (category + label).
    pub status: StatusLine,
    /// Last recognised or typed command.  Empty when no turn is on screen.
    pub transcript: String,
    /// Last assistant answer (or apology).  Empty when no turn is on screen.
    pub response: String,
    /// What the talk button currently does.
    pub trigger: TriggerMode,

    // ── Input ────────────────────────────────────────────────────────────
    /// Contents of the free-text command field.
    input: String,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Whether the settings panel is expanded.
    show_settings: bool,
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,

    // ── Channels ─────────────────────────────────────────────────────────
    /// Send user actions to the controller task.
    pub events_tx: mpsc::Sender<ControllerEvent>,
    /// Receive display updates from the controller task.
    pub display_rx: mpsc::UnboundedReceiver<DisplayUpdate>,

    // ── Configuration ────────────────────────────────────────────────────
    /// Application configuration (read-only after startup).
    pub config: AppConfig,
}

impl AssistantApp {
    /// Create a new [`AssistantApp`].
    ///
    /// * `events_tx`  — sender end of the controller event channel.
    /// * `display_rx` — receiver end of the display update channel.
    /// * `config`     — loaded application configuration.
    ///
    /// The controller pushes a full snapshot when its task starts; until that
    /// arrives the trigger stays disabled so a click cannot outrun it.
    pub fn new(
        events_tx: mpsc::Sender<ControllerEvent>,
        display_rx: mpsc::UnboundedReceiver<DisplayUpdate>,
        config: AppConfig,
    ) -> Self {
        Self {
            status: StatusLine::new(StatusCategory::Ready, Messages::default().ready),
            transcript: String::new(),
            response: String::new(),
            trigger: TriggerMode::Disabled,
            input: String::new(),
            show_settings: false,
            spinner_phase: 0.0,
            events_tx,
            display_rx,
            config,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending display updates (non-blocking) and apply them in
    /// order.  The last value of each surface wins.
    fn poll_display(&mut self, ctx: &egui::Context) {
        while let Ok(update) = self.display_rx.try_recv() {
            match update {
                DisplayUpdate::Status(line) => self.status = line,
                DisplayUpdate::Transcript(text) => self.transcript = text,
                DisplayUpdate::Response(text) => self.response = text,
                DisplayUpdate::Trigger(mode) => self.trigger = mode,
                DisplayUpdate::OpenFollowUp(url) => self.open_follow_up(ctx, &url),
            }
        }
    }

    /// Hand a follow-up URL to the system browser (new tab).  Only http and
    /// https URLs are forwarded; anything else is logged and dropped.
    fn open_follow_up(&self, ctx: &egui::Context, url: &str) {
        if url.starts_with("http://") || url.starts_with("https://") {
            log::info!("Opening follow-up URL: {url}");
            ctx.open_url(egui::OpenUrl::new_tab(url));
        } else {
            log::warn!("Ignoring follow-up URL with unexpected scheme: {url}");
        }
    }

    // ── Controller messaging ─────────────────────────────────────────────

    /// Forward a talk-button press to the controller.
    fn press_trigger(&mut self) {
        if self.events_tx.try_send(ControllerEvent::Activated).is_err() {
            log::warn!("Controller event queue full; dropping trigger press");
        }
    }

    /// Forward the typed command to the controller and clear the field.
    fn submit_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self
            .events_tx
            .try_send(ControllerEvent::TextSubmitted(text))
            .is_err()
        {
            log::warn!("Controller event queue full; dropping typed command");
            return;
        }
        self.input.clear();
    }

    // ── Custom title bar ─────────────────────────────────────────────────

    /// Draw the draggable title bar with status icon, title, and window
    /// controls (settings, minimise, close).
    fn draw_title_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            // Status icon (spinner while a request is in flight)
            let icon = match self.status.category {
                StatusCategory::Processing => self.spinner_char().to_string(),
                other => other.icon().to_string(),
            };
            ui.label(egui::RichText::new(icon).color(self.state_color()));

            // Draggable title area
            let title_resp = ui.label(
                egui::RichText::new("Assistant vocal")
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
            if title_resp.is_pointer_button_down_on() {
                if let Some(outer_rect) = ctx.input(|i| i.viewport().outer_rect) {
                    let delta = ctx.input(|i| i.pointer.delta());
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                        outer_rect.min + delta,
                    ));
                }
            }

            // Right-aligned window controls
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                // Close
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("x")
                                .color(egui::Color32::from_rgb(200, 100, 100))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                // Minimise
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("-")
                                .color(egui::Color32::from_rgb(150, 150, 150))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                }
                // Settings toggle
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("=")
                                .color(egui::Color32::from_rgb(150, 150, 150))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }
            });
        });
    }

    // ── Panel renderers ──────────────────────────────────────────────────

    /// Render the status row: coloured icon + label.
    fn draw_status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let icon = match self.status.category {
                StatusCategory::Processing => self.spinner_char().to_string(),
                other => other.icon().to_string(),
            };
            ui.label(
                egui::RichText::new(icon)
                    .color(self.state_color())
                    .size(13.0),
            );
            ui.label(
                egui::RichText::new(self.status.label.as_str())
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
        });
    }

    /// Render the transcript row (skipped while empty).
    fn draw_transcript(&self, ui: &mut egui::Ui) {
        if self.transcript.is_empty() {
            return;
        }
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new("Vous avez dit :")
                .color(egui::Color32::from_rgb(130, 130, 130))
                .size(10.0),
        );
        ui.label(
            egui::RichText::new(self.transcript.as_str())
                .color(egui::Color32::from_rgb(180, 180, 180))
                .italics()
                .size(12.0),
        );
    }

    /// Render the response row with a copy button (skipped while empty).
    fn draw_response(&self, ui: &mut egui::Ui, ctx: &egui::Context) {
        if self.response.is_empty() {
            return;
        }
        let color = match self.status.category {
            StatusCategory::Error => egui::Color32::from_rgb(255, 136, 68),
            _ => egui::Color32::from_rgb(80, 200, 120),
        };

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(self.response.as_str())
                .color(color)
                .size(13.0),
        );

        ui.add_space(2.0);
        if ui
            .add(egui::Button::new(egui::RichText::new("Copier").size(11.0)))
            .clicked()
        {
            ctx.copy_text(self.response.clone());
        }
    }

    /// Render the control rows: talk button, then the typed-command field.
    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let (label, enabled) = match self.trigger {
            TriggerMode::Start => ("Parler", true),
            TriggerMode::Stop => ("Arrêter", true),
            TriggerMode::Disabled => ("Parler", false),
        };

        let talk = egui::Button::new(egui::RichText::new(label).size(13.0))
            .min_size(egui::vec2(ui.available_width(), 26.0));
        if ui.add_enabled(enabled, talk).clicked() {
            self.press_trigger();
        }

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let field = ui.add(
                egui::TextEdit::singleline(&mut self.input)
                    .hint_text("Écrivez votre demande...")
                    .desired_width(ui.available_width() - 64.0),
            );
            let entered = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add(egui::Button::new(egui::RichText::new("Envoyer").size(11.0)))
                .clicked();
            if entered || clicked {
                self.submit_input();
                if entered {
                    field.request_focus();
                }
            }
        });
    }

    /// Render the settings panel.
    fn draw_settings(&self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new("Serveur :")
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        ui.label(
            egui::RichText::new(format!("  {}", self.config.service.endpoint()))
                .color(egui::Color32::from_rgb(140, 140, 140))
                .size(11.0),
        );
        ui.add_space(2.0);
        ui.label(
            egui::RichText::new(format!("  Langue : {}", self.config.recognition.language))
                .color(egui::Color32::from_rgb(140, 140, 140))
                .size(11.0),
        );
        ui.label(
            egui::RichText::new(format!(
                "  Reconnaissance : {:?}",
                self.config.recognition.backend
            ))
            .color(egui::Color32::from_rgb(140, 140, 140))
            .size(11.0),
        );
        ui.label(
            egui::RichText::new(format!(
                "  Délai d'ouverture : {} ms",
                self.config.service.follow_up_delay_ms
            ))
            .color(egui::Color32::from_rgb(140, 140, 140))
            .size(11.0),
        );
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }

    /// Primary accent colour for the current status category.
    fn state_color(&self) -> egui::Color32 {
        match self.status.category {
            StatusCategory::Ready => egui::Color32::from_rgb(100, 100, 100),
            StatusCategory::Listening => egui::Color32::from_rgb(255, 68, 68),
            StatusCategory::Processing => egui::Color32::from_rgb(68, 136, 255),
            StatusCategory::Success => egui::Color32::from_rgb(80, 200, 120),
            StatusCategory::Error => egui::Color32::from_rgb(255, 136, 68),
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for AssistantApp {
    /// Called every frame by eframe.  Drains the display channel, advances
    /// the spinner, then renders the widget.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Apply pending display updates --------------------------------
        self.poll_display(ctx);

        // --- Advance spinner animation ------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Schedule repaints --------------------------------------------
        // The display channel has no repaint hook, so the window polls it
        // even while nothing animates.
        match self.status.category {
            StatusCategory::Listening | StatusCategory::Processing => {
                // ~15 fps for the spinner / live capture indicator
                ctx.request_repaint_after(Duration::from_millis(66));
            }
            StatusCategory::Success => {
                // The follow-up timer can fire while this state is on screen
                ctx.request_repaint_after(Duration::from_millis(100));
            }
            _ => {
                ctx.request_repaint_after(Duration::from_millis(500));
            }
        }

        // --- Dark transparent background frame ----------------------------
        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 220))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, ctx);

            if self.show_settings {
                ui.separator();
                self.draw_settings(ui);
                return;
            }

            ui.separator();
            self.draw_status(ui);
            self.draw_transcript(ui);
            self.draw_response(ui, ctx);

            ui.add_space(6.0);
            self.draw_controls(ui);
        });
    }

    /// Ask the controller task to wind down when the window closes.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let _ = self.events_tx.try_send(ControllerEvent::Shutdown);
        log::info!("Voice assistant widget closing");
    }
}
