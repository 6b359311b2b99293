//! Display vocabulary shared between the controller and the UI.
//!
//! The controller never touches egui.  It describes what the window should
//! show with the plain data types in this module and streams them to the UI
//! as [`DisplayUpdate`] values over an unbounded channel.  The UI applies
//! each update to its local copy of the surfaces and renders that copy every
//! frame.
//!
//! [`Messages`] collects the French user-facing strings in one place so the
//! controller and the snapshot derivation never hard-code text inline.

// ---------------------------------------------------------------------------
// StatusCategory
// ---------------------------------------------------------------------------

/// Coarse kind of the current status line.
///
/// The UI maps each category to an icon and a colour; the label text itself
/// lives in [`StatusLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// Waiting for the user to start a turn.
    Ready,
    /// The recognizer has confirmed capture is live.
    Listening,
    /// A transcript is on its way to the interpretation server.
    Processing,
    /// A reply was rendered successfully.
    Success,
    /// Something went wrong; the label says what.
    Error,
}

impl StatusCategory {
    /// Short glyph shown in front of the status label.
    pub fn icon(&self) -> &'static str {
        match self {
            StatusCategory::Ready => "○",
            StatusCategory::Listening => "●",
            StatusCategory::Processing => "…",
            StatusCategory::Success => "✓",
            StatusCategory::Error => "!",
        }
    }
}

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

/// One rendered status: a category plus the text to show next to its icon.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub category: StatusCategory,
    pub label: String,
}

impl StatusLine {
    pub fn new(category: StatusCategory, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TriggerMode
// ---------------------------------------------------------------------------

/// What the single voice button currently does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Pressing it begins a new listening cycle.
    Start,
    /// Pressing it asks the active recognizer to stop early.
    Stop,
    /// The button is greyed out (no recognizer, or a request is in flight
    /// while the recognizer is still winding down).
    Disabled,
}

// ---------------------------------------------------------------------------
// DisplayUpdate
// ---------------------------------------------------------------------------

/// One change to the window, emitted by the controller.
///
/// Updates are applied in the order they are sent; the UI keeps the last
/// value of each surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    /// Replace the status line.
    Status(StatusLine),
    /// Replace the "what you said" surface.  Empty string clears it.
    Transcript(String),
    /// Replace the assistant-reply surface.  Empty string clears it.
    Response(String),
    /// Change what the voice button does.
    Trigger(TriggerMode),
    /// Open this URL in the system browser.  Fire-and-forget; the assistant
    /// keeps its state regardless of whether the browser cooperates.
    OpenFollowUp(String),
}

// ---------------------------------------------------------------------------
// DisplaySnapshot
// ---------------------------------------------------------------------------

/// Full picture of the window at one instant.
///
/// Derived from the session by [`crate::controller::Session::snapshot`];
/// used to seed the UI at startup and heavily in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub status: StatusLine,
    pub transcript: String,
    pub response: String,
    pub trigger: TriggerMode,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The set of user-facing strings, in French.
///
/// Kept as a struct rather than scattered literals so tests can assert
/// against the same values the controller emits.
#[derive(Debug, Clone)]
pub struct Messages {
    /// Idle status, no error pending.
    pub ready: String,
    /// Status while the recognizer captures speech.
    pub listening: String,
    /// Status while the server interprets a transcript.
    pub processing: String,
    /// Status once a reply has been rendered.
    pub success: String,
    /// Reply surface text for any server-side failure.
    pub apology: String,
    /// Reply surface text when the server could not be reached.
    pub connection_error: String,
    /// Status label when the server could not be reached.
    pub connection_status: String,
    /// Status label when the server answered with an application error.
    pub application_status: String,
    /// Status label when no speech backend is available.
    pub unsupported: String,
    /// Prefix of the status label for recognizer-reported errors.
    pub recognition_error_prefix: String,
}

impl Messages {
    /// Status label for a recognizer error, carrying the platform code.
    pub fn recognition_error(&self, code: &str) -> String {
        format!("{} : {}", self.recognition_error_prefix, code)
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            ready: "Prêt à écouter".into(),
            listening: "Je vous écoute...".into(),
            processing: "Traitement en cours...".into(),
            success: "Réponse prête".into(),
            apology: "Je suis désolé, j'ai rencontré une erreur. Pouvez-vous réessayer ?".into(),
            connection_error: "Erreur de connexion au serveur".into(),
            connection_status: "Connexion impossible".into(),
            application_status: "Erreur de traitement".into(),
            unsupported: "La reconnaissance vocale n'est pas supportée sur cette plateforme".into(),
            recognition_error_prefix: "Erreur de reconnaissance".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_are_distinct() {
        let icons = [
            StatusCategory::Ready.icon(),
            StatusCategory::Listening.icon(),
            StatusCategory::Processing.icon(),
            StatusCategory::Success.icon(),
            StatusCategory::Error.icon(),
        ];
        for (i, a) in icons.iter().enumerate() {
            for b in icons.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn recognition_error_carries_code() {
        let messages = Messages::default();
        assert_eq!(
            messages.recognition_error("no-speech"),
            "Erreur de reconnaissance : no-speech"
        );
    }

    #[test]
    fn status_line_new_sets_fields() {
        let line = StatusLine::new(StatusCategory::Ready, "Prêt à écouter");
        assert_eq!(line.category, StatusCategory::Ready);
        assert_eq!(line.label, "Prêt à écouter");
    }
}
