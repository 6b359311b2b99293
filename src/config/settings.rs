//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// RecognizerBackend
// ---------------------------------------------------------------------------

/// Selects which speech-recognition backend feeds the controller.
///
/// | Variant   | Source of transcripts                   | Works everywhere |
/// |-----------|-----------------------------------------|------------------|
/// | Simulated | Built-in canned-phrase recognizer       | Yes              |
/// | Disabled  | None — voice is reported unsupported    | Yes              |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RecognizerBackend {
    /// Built-in recognizer that emits a configurable phrase after a short
    /// listening window.  Useful for demos and for platforms without a
    /// native speech engine.
    Simulated,
    /// No recognizer — the app reports voice input as unsupported and only
    /// accepts typed commands.
    Disabled,
}

impl Default for RecognizerBackend {
    fn default() -> Self {
        Self::Simulated
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Settings for the HTTP interpretation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the server, without a trailing path.
    pub base_url: String,
    /// Path of the interpret endpoint.  Deployments differ between
    /// `/api/process_audio` and `/process_audio`, so it is configurable.
    pub endpoint_path: String,
    /// Maximum seconds to wait for a server reply before timing out.
    pub timeout_secs: u64,
    /// Milliseconds to wait after rendering a reply before opening its
    /// follow-up URL.
    pub follow_up_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            endpoint_path: "/api/process_audio".into(),
            timeout_secs: 15,
            follow_up_delay_ms: 1000,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the interpret endpoint.  Tolerates a trailing slash on
    /// `base_url` and a missing leading slash on `endpoint_path`.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.endpoint_path.starts_with('/') {
            format!("{}{}", base, self.endpoint_path)
        } else {
            format!("{}/{}", base, self.endpoint_path)
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-recognition front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Which backend to use.
    pub backend: RecognizerBackend,
    /// Recognition language as a BCP-47 tag, passed to backends that
    /// support language selection.
    pub language: String,
    /// Phrase the simulated backend emits at the end of its listening
    /// window.
    pub simulated_phrase: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::default(),
            language: "fr-FR".into(),
            simulated_phrase: "Que dit Jean 3 verset 16 ?".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interpretation-server settings.
    pub service: ServiceConfig,
    /// Speech-recognition settings.
    pub recognition: RecognitionConfig,
    /// UI / window settings.
    pub ui: UiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            recognition: RecognitionConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
