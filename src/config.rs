//! Editor configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::video::VideoEncodeSettings;
use crate::foundation::core::Fps;
use crate::foundation::error::{BrandframeError, BrandframeResult};
use crate::settings::auth::SharedSecretVerifier;

/// Environment variable that overrides [`EditorConfig::shared_secret`].
pub const SHARED_SECRET_ENV: &str = "BRANDFRAME_SHARED_SECRET";

/// Top-level configuration, loaded from JSON. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// JSON file backing the shared settings store.
    pub settings_path: PathBuf,

    /// Credential required for settings writes.
    pub shared_secret: String,

    /// Font file used as the fallback face.
    pub default_font_path: Option<PathBuf>,

    pub export: ExportConfig,

    pub logging: LoggingConfig,
}

/// Export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub fps: u32,
    pub video_bitrate_bps: u64,
    pub audio_bitrate_bps: u64,
    /// Where downloads land.
    pub output_dir: PathBuf,
    /// Straight RGBA8 that transparent pixels are flattened over before encoding.
    pub background_rgba: [u8; 4],
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "brandframe=debug,warn"). `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("brandframe-settings.json"),
            shared_secret: "efeapak".to_owned(),
            default_font_path: None,
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            video_bitrate_bps: 5_000_000,
            audio_bitrate_bps: 128_000,
            output_dir: PathBuf::from("."),
            background_rgba: [0, 0, 0, 255],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl EditorConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> BrandframeResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(BrandframeError::validation(format!(
                    "failed to read config '{}': {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            BrandframeError::serde(format!("invalid config '{}': {e}", path.display()))
        })
    }

    /// Apply environment overrides on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_secret_override(std::env::var(SHARED_SECRET_ENV).ok());
        self
    }

    fn apply_secret_override(&mut self, value: Option<String>) {
        if let Some(secret) = value.filter(|s| !s.is_empty()) {
            self.shared_secret = secret;
        }
    }

    /// Resolve `settings_path` relative to the directory the config file lives in.
    pub fn settings_path_from(&self, config_path: &Path) -> PathBuf {
        if self.settings_path.is_absolute() {
            return self.settings_path.clone();
        }
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.settings_path)
    }

    pub fn verifier(&self) -> SharedSecretVerifier {
        SharedSecretVerifier::new(self.shared_secret.clone())
    }
}

impl ExportConfig {
    pub fn encode_settings(&self) -> BrandframeResult<VideoEncodeSettings> {
        Ok(VideoEncodeSettings {
            fps: Fps::new(self.fps, 1)?,
            video_bitrate_bps: self.video_bitrate_bps,
            audio_bitrate_bps: self.audio_bitrate_bps,
            bg_rgba: self.background_rgba,
        })
    }
}
