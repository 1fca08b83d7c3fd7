//! Runtime configuration.
//!
//! All fields have defaults so the simulator runs with no config file at
//! all; a TOML file can override any subset.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration, deserialized from `bedside.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub audio: AudioConfig,
    pub voice: VoiceConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// Generative-service endpoint and model selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the generativelanguage REST API.
    pub api_base: String,
    /// Model for conversational patient turns.
    pub chat_model: String,
    /// Model for clinical data panel generation.
    pub data_model: String,
    /// Model for diagnosis evaluation (structured JSON output).
    pub eval_model: String,
    /// Model for speech synthesis.
    pub tts_model: String,
    /// Model for the patient portrait.
    pub image_model: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chat_model: "gemini-3-flash-preview".to_string(),
            data_model: "gemini-3-flash-preview".to_string(),
            eval_model: "gemini-3-pro-preview".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

/// Playback and speaking-animation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of synthesized speech payloads (fixed by the service).
    pub sample_rate: u32,
    /// Level ceiling used to normalize the speaking-animation volume
    /// (byte-domain, empirically chosen).
    pub volume_ceiling: f32,
    /// Interval of the animation level meter in milliseconds.
    pub meter_tick_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            volume_ceiling: 110.0,
            meter_tick_ms: 16,
        }
    }
}

/// Voice-capture parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Recognition language tag.
    pub language: String,
    /// Delay after toggling capture off before the compose buffer is read,
    /// so the final recognition result can land.
    pub settle_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            settle_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_gateway_models() {
        let c = Config::default();
        assert_eq!(c.gateway.chat_model, "gemini-3-flash-preview");
        assert_eq!(c.gateway.eval_model, "gemini-3-pro-preview");
        assert_eq!(c.gateway.tts_model, "gemini-2.5-flash-preview-tts");
        assert!(c.gateway.api_base.starts_with("https://"));
    }

    #[test]
    fn default_audio_parameters() {
        let c = Config::default();
        assert_eq!(c.audio.sample_rate, 24_000);
        assert!((c.audio.volume_ceiling - 110.0).abs() < f32::EPSILON);
        assert_eq!(c.audio.meter_tick_ms, 16);
    }

    #[test]
    fn default_voice_settle() {
        let c = Config::default();
        assert_eq!(c.voice.settle_ms, 300);
        assert_eq!(c.voice.language, "en-US");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml = r#"
            [gateway]
            chat_model = "gemini-x"

            [voice]
            settle_ms = 500
        "#;
        let c: Config = toml::from_str(toml).unwrap();
        assert_eq!(c.gateway.chat_model, "gemini-x");
        assert_eq!(c.gateway.eval_model, "gemini-3-pro-preview");
        assert_eq!(c.voice.settle_ms, 500);
        assert_eq!(c.audio.sample_rate, 24_000);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audio]\nvolume_ceiling = 90.0").unwrap();
        let c = Config::load(file.path()).unwrap();
        assert!((c.audio.volume_ceiling - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn load_missing_file_is_err() {
        assert!(Config::load(Path::new("/nonexistent/bedside.toml")).is_err());
    }

    #[test]
    fn load_invalid_toml_is_err() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
