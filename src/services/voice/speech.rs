//! Speech recognition and synthesis.
//!
//! [`SpeechService`] is the seam the voice pipeline calls through.
//! [`NlsSpeechService`] implements it against an NLS-style REST gateway:
//! raw 16 kHz PCM in for recognition, PCM out for synthesis.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// A speech-to-text and text-to-speech collaborator.
///
/// Calls are blocking and fallible; callers decide whether to retry.
pub trait SpeechService: Send + Sync {
    /// Returns the service name for logs and health output.
    fn name(&self) -> &'static str;

    /// Transcribes 16 kHz 16-bit mono PCM into text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Speech`] if the gateway fails.
    fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Synthesizes `text` into 16 kHz 16-bit mono PCM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Speech`] if the gateway fails or returns no audio.
    fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Speech gateway configuration (`[speech]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether to build a speech client at all.
    pub enabled: bool,
    /// Recognition endpoint.
    pub asr_url: String,
    /// Synthesis endpoint.
    pub tts_url: String,
    /// Application key sent with every request.
    pub app_key: Option<String>,
    /// Access token, supplied externally.
    #[serde(with = "optional_secret", skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,
    /// Synthesis voice.
    pub voice: String,
    /// Synthesis volume, 0 to 100.
    pub volume: u8,
    /// Sample rate for both directions.
    pub sample_rate: u32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Return a generated tone when synthesis fails.
    pub fallback_tone: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            asr_url: NlsSpeechService::DEFAULT_ASR_URL.to_string(),
            tts_url: NlsSpeechService::DEFAULT_TTS_URL.to_string(),
            app_key: None,
            token: None,
            voice: "zhixiaobai".to_string(),
            volume: 50,
            sample_rate: 16_000,
            timeout_ms: 10_000,
            fallback_tone: true,
        }
    }
}

impl SpeechConfig {
    /// Applies `HERITAGE_SPEECH_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("HERITAGE_SPEECH_ENABLED") {
            self.enabled = v.to_lowercase() == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("HERITAGE_SPEECH_ASR_URL") {
            self.asr_url = v;
        }
        if let Ok(v) = std::env::var("HERITAGE_SPEECH_TTS_URL") {
            self.tts_url = v;
        }
        if let Ok(v) = std::env::var("HERITAGE_SPEECH_APP_KEY") {
            self.app_key = Some(v);
        }
        if let Ok(v) = std::env::var("HERITAGE_SPEECH_TOKEN") {
            self.token = Some(SecretString::from(v));
        }
        if let Some(ms) = std::env::var("HERITAGE_SPEECH_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_ms = ms;
        }
        self
    }
}

#[derive(Debug, Deserialize)]
struct AsrResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    appkey: &'a str,
    token: &'a str,
    text: &'a str,
    format: &'static str,
    sample_rate: u32,
    voice: &'a str,
    volume: u8,
}

/// REST client for an NLS-style speech gateway.
pub struct NlsSpeechService {
    asr_url: String,
    tts_url: String,
    app_key: String,
    token: SecretString,
    voice: String,
    volume: u8,
    sample_rate: u32,
    client: reqwest::blocking::Client,
}

impl NlsSpeechService {
    /// Default recognition endpoint.
    pub const DEFAULT_ASR_URL: &'static str =
        "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/asr";

    /// Default synthesis endpoint.
    pub const DEFAULT_TTS_URL: &'static str =
        "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/tts";

    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotEnabled`] if the app key or token is
    /// missing, or [`Error::OperationFailed`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let app_key = config
            .app_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::FeatureNotEnabled("speech app key not configured".to_string()))?;
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::FeatureNotEnabled("speech token not configured".to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::operation("build_speech_client", e))?;

        Ok(Self {
            asr_url: config.asr_url.clone(),
            tts_url: config.tts_url.clone(),
            app_key,
            token,
            voice: config.voice.clone(),
            volume: config.volume,
            sample_rate: config.sample_rate,
            client,
        })
    }

    fn speech_error(operation: &str, cause: impl std::fmt::Display) -> Error {
        Error::Speech {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl SpeechService for NlsSpeechService {
    fn name(&self) -> &'static str {
        "nls"
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let sample_rate = self.sample_rate.to_string();
        let response = self
            .client
            .post(&self.asr_url)
            .header("X-NLS-Token", self.token.expose_secret())
            .header("appkey", &self.app_key)
            .header("Content-Type", "application/octet-stream")
            .query(&[
                ("appkey", self.app_key.as_str()),
                ("format", "pcm"),
                ("sample_rate", sample_rate.as_str()),
                ("enable_punctuation_prediction", "true"),
                ("enable_inverse_text_normalization", "true"),
            ])
            .body(audio.to_vec())
            .send()
            .map_err(|e| Self::speech_error("transcribe", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Self::speech_error(
                "transcribe",
                format!("gateway returned status: {status} - {body}"),
            ));
        }

        let parsed: AsrResponse = response
            .json()
            .map_err(|e| Self::speech_error("transcribe_response", e))?;

        parsed.result.ok_or_else(|| {
            Self::speech_error(
                "transcribe_response",
                format!(
                    "no result (status {}): {}",
                    parsed.status.unwrap_or_default(),
                    parsed.message.unwrap_or_default()
                ),
            )
        })
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = TtsRequest {
            appkey: &self.app_key,
            token: self.token.expose_secret(),
            text,
            format: "pcm",
            sample_rate: self.sample_rate,
            voice: &self.voice,
            volume: self.volume,
        };

        let response = self
            .client
            .post(&self.tts_url)
            .header("X-NLS-Token", self.token.expose_secret())
            .header("appkey", &self.app_key)
            .json(&request)
            .send()
            .map_err(|e| Self::speech_error("synthesize", e))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        // The gateway reports failures as JSON bodies, sometimes with 200.
        if !status.is_success() || is_json {
            let body = response.text().unwrap_or_default();
            return Err(Self::speech_error(
                "synthesize",
                format!("gateway returned status: {status} - {body}"),
            ));
        }

        let audio = response
            .bytes()
            .map_err(|e| Self::speech_error("synthesize_response", e))?;
        if audio.is_empty() {
            return Err(Self::speech_error("synthesize_response", "empty audio"));
        }
        Ok(audio.to_vec())
    }
}

mod optional_secret {
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(_secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("***REDACTED***")
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_credentials() {
        let config = SpeechConfig::default();
        assert!(matches!(
            NlsSpeechService::new(&config),
            Err(Error::FeatureNotEnabled(_))
        ));

        let config = SpeechConfig {
            app_key: Some("key".to_string()),
            ..SpeechConfig::default()
        };
        assert!(matches!(
            NlsSpeechService::new(&config),
            Err(Error::FeatureNotEnabled(_))
        ));
    }

    #[test]
    fn test_builds_with_credentials() {
        let config = SpeechConfig {
            app_key: Some("key".to_string()),
            token: Some(SecretString::from("token")),
            ..SpeechConfig::default()
        };
        let service = NlsSpeechService::new(&config).unwrap();
        assert_eq!(service.name(), "nls");
    }

    #[test]
    fn test_token_is_redacted() {
        let config: SpeechConfig = toml::from_str(
            r#"
            app_key = "key"
            token = "very-secret"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.token.as_ref().map(|t| t.expose_secret()),
            Some("very-secret")
        );

        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("very-secret"));
        assert!(!format!("{config:?}").contains("very-secret"));
    }

    #[test]
    fn test_unreachable_gateway_is_speech_error() {
        let config = SpeechConfig {
            app_key: Some("key".to_string()),
            token: Some(SecretString::from("token")),
            asr_url: "http://127.0.0.1:9/asr".to_string(),
            timeout_ms: 500,
            ..SpeechConfig::default()
        };
        let service = NlsSpeechService::new(&config).unwrap();
        assert!(matches!(
            service.transcribe(&[0, 0]),
            Err(Error::Speech { .. })
        ));
    }
}
