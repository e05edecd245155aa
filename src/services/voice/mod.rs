//! Voice interaction.
//!
//! ```text
//! PCM ─► SpeechService::transcribe ─► SearchService::semantic_search
//!                                        │ nodes found ─► knowledge summary
//!                                        │ nothing     ─► ScriptedResponder
//!                                        ▼
//!                              clean_text_for_tts ─► SpeechService::synthesize
//!                                                      │ failed ─► fallback tone
//! ```

mod audio;
mod responder;
mod speech;
mod text;

pub use audio::{SAMPLE_RATE, fallback_pcm};
pub use responder::{ChatConfig, MESSAGE_PLACEHOLDER, ResponseRule, SCRIPTED_SOURCE, ScriptedResponder};
pub use speech::{NlsSpeechService, SpeechConfig, SpeechService};
pub use text::{clean_text_for_tts, format_knowledge_context, knowledge_answer};

use crate::services::SearchService;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Source tag for answers drawn from the graph.
pub const KNOWLEDGE_SOURCE: &str = "knowledge_graph";

/// Reply to a text chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text.
    pub text: String,
    /// Where the reply came from.
    pub source: &'static str,
}

/// Reply to a spoken request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReply {
    /// Recognized text.
    pub transcript: String,
    /// Spoken answer, cleaned for synthesis.
    pub answer: String,
    /// Where the answer came from.
    pub source: &'static str,
    /// 16-bit mono PCM.
    pub audio: Vec<u8>,
    /// PCM sample rate.
    pub sample_rate: u32,
    /// True if `audio` is the generated tone rather than speech.
    pub fallback: bool,
}

/// Voice pipeline over the graph, a responder and an optional speech
/// service.
#[derive(Clone)]
pub struct VoiceService {
    search: SearchService,
    responder: Arc<ScriptedResponder>,
    speech: Option<Arc<dyn SpeechService>>,
    fallback_tone: bool,
}

impl VoiceService {
    /// Creates a voice service without speech; only [`Self::chat`] works.
    #[must_use]
    pub fn new(search: SearchService, responder: ScriptedResponder) -> Self {
        Self {
            search,
            responder: Arc::new(responder),
            speech: None,
            fallback_tone: true,
        }
    }

    /// Attaches a speech service.
    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Enables or disables the fallback tone.
    #[must_use]
    pub const fn with_fallback_tone(mut self, enabled: bool) -> Self {
        self.fallback_tone = enabled;
        self
    }

    /// Returns the speech service name, if one is attached.
    #[must_use]
    pub fn speech_name(&self) -> Option<&'static str> {
        self.speech.as_ref().map(|s| s.name())
    }

    /// Answers a text message from the scripted responder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the message is blank.
    #[instrument(skip(self))]
    pub fn chat(&self, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }
        Ok(ChatReply {
            text: self.responder.respond(message),
            source: SCRIPTED_SOURCE,
        })
    }

    /// Runs the full voice round trip for a PCM recording.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureNotEnabled`] without a speech service,
    /// [`Error::InvalidInput`] for empty audio or an empty transcript, and
    /// [`Error::Speech`] if recognition fails, or synthesis fails with the
    /// fallback tone disabled.
    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    pub fn interact(&self, audio: &[u8]) -> Result<VoiceReply> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| Error::FeatureNotEnabled("speech service not configured".to_string()))?;
        if audio.is_empty() {
            return Err(Error::InvalidInput("no audio data received".to_string()));
        }

        let transcript = speech.transcribe(audio)?.trim().to_string();
        if transcript.is_empty() {
            return Err(Error::InvalidInput(
                "speech could not be recognized".to_string(),
            ));
        }
        tracing::info!(transcript = %transcript, "Transcribed request");

        let (answer, source) = self.answer(&transcript);
        let answer = clean_text_for_tts(&answer);

        let (audio, fallback) = match speech.synthesize(&answer) {
            Ok(audio) => (audio, false),
            Err(e) if self.fallback_tone => {
                tracing::warn!(error = %e, "Synthesis failed, returning fallback tone");
                metrics::counter!("voice_fallback_tone_total").increment(1);
                (fallback_pcm(&answer), true)
            },
            Err(e) => return Err(e),
        };

        Ok(VoiceReply {
            transcript,
            answer,
            source,
            audio,
            sample_rate: SAMPLE_RATE,
            fallback,
        })
    }

    /// Prefers graph knowledge and falls back to the scripted responder.
    fn answer(&self, question: &str) -> (String, &'static str) {
        match self.search.semantic_search(question) {
            Ok(response) => {
                if let Some(answer) = knowledge_answer(&response) {
                    return (answer, KNOWLEDGE_SOURCE);
                }
            },
            Err(e) => tracing::warn!(error = %e, "Knowledge lookup failed"),
        }
        (self.responder.respond(question), SCRIPTED_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Properties;
    use crate::services::fuzzy::ResolverConfig;
    use crate::storage::GraphStore;
    use crate::storage::graph::InMemoryGraphStore;

    struct ScriptedSpeech {
        transcript: &'static str,
        synth_fails: bool,
    }

    impl SpeechService for ScriptedSpeech {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn transcribe(&self, _audio: &[u8]) -> Result<String> {
            Ok(self.transcript.to_string())
        }

        fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            if self.synth_fails {
                return Err(Error::Speech {
                    operation: "synthesize".to_string(),
                    cause: "offline".to_string(),
                });
            }
            Ok(text.as_bytes().to_vec())
        }
    }

    fn service() -> VoiceService {
        let store = InMemoryGraphStore::new();
        let mut props = Properties::new();
        props.insert("name".to_string(), "鎏金铜佛像".into());
        props.insert("朝代".to_string(), "唐".into());
        store.create_node("Artifact", props).unwrap();
        let search = SearchService::new(Arc::new(store), ResolverConfig::default());
        VoiceService::new(search, ScriptedResponder::default())
    }

    fn with_speech(transcript: &'static str, synth_fails: bool) -> VoiceService {
        service().with_speech(Arc::new(ScriptedSpeech {
            transcript,
            synth_fails,
        }))
    }

    #[test]
    fn test_chat_uses_responder() {
        let reply = service().chat("谢谢").unwrap();
        assert!(reply.text.starts_with("不客气"));
        assert_eq!(reply.source, SCRIPTED_SOURCE);
        assert!(matches!(service().chat(" "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_interact_requires_speech() {
        assert!(matches!(
            service().interact(&[1, 2]),
            Err(Error::FeatureNotEnabled(_))
        ));
    }

    #[test]
    fn test_interact_answers_from_graph() {
        let reply = with_speech("鎏金铜佛像是什么", false).interact(&[1, 2]).unwrap();
        assert_eq!(reply.source, KNOWLEDGE_SOURCE);
        assert!(reply.answer.contains("朝代: 唐"));
        assert!(!reply.answer.contains('\n'));
        assert_eq!(reply.audio, reply.answer.as_bytes());
        assert!(!reply.fallback);
    }

    #[test]
    fn test_interact_falls_back_to_responder() {
        let reply = with_speech("古建筑保护有什么要求", false)
            .interact(&[1, 2])
            .unwrap();
        assert_eq!(reply.source, SCRIPTED_SOURCE);
        assert!(reply.answer.starts_with("古建筑保护要求"));
    }

    #[test]
    fn test_interact_fallback_tone() {
        let reply = with_speech("你好", true).interact(&[1, 2]).unwrap();
        assert!(reply.fallback);
        assert_eq!(reply.audio, fallback_pcm(&reply.answer));

        let strict = with_speech("你好", true).with_fallback_tone(false);
        assert!(matches!(strict.interact(&[1, 2]), Err(Error::Speech { .. })));
    }

    #[test]
    fn test_interact_rejects_empty_transcript() {
        assert!(matches!(
            with_speech("  ", false).interact(&[1, 2]),
            Err(Error::InvalidInput(_))
        ));
    }
}
