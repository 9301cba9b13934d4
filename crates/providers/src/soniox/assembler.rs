//! Utterance assembly for token-stream providers
//!
//! A two-way or any-source connection interleaves multiple languages and
//! directions on one socket, so buffered state is keyed by *source language*,
//! never by connection. The assembler is a pure state machine: it consumes
//! token batches and returns actions (emit / arm timer / cancel timer) for
//! the owning stream to execute, which keeps all utterance state on one task
//! and makes the logic testable without a socket.

use std::collections::{BTreeMap, HashMap};

use speech_bridge_core::{normalize, Token, TokenStatus, TranslationEvent};

/// Why an utterance was flushed. Logged for observability; not part of the
/// public event shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The end-of-utterance sentinel was seen
    EndToken,
    /// Originals and translations are both present and no wait is pending
    CompletePair,
    /// The translation-wait timeout fired before any translation arrived
    TranslationTimeout,
    /// The stream is closing; buffered data is flushed rather than lost
    StreamClose,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EndToken => "end_token",
            Self::CompletePair => "complete_pair",
            Self::TranslationTimeout => "translation_timeout",
            Self::StreamClose => "stream_close",
        };
        f.write_str(s)
    }
}

/// Instructions for the owning stream.
#[derive(Debug)]
pub enum AssemblerAction {
    /// Deliver this event downstream
    Emit(TranslationEvent, FlushReason),
    /// Arm the translation-wait timer for a language. The generation is
    /// echoed back through [`UtteranceAssembler::handle_timeout`] so stale
    /// firings are discarded.
    ArmTimeout { language: String, generation: u64 },
    /// Cancel the pending translation-wait timer for a language
    CancelTimeout { language: String },
}

/// One in-flight utterance for one source language.
#[derive(Debug, Default)]
struct Utterance {
    start_time_ms: Option<u64>,
    original: Vec<Token>,
    translation: Vec<Token>,
    waiting_for_translation: bool,
    timeout_generation: u64,
}

impl Utterance {
    fn is_empty(&self) -> bool {
        self.original.is_empty() && self.translation.is_empty()
    }
}

/// Per-stream, per-source-language token buffering with timeout-based
/// finalization.
pub struct UtteranceAssembler {
    utterances: HashMap<String, Utterance>,
    /// Configured target language, used when no translation token names one
    target_language: String,
    provider: &'static str,
    end_token: String,
}

impl UtteranceAssembler {
    pub fn new(provider: &'static str, target_language: &str, end_token: &str) -> Self {
        Self {
            utterances: HashMap::new(),
            target_language: normalize(target_language),
            provider,
            end_token: end_token.to_string(),
        }
    }

    /// Number of languages with buffered tokens.
    pub fn buffered_languages(&self) -> usize {
        self.utterances.values().filter(|u| !u.is_empty()).count()
    }

    /// Consume one upstream token batch.
    ///
    /// Non-final tokens are ignored entirely; in particular they neither
    /// extend nor clear a pending translation-wait timeout.
    pub fn ingest(&mut self, tokens: &[Token]) -> Vec<AssemblerAction> {
        let mut actions = Vec::new();

        let finals: Vec<&Token> = tokens.iter().filter(|t| t.is_final).collect();
        let ended = finals.iter().any(|t| t.text == self.end_token);

        // Group by source language, sorted for deterministic action order.
        let mut groups: BTreeMap<String, Vec<&Token>> = BTreeMap::new();
        for token in finals {
            if token.text == self.end_token {
                continue;
            }
            groups
                .entry(normalize(token.group_language()))
                .or_default()
                .push(token);
        }

        for (language, group) in &groups {
            let utterance = self.utterances.entry(language.clone()).or_default();

            for token in group {
                match token.status {
                    TokenStatus::Original => {
                        if utterance.start_time_ms.is_none() {
                            utterance.start_time_ms = Some(token.start_ms);
                        }
                        utterance.original.push((*token).clone());
                    }
                    TokenStatus::Translation => {
                        utterance.translation.push((*token).clone());
                    }
                }
            }

            if utterance.translation.is_empty() {
                if !utterance.original.is_empty() && !utterance.waiting_for_translation {
                    utterance.waiting_for_translation = true;
                    utterance.timeout_generation += 1;
                    actions.push(AssemblerAction::ArmTimeout {
                        language: language.clone(),
                        generation: utterance.timeout_generation,
                    });
                }
            } else if utterance.waiting_for_translation {
                utterance.waiting_for_translation = false;
                actions.push(AssemblerAction::CancelTimeout {
                    language: language.clone(),
                });
            }
        }

        // The end sentinel marks every currently-buffered language as ended
        // this message, not just the languages present in this batch.
        let candidates: Vec<String> = if ended {
            let mut keys: Vec<String> = self.utterances.keys().cloned().collect();
            keys.sort();
            keys
        } else {
            groups.keys().cloned().collect()
        };

        for language in candidates {
            let Some(utterance) = self.utterances.get(&language) else {
                continue;
            };
            let complete = !utterance.original.is_empty() && !utterance.waiting_for_translation;
            if !utterance.translation.is_empty() && (ended || complete) {
                let reason = if ended {
                    FlushReason::EndToken
                } else {
                    FlushReason::CompletePair
                };
                actions.push(AssemblerAction::Emit(
                    self.build_event(&language, utterance, ended),
                    reason,
                ));
            }
        }

        if ended {
            // The sentinel clears buffered utterances and timeouts entirely,
            // whether or not an emission happened.
            let mut languages: Vec<String> = self.utterances.keys().cloned().collect();
            languages.sort();
            for language in languages {
                if let Some(utterance) = self.utterances.remove(&language) {
                    if utterance.waiting_for_translation {
                        actions.push(AssemblerAction::CancelTimeout { language });
                    }
                }
            }
        }

        actions
    }

    /// The translation-wait timer for `language` fired.
    ///
    /// Emits the buffered original-only text as a final event and clears the
    /// utterance, so speech the upstream never translates is not lost.
    /// Stale firings (generation mismatch, or the wait already cleared) are
    /// ignored.
    pub fn handle_timeout(
        &mut self,
        language: &str,
        generation: u64,
    ) -> Option<(TranslationEvent, FlushReason)> {
        let utterance = self.utterances.get(language)?;
        if utterance.timeout_generation != generation || !utterance.waiting_for_translation {
            return None;
        }

        let event = self.build_event(language, utterance, true);
        self.utterances.remove(language);
        Some((event, FlushReason::TranslationTimeout))
    }

    /// Flush every language with buffered tokens as a final event. Called on
    /// stream close, before transport teardown.
    pub fn flush_all(&mut self) -> Vec<(TranslationEvent, FlushReason)> {
        let mut languages: Vec<String> = self
            .utterances
            .iter()
            .filter(|(_, u)| !u.is_empty())
            .map(|(l, _)| l.clone())
            .collect();
        languages.sort();

        let mut events = Vec::new();
        for language in languages {
            if let Some(utterance) = self.utterances.get(&language) {
                events.push((
                    self.build_event(&language, utterance, true),
                    FlushReason::StreamClose,
                ));
            }
        }
        self.utterances.clear();
        events
    }

    fn build_event(&self, language: &str, utterance: &Utterance, is_final: bool) -> TranslationEvent {
        let original_text: String = utterance.original.iter().map(|t| t.text.as_str()).collect();
        let translated_text: String = utterance.translation.iter().map(|t| t.text.as_str()).collect();

        let translate_language = utterance
            .translation
            .first()
            .map(|t| normalize(&t.language))
            .unwrap_or_else(|| self.target_language.clone());

        let start_time_ms = utterance
            .start_time_ms
            .or_else(|| utterance.translation.first().map(|t| t.start_ms))
            .unwrap_or(0);
        let end_time_ms = utterance
            .original
            .iter()
            .chain(utterance.translation.iter())
            .map(Token::end_ms)
            .max()
            .unwrap_or(start_time_ms);

        let confidences: Vec<f32> = utterance
            .original
            .iter()
            .filter_map(|t| t.confidence)
            .collect();
        let confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };

        TranslationEvent {
            text: if translated_text.is_empty() {
                original_text.clone()
            } else {
                translated_text
            },
            original_text: if original_text.is_empty() {
                None
            } else {
                Some(original_text)
            },
            is_final,
            start_time_ms,
            end_time_ms,
            transcribe_language: language.to_string(),
            translate_language,
            provider: self.provider.to_string(),
            confidence,
        }
    }
}
