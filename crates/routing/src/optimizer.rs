//! Subscription optimizer
//!
//! Computes the minimal set of upstream connections for a subscription set
//! and assigns each language's transcription output to exactly one plan.
//! Five consolidation steps run in priority order, each claiming languages
//! greedily; a claimed language is owned once and forever for that
//! computation. All iteration is over sorted collections, so equal-priority
//! ties resolve deterministically.

use std::collections::{BTreeMap, BTreeSet};

use speech_bridge_core::{ProviderCapabilities, AUTO_SOURCE};

use crate::{PlanConfig, PlanKind, StreamPlan, Subscription};

/// Stateless planner over subscription sets. Plans are recomputed from
/// scratch whenever the subscription set changes.
pub struct SubscriptionOptimizer;

impl SubscriptionOptimizer {
    /// Compute stream plans for a subscription set against one provider's
    /// capability tables.
    ///
    /// Unparseable subscription strings are logged and skipped; every valid
    /// subscription is handled by exactly one returned plan.
    pub fn optimize(subscriptions: &[String], caps: &ProviderCapabilities) -> Vec<StreamPlan> {
        let mut transcriptions: BTreeSet<String> = BTreeSet::new();
        let mut remaining: BTreeSet<(String, String)> = BTreeSet::new();

        for raw in subscriptions {
            match Subscription::parse(raw) {
                Ok(Subscription::Transcription { language }) => {
                    transcriptions.insert(language);
                }
                Ok(Subscription::Translation { source, target }) => {
                    remaining.insert((source, target));
                }
                Err(e) => tracing::warn!("Skipping subscription: {}", e),
            }
        }

        let mut owned: BTreeSet<String> = BTreeSet::new();
        let mut plans: Vec<StreamPlan> = Vec::new();

        // 1. Dedicated transcription streams own their language outright;
        //    no later step may claim it.
        for language in &transcriptions {
            owned.insert(language.clone());
            plans.push(StreamPlan {
                kind: PlanKind::TranscriptionOnly,
                config: PlanConfig::Transcription {
                    language: language.clone(),
                },
                handled_subscriptions: vec![Subscription::Transcription {
                    language: language.clone(),
                }],
                owns_transcription: vec![language.clone()],
                skip_transcription_for: Vec::new(),
            });
        }

        // 2. Opposite-direction pairs the provider can serve bidirectionally
        //    merge onto one connection.
        let candidates: Vec<(String, String)> = remaining
            .iter()
            .filter(|(source, target)| source < target)
            .cloned()
            .collect();
        for (a, b) in candidates {
            let forward = (a.clone(), b.clone());
            let reverse = (b.clone(), a.clone());
            if !remaining.contains(&reverse) || !caps.is_two_way_pair(&a, &b) {
                continue;
            }
            remaining.remove(&forward);
            remaining.remove(&reverse);

            let (owns, skip) = claim(&mut owned, [a.clone(), b.clone()]);
            plans.push(StreamPlan {
                kind: PlanKind::TwoWay,
                config: PlanConfig::TwoWay {
                    a: a.clone(),
                    b: b.clone(),
                },
                handled_subscriptions: vec![
                    Subscription::Translation {
                        source: a.clone(),
                        target: b.clone(),
                    },
                    Subscription::Translation {
                        source: b,
                        target: a,
                    },
                ],
                owns_transcription: owns,
                skip_transcription_for: skip,
            });
        }

        // 3. Everything still targeting English consolidates onto one
        //    any-source connection. The plan claims English itself; its
        //    absorbed sources stay claimable by later steps, but must be
        //    suppressed here when another plan owns them.
        if caps.supports_auto_detection {
            let english: Vec<(String, String)> = remaining
                .iter()
                .filter(|(_, target)| target == "en")
                .cloned()
                .collect();
            if !english.is_empty() {
                for pair in &english {
                    remaining.remove(pair);
                }

                let (owns, mut skip) = claim(&mut owned, ["en".to_string()]);
                for (source, _) in &english {
                    if source != AUTO_SOURCE && owned.contains(source) && !owns.contains(source) {
                        skip.push(source.clone());
                    }
                }
                skip.sort();
                skip.dedup();

                plans.push(StreamPlan {
                    kind: PlanKind::UniversalEnglish,
                    config: PlanConfig::AnySource {
                        target: "en".to_string(),
                    },
                    handled_subscriptions: english
                        .into_iter()
                        .map(|(source, target)| Subscription::Translation { source, target })
                        .collect(),
                    owns_transcription: owns,
                    skip_transcription_for: skip,
                });
            }
        }

        // 4. Several distinct sources toward one target merge when the
        //    provider supports simultaneous sources.
        if caps.supports_multi_source {
            let mut by_target: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (source, target) in &remaining {
                if source != AUTO_SOURCE {
                    by_target
                        .entry(target.clone())
                        .or_default()
                        .insert(source.clone());
                }
            }

            for (target, sources) in by_target {
                if sources.len() < 2 {
                    continue;
                }
                for source in &sources {
                    remaining.remove(&(source.clone(), target.clone()));
                }

                let (owns, skip) = claim(&mut owned, sources.iter().cloned());
                plans.push(StreamPlan {
                    kind: PlanKind::MultiSource,
                    config: PlanConfig::MultiSource {
                        sources: sources.iter().cloned().collect(),
                        target: target.clone(),
                    },
                    handled_subscriptions: sources
                        .into_iter()
                        .map(|source| Subscription::Translation {
                            source,
                            target: target.clone(),
                        })
                        .collect(),
                    owns_transcription: owns,
                    skip_transcription_for: skip,
                });
            }
        }

        // 5. Whatever could not be consolidated gets its own connection.
        //    Ownership falls to the first claimer; later duplicates only
        //    suppress the transcription side, translation still flows.
        for (source, target) in std::mem::take(&mut remaining) {
            let (config, owns, skip) = if source == AUTO_SOURCE {
                (
                    PlanConfig::AnySource {
                        target: target.clone(),
                    },
                    Vec::new(),
                    Vec::new(),
                )
            } else {
                let (owns, skip) = claim(&mut owned, [source.clone()]);
                (
                    PlanConfig::OneWay {
                        source: source.clone(),
                        target: target.clone(),
                    },
                    owns,
                    skip,
                )
            };

            plans.push(StreamPlan {
                kind: PlanKind::Individual,
                config,
                handled_subscriptions: vec![Subscription::Translation { source, target }],
                owns_transcription: owns,
                skip_transcription_for: skip,
            });
        }

        plans
    }
}

/// Claim each language not yet owned; report the rest as suppressed.
fn claim(
    owned: &mut BTreeSet<String>,
    languages: impl IntoIterator<Item = String>,
) -> (Vec<String>, Vec<String>) {
    let mut owns = Vec::new();
    let mut skip = Vec::new();
    for language in languages {
        if owned.insert(language.clone()) {
            owns.push(language);
        } else {
            skip.push(language);
        }
    }
    (owns, skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> ProviderCapabilities {
        let languages = ["de", "en", "es", "fr", "it", "pt"];
        let mut pairs: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for source in languages {
            pairs.insert(
                source.to_string(),
                languages
                    .iter()
                    .filter(|t| **t != source)
                    .map(|t| t.to_string())
                    .collect(),
            );
        }
        let mut caps = ProviderCapabilities {
            supported_language_pairs: pairs,
            supports_auto_detection: true,
            supports_multi_source: true,
            max_concurrent_streams: 50,
            ..Default::default()
        };
        for other in ["de", "es", "fr", "it", "pt"] {
            caps.add_two_way_pair("en", other);
        }
        caps
    }

    fn subs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedicated_transcription_owns_language() {
        let plans =
            SubscriptionOptimizer::optimize(&subs(&["transcription:en-US"]), &caps());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].kind, PlanKind::TranscriptionOnly);
        assert_eq!(plans[0].owns_transcription, vec!["en"]);
    }

    #[test]
    fn test_duplicate_subscriptions_collapse() {
        let plans = SubscriptionOptimizer::optimize(
            &subs(&["transcription:en", "transcription:en-US", "transcription:en"]),
            &caps(),
        );
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn test_universal_english_consolidates_targets() {
        let plans = SubscriptionOptimizer::optimize(
            &subs(&["translation:es->en", "translation:de->en", "translation:all->en"]),
            &caps(),
        );
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.kind, PlanKind::UniversalEnglish);
        assert_eq!(
            plan.config,
            PlanConfig::AnySource {
                target: "en".to_string()
            }
        );
        assert_eq!(plan.handled_subscriptions.len(), 3);
        assert_eq!(plan.owns_transcription, vec!["en"]);
    }

    #[test]
    fn test_universal_english_skips_sources_owned_elsewhere() {
        let plans = SubscriptionOptimizer::optimize(
            &subs(&["transcription:es", "translation:es->en"]),
            &caps(),
        );
        assert_eq!(plans.len(), 2);

        let universal = plans
            .iter()
            .find(|p| p.kind == PlanKind::UniversalEnglish)
            .unwrap();
        assert_eq!(universal.owns_transcription, vec!["en"]);
        assert_eq!(universal.skip_transcription_for, vec!["es"]);
    }

    #[test]
    fn test_universal_english_requires_auto_detection() {
        let mut caps = caps();
        caps.supports_auto_detection = false;

        let plans = SubscriptionOptimizer::optimize(
            &subs(&["translation:es->en", "translation:de->en"]),
            &caps,
        );
        // Falls through to multi-source instead
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].kind, PlanKind::MultiSource);
    }

    #[test]
    fn test_multi_source_requires_capability() {
        let mut caps = caps();
        caps.supports_auto_detection = false;
        caps.supports_multi_source = false;

        let plans = SubscriptionOptimizer::optimize(
            &subs(&["translation:es->fr", "translation:de->fr"]),
            &caps,
        );
        assert_eq!(plans.len(), 2);
        assert!(plans.iter().all(|p| p.kind == PlanKind::Individual));
    }

    #[test]
    fn test_individual_duplicate_source_suppresses_transcription() {
        let plans = SubscriptionOptimizer::optimize(
            &subs(&["translation:es->fr", "translation:es->de"]),
            &caps(),
        );
        assert_eq!(plans.len(), 2);

        // Deterministic order: (es,de) sorts before (es,fr)
        assert_eq!(plans[0].owns_transcription, vec!["es"]);
        assert!(plans[0].skip_transcription_for.is_empty());
        assert!(plans[1].owns_transcription.is_empty());
        assert_eq!(plans[1].skip_transcription_for, vec!["es"]);
    }

    #[test]
    fn test_any_source_individual_owns_nothing() {
        let plans =
            SubscriptionOptimizer::optimize(&subs(&["translation:all->fr"]), &caps());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].kind, PlanKind::Individual);
        assert_eq!(
            plans[0].config,
            PlanConfig::AnySource {
                target: "fr".to_string()
            }
        );
        assert!(plans[0].owns_transcription.is_empty());
    }

    #[test]
    fn test_invalid_subscriptions_are_skipped() {
        let plans = SubscriptionOptimizer::optimize(
            &subs(&["transcription:en", "bogus:thing", "translation:en->en"]),
            &caps(),
        );
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_no_plans() {
        let plans = SubscriptionOptimizer::optimize(&[], &caps());
        assert!(plans.is_empty());
    }
}
