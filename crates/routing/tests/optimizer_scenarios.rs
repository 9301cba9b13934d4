//! End-to-end optimizer scenarios
//!
//! Exercises the consolidation priorities and the two planning invariants:
//! every subscription handled exactly once, and every claimed language
//! owned by exactly one plan.

use std::collections::{BTreeMap, BTreeSet};

use speech_bridge_core::ProviderCapabilities;
use speech_bridge_routing::{PlanConfig, PlanKind, StreamPlan, Subscription, SubscriptionOptimizer};

fn caps() -> ProviderCapabilities {
    let languages = ["de", "en", "es", "fr", "it", "ja", "pt"];
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

/// Every input subscription is handled by exactly one plan, and every
/// claimed language is owned by exactly one plan (everything else that
/// touches it suppresses it).
fn assert_invariants(input: &[String], plans: &[StreamPlan]) {
    let expected: BTreeSet<Subscription> = input
        .iter()
        .filter_map(|raw| Subscription::parse(raw).ok())
        .collect();

    let mut handled: Vec<Subscription> = plans
        .iter()
        .flat_map(|p| p.handled_subscriptions.iter().cloned())
        .collect();
    let handled_count = handled.len();
    handled.sort();
    handled.dedup();
    assert_eq!(
        handled_count,
        handled.len(),
        "a subscription was handled by more than one plan"
    );
    assert_eq!(
        expected,
        handled.into_iter().collect::<BTreeSet<_>>(),
        "handled subscriptions do not partition the input"
    );

    let mut owners: BTreeMap<&str, usize> = BTreeMap::new();
    for plan in plans {
        for language in &plan.owns_transcription {
            *owners.entry(language).or_default() += 1;
        }
    }
    for (language, count) in &owners {
        assert_eq!(*count, 1, "language '{}' owned by {} plans", language, count);
    }

    // A suppressed language is always owned somewhere
    for plan in plans {
        for language in &plan.skip_transcription_for {
            assert!(
                owners.contains_key(language.as_str()),
                "language '{}' suppressed but never owned",
                language
            );
        }
    }

    // Dedicated transcription subscriptions are always owned
    for sub in &expected {
        if let Subscription::Transcription { language } = sub {
            assert!(owners.contains_key(language.as_str()));
        }
    }
}

#[test]
fn scenario_transcription_with_multi_source() {
    // transcription:en owns English; the two translation subscriptions
    // merge toward "es" and the merged plan suppresses English
    let input = subs(&[
        "transcription:en",
        "translation:en->es",
        "translation:fr->es",
    ]);
    let plans = SubscriptionOptimizer::optimize(&input, &caps());
    assert_invariants(&input, &plans);
    assert_eq!(plans.len(), 2);

    let transcription = plans
        .iter()
        .find(|p| p.kind == PlanKind::TranscriptionOnly)
        .unwrap();
    assert_eq!(transcription.owns_transcription, vec!["en"]);

    let multi = plans
        .iter()
        .find(|p| p.kind == PlanKind::MultiSource)
        .unwrap();
    assert_eq!(
        multi.config,
        PlanConfig::MultiSource {
            sources: vec!["en".to_string(), "fr".to_string()],
            target: "es".to_string(),
        }
    );
    assert_eq!(multi.owns_transcription, vec!["fr"]);
    assert_eq!(multi.skip_transcription_for, vec!["en"]);
}

#[test]
fn scenario_two_way_pair() {
    let input = subs(&["translation:en->fr", "translation:fr->en"]);
    let plans = SubscriptionOptimizer::optimize(&input, &caps());
    assert_invariants(&input, &plans);

    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(plan.kind, PlanKind::TwoWay);
    assert_eq!(
        plan.config,
        PlanConfig::TwoWay {
            a: "en".to_string(),
            b: "fr".to_string(),
        }
    );
    assert_eq!(plan.handled_subscriptions.len(), 2);
    let mut owned = plan.owns_transcription.clone();
    owned.sort();
    assert_eq!(owned, vec!["en", "fr"]);
}

#[test]
fn scenario_two_way_not_supported_falls_through() {
    // ja<->en is not a two-way pair; both subscriptions target each other
    // but cannot share a connection. The en-targeted one joins the
    // universal plan.
    let input = subs(&["translation:en->ja", "translation:ja->en"]);
    let plans = SubscriptionOptimizer::optimize(&input, &caps());
    assert_invariants(&input, &plans);

    assert_eq!(plans.len(), 2);
    assert!(plans.iter().any(|p| p.kind == PlanKind::UniversalEnglish));
    assert!(plans.iter().any(|p| p.kind == PlanKind::Individual));
}

#[test]
fn scenario_universal_english_above_multi_source() {
    // All English targets consolidate onto the universal plan before
    // multi-source grouping sees them; the remaining pt targets are too few
    // to merge.
    let input = subs(&[
        "translation:es->en",
        "translation:fr->en",
        "translation:de->pt",
    ]);
    let plans = SubscriptionOptimizer::optimize(&input, &caps());
    assert_invariants(&input, &plans);

    assert_eq!(plans.len(), 2);
    let universal = plans
        .iter()
        .find(|p| p.kind == PlanKind::UniversalEnglish)
        .unwrap();
    assert_eq!(universal.handled_subscriptions.len(), 2);
    assert_eq!(universal.owns_transcription, vec!["en"]);

    let individual = plans
        .iter()
        .find(|p| p.kind == PlanKind::Individual)
        .unwrap();
    assert_eq!(individual.owns_transcription, vec!["de"]);
}

#[test]
fn scenario_full_classroom() {
    // A realistic mixed set: dedicated captions, a bilingual conversation,
    // English consolidation, and a multi-source group
    let input = subs(&[
        "transcription:en",
        "transcription:ja",
        "translation:en->es",
        "translation:es->en",
        "translation:fr->en",
        "translation:de->it",
        "translation:pt->it",
        "translation:all->fr",
    ]);
    let plans = SubscriptionOptimizer::optimize(&input, &caps());
    assert_invariants(&input, &plans);

    // en/ja transcription, en<->es two-way, fr->en universal, de+pt->it
    // multi-source, all->fr individual
    assert_eq!(plans.len(), 6);

    let two_way = plans.iter().find(|p| p.kind == PlanKind::TwoWay).unwrap();
    // en is owned by its transcription plan, es is claimed here
    assert_eq!(two_way.owns_transcription, vec!["es"]);
    assert_eq!(two_way.skip_transcription_for, vec!["en"]);

    let universal = plans
        .iter()
        .find(|p| p.kind == PlanKind::UniversalEnglish)
        .unwrap();
    // en already owned: the universal plan only suppresses it
    assert!(universal.owns_transcription.is_empty());
    assert_eq!(universal.skip_transcription_for, vec!["en"]);

    let multi = plans
        .iter()
        .find(|p| p.kind == PlanKind::MultiSource)
        .unwrap();
    let mut owned = multi.owns_transcription.clone();
    owned.sort();
    assert_eq!(owned, vec!["de", "pt"]);
}

#[test]
fn optimizer_is_deterministic() {
    let input = subs(&[
        "translation:es->fr",
        "translation:de->fr",
        "translation:pt->fr",
        "translation:es->de",
        "transcription:pt",
    ]);

    let first = SubscriptionOptimizer::optimize(&input, &caps());
    let mut shuffled = input.clone();
    shuffled.reverse();
    let second = SubscriptionOptimizer::optimize(&shuffled, &caps());

    let keys = |plans: &[StreamPlan]| {
        plans
            .iter()
            .map(|p| p.subscription_key())
            .collect::<Vec<_>>()
    };
    assert_eq!(keys(&first), keys(&second));

    let owners = |plans: &[StreamPlan]| {
        plans
            .iter()
            .map(|p| p.owns_transcription.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(owners(&first), owners(&second));
}
