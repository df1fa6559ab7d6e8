//! Property-based tests for alma_core.
//!
//! Range invariants that must hold for every input the pipeline may see.

use alma_core::{NewMemory, PersonalityProfile, RelationshipDelta, RelationshipVector};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_profile() -> impl Strategy<Value = PersonalityProfile> {
    (
        0.0f32..=100.0,
        0.0f32..=100.0,
        0.0f32..=100.0,
        0.0f32..=100.0,
        0.0f32..=100.0,
    )
        .prop_map(|(o, c, e, a, n)| PersonalityProfile {
            openness: o,
            conscientiousness: c,
            extraversion: e,
            agreeableness: a,
            neuroticism: n,
        })
}

fn arb_any_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        -1000.0f32..1000.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// In-range traits always give a resilience in [0, 1].
    #[test]
    fn resilience_in_unit_range(p in arb_profile()) {
        let r = p.resilience();
        prop_assert!(r.is_finite());
        prop_assert!((-1e-5..=1.0 + 1e-5).contains(&r), "resilience out of range: {}", r);
    }

    /// Higher neuroticism never raises resilience.
    #[test]
    fn resilience_non_increasing_in_neuroticism(p in arb_profile(), bump in 0.0f32..=50.0) {
        let mut worse = p;
        worse.neuroticism = (p.neuroticism + bump).min(100.0);
        prop_assert!(worse.resilience() <= p.resilience() + 1e-5);
    }

    /// Every memory the pipeline can build respects the documented ranges.
    #[test]
    fn memory_fields_always_clamped(
        importance in any::<i32>(),
        weight in any::<i32>(),
        intensity in proptest::option::of(arb_any_f32()),
    ) {
        let m = NewMemory {
            importance,
            emotional_weight: weight,
            emotional_intensity: intensity,
            ..Default::default()
        }
        .into_memory();
        prop_assert!((1..=10).contains(&m.importance));
        prop_assert!((1..=10).contains(&m.emotional_weight));
        prop_assert!(m.emotional_intensity.is_finite());
        prop_assert!((0.0..=100.0).contains(&m.emotional_intensity));
    }

    /// Applying any delta keeps the relationship inside [0, 100].
    #[test]
    fn relationship_delta_stays_in_range(
        t in 0.0f32..=100.0, i in 0.0f32..=100.0, r in 0.0f32..=100.0,
        dt in arb_any_f32(), di in arb_any_f32(), dr in arb_any_f32(),
        max_step in 0.0f32..=50.0,
    ) {
        let base = RelationshipVector::new(t, i, r);
        let out = RelationshipDelta { trust: dt, intimacy: di, respect: dr }.apply(&base, max_step);
        for v in [out.trust, out.intimacy, out.respect] {
            prop_assert!(v.is_finite());
            prop_assert!((0.0..=100.0).contains(&v));
        }
        prop_assert!((out.trust - t).abs() <= max_step + 1e-3);
    }
}
