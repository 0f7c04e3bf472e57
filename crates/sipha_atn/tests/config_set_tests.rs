//! Behavioral tests for configuration sets

mod common;

use common::{config, init_tracing, stack};
use sipha_atn::{
    Atn, AtnConfigSet, ConfigSetError, ConflictInfo, PredictionContext, PredictionContextCache,
    SemanticContext, StateId,
};
use std::sync::Arc;

#[test]
fn test_walkthrough_scenario() {
    init_tracing();
    let mut cache = PredictionContextCache::default();
    let mut set = AtnConfigSet::new();
    let (c1, c2, c3, c4) = (stack(&[1]), stack(&[2]), stack(&[3]), stack(&[4]));
    let p = SemanticContext::predicate(0, 0, false);

    assert!(set.add(config(5, 1, c1.clone()), &mut cache).unwrap());
    assert_eq!(set.len(), 1);
    assert_eq!(set.unique_alt(), Some(1));

    assert!(set.add(config(5, 1, c2.clone()), &mut cache).unwrap());
    assert_eq!(set.len(), 1);
    let expected = PredictionContext::join(&c1, &c2, &mut PredictionContextCache::uncached());
    assert_eq!(**set.get(0).unwrap().context(), *expected);

    assert!(
        set.add(config(5, 1, c3).with_semantic_context(p), &mut cache)
            .unwrap()
    );
    assert_eq!(set.len(), 2);
    assert!(set.has_semantic_context());

    assert!(set.add(config(7, 2, c4), &mut cache).unwrap());
    assert_eq!(set.len(), 3);
    assert_eq!(set.unique_alt(), None);
    assert_eq!(set.unique_alt_or_invalid(), Atn::INVALID_ALT_NUMBER);
}

#[test]
fn test_idempotent_merge() {
    let mut cache = PredictionContextCache::default();
    let mut set = AtnConfigSet::new();

    assert!(set.add(config(5, 1, stack(&[1])), &mut cache).unwrap());
    let before: Vec<_> = set.iter().cloned().collect();

    assert!(!set.add(config(5, 1, stack(&[1])), &mut cache).unwrap());
    assert_eq!(set.len(), 1);
    assert_eq!(set.iter().cloned().collect::<Vec<_>>(), before);
}

#[test]
fn test_merge_with_subsumed_context_reports_no_change() {
    let mut cache = PredictionContextCache::default();
    let mut set = AtnConfigSet::new();

    set.add(config(5, 1, stack(&[1])), &mut cache).unwrap();
    set.add(config(5, 1, stack(&[2])), &mut cache).unwrap();
    let merged = Arc::clone(set.get(0).unwrap().context());

    assert!(!set.add(config(5, 1, stack(&[2])), &mut cache).unwrap());
    assert!(Arc::ptr_eq(set.get(0).unwrap().context(), &merged));
}

#[test]
fn test_overflow_coexistence() {
    let mut set = AtnConfigSet::new();
    let a = config(5, 1, stack(&[1]));
    let d = config(5, 1, stack(&[1])).with_semantic_context(SemanticContext::predicate(2, 0, false));

    set.add_uncached(a.clone()).unwrap();
    set.add_uncached(d.clone()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.get(0), Some(&a));
    assert_eq!(set.get(1), Some(&d));
}

#[test]
fn test_unique_alt_tracking() {
    let mut only_one = AtnConfigSet::new();
    only_one.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    only_one.add_uncached(config(2, 1, stack(&[1]))).unwrap();
    assert_eq!(only_one.unique_alt(), Some(1));

    let mut mixed = AtnConfigSet::new();
    mixed.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    mixed.add_uncached(config(2, 2, stack(&[1]))).unwrap();
    assert_eq!(mixed.unique_alt(), None);

    // stays unset even when later configurations agree with the first
    mixed.add_uncached(config(3, 1, stack(&[1]))).unwrap();
    assert_eq!(mixed.unique_alt(), None);
}

#[test]
fn test_has_semantic_context() {
    let mut set = AtnConfigSet::new();
    set.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    set.add_uncached(config(2, 1, stack(&[1]))).unwrap();
    assert!(!set.has_semantic_context());

    set.add_uncached(
        config(3, 1, stack(&[1])).with_semantic_context(SemanticContext::precedence(1)),
    )
    .unwrap();
    assert!(set.has_semantic_context());
}

#[test]
fn test_freeze_equality() {
    let mut set = AtnConfigSet::new();
    set.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    set.add_uncached(config(2, 2, stack(&[2]))).unwrap();

    let frozen = set.freeze();
    assert_eq!(frozen, set);
    assert_eq!(frozen.to_string(), set.to_string());

    set.add_uncached(config(3, 3, stack(&[3]))).unwrap();
    assert_ne!(frozen, set);
    assert_eq!(frozen.len(), 2);
}

#[test]
fn test_equality_is_order_sensitive() {
    let mut forward = AtnConfigSet::new();
    forward.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    forward.add_uncached(config(2, 1, stack(&[1]))).unwrap();

    let mut backward = AtnConfigSet::new();
    backward.add_uncached(config(2, 1, stack(&[1]))).unwrap();
    backward.add_uncached(config(1, 1, stack(&[1]))).unwrap();

    assert_ne!(forward, backward);
    assert_eq!(forward.to_string(), backward.to_string());
}

#[test]
fn test_equality_considers_outermost_and_conflicts() {
    let mut a = AtnConfigSet::new();
    a.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    let mut b = a.clone();
    assert_eq!(a, b);

    b.set_outermost(true).unwrap();
    assert_ne!(a, b);

    a.set_outermost(true).unwrap();
    a.set_conflict_info(Some(ConflictInfo::new([1].into_iter().collect(), true)));
    assert_ne!(a, b);
}

#[test]
fn test_writable_clone_evolves_independently() {
    let mut original = AtnConfigSet::new();
    original.add_uncached(config(1, 1, stack(&[1]))).unwrap();

    let mut copy = original.clone();
    copy.add_uncached(config(1, 1, stack(&[2]))).unwrap();
    copy.add_uncached(config(2, 2, stack(&[2]))).unwrap();

    assert_eq!(original.len(), 1);
    assert_eq!(original.get(0).unwrap().context().size(), 1);
    assert_eq!(original.unique_alt(), Some(1));
    assert_eq!(copy.len(), 2);
}

#[test]
fn test_round_trip_rebuild() {
    let mut cache = PredictionContextCache::default();
    let mut set = AtnConfigSet::new();
    set.add(config(1, 1, stack(&[1])), &mut cache).unwrap();
    set.add(config(1, 1, stack(&[2])), &mut cache).unwrap();
    set.add(
        config(1, 1, stack(&[3])).with_semantic_context(SemanticContext::predicate(0, 1, false)),
        &mut cache,
    )
    .unwrap();
    let frozen = set.into_frozen();

    let mut replayed = AtnConfigSet::new();
    replayed
        .add_all(frozen.iter().cloned(), &mut cache)
        .unwrap();
    let thawed = frozen.thaw(&mut cache).unwrap();

    assert_eq!(replayed.unique_alt(), thawed.unique_alt());
    assert_eq!(replayed.has_semantic_context(), thawed.has_semantic_context());
    assert_eq!(replayed, thawed);
    assert_eq!(thawed, frozen);
}

#[test]
fn test_strip_hidden_scenario() {
    init_tracing();
    let mut set = AtnConfigSet::new();
    set.add_uncached(config(1, 1, stack(&[1]))).unwrap();
    set.add_uncached(config(2, 1, stack(&[1])).hidden()).unwrap();
    set.add_uncached(config(3, 2, stack(&[1]))).unwrap();

    let before = set.len();
    set.strip_hidden_configs();
    assert_eq!(set.len(), before - 1);
    assert_eq!(
        set.iter().map(|c| c.state()).collect::<Vec<_>>(),
        vec![StateId::new(1), StateId::new(3)]
    );

    // merging into the survivors still works afterwards
    assert!(set.add_uncached(config(3, 2, stack(&[9]))).unwrap());
    assert_eq!(set.len(), 2);
}

#[test]
fn test_outermost_set_rejects_hidden_and_outer_configs() {
    let mut set = AtnConfigSet::new();
    set.set_outermost(true).unwrap();

    assert!(matches!(
        set.add_uncached(config(1, 1, stack(&[1])).hidden()),
        Err(ConfigSetError::HiddenInOutermost { alt: 1, .. })
    ));
    assert!(matches!(
        set.add_uncached(config(1, 1, stack(&[1])).with_outer_context_depth(1)),
        Err(ConfigSetError::OuterContextInOutermost { alt: 1, .. })
    ));
    assert!(set.is_empty());
    assert!(!set.dips_into_outer_context());
}

#[test]
fn test_cursor_removal_through_public_api() {
    let mut set = AtnConfigSet::new();
    for state in 1..=5 {
        set.add_uncached(config(state, state % 2 + 1, stack(&[1]))).unwrap();
    }

    let mut cursor = set.cursor();
    assert_eq!(cursor.remove(), Err(ConfigSetError::NoCurrentConfig));
    while let Some(config) = cursor.next_config() {
        if config.alt() == 1 {
            cursor.remove().unwrap();
        }
    }

    assert_eq!(set.len(), 3);
    assert!(set.iter().all(|c| c.alt() == 2));
}

#[test]
fn test_optimize_configs_shares_contexts_across_sets() {
    let atn = Atn::new();
    let mut first = AtnConfigSet::new();
    let mut second = AtnConfigSet::new();
    first.add_uncached(config(1, 1, stack(&[4, 8]))).unwrap();
    second.add_uncached(config(2, 1, stack(&[4, 8]))).unwrap();

    first.optimize_configs(&atn);
    second.optimize_configs(&atn);
    assert!(Arc::ptr_eq(
        first.get(0).unwrap().context(),
        second.get(0).unwrap().context()
    ));

    let mut empty = AtnConfigSet::new();
    empty.optimize_configs(&atn);
    assert!(empty.is_empty());
}

#[test]
fn test_frozen_sets_shared_across_threads() {
    let mut set = AtnConfigSet::new();
    for state in 0..16 {
        set.add_uncached(config(state, 1, stack(&[state]))).unwrap();
    }
    let frozen = set.into_frozen();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let frozen = frozen.clone();
            std::thread::spawn(move || {
                frozen
                    .iter()
                    .filter(|c| frozen.contains(c))
                    .count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 16);
    }
}

#[test]
fn test_display_format() {
    let mut set = AtnConfigSet::new();
    set.add_uncached(config(3, 1, stack(&[1])).with_outer_context_depth(2))
        .unwrap();
    set.add_uncached(
        config(2, 1, stack(&[1])).with_semantic_context(SemanticContext::predicate(1, 0, false)),
    )
    .unwrap();
    set.set_conflict_info(Some(ConflictInfo::new([1, 2].into_iter().collect(), false)));

    assert_eq!(
        set.to_string(),
        "[(2,1,{1:0}?), (3,1,up=2)],hasSemanticContext=true,uniqueAlt=1,conflictingAlts={1, 2}*,dipsIntoOuterContext"
    );
}
