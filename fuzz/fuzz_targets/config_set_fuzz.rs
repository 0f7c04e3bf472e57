#![no_main]
use libfuzzer_sys::fuzz_target;
use sipha_atn::{
    Atn, AtnConfig, AtnConfigSet, PredictionContext, PredictionContextCache, SemanticContext,
    StateId,
};

// Each 4-byte chunk drives one operation on the set
fuzz_target!(|data: &[u8]| {
    let atn = Atn::new();
    let mut cache = PredictionContextCache::default();
    let mut set = AtnConfigSet::new();

    for chunk in data.chunks_exact(4) {
        let (op, state, alt, extra) = (chunk[0], chunk[1] % 8, chunk[2] % 4 + 1, chunk[3]);
        match op % 8 {
            0..=3 => {
                let context = PredictionContext::empty_full()
                    .child(u32::from(extra % 5))
                    .child(u32::from(extra / 5 % 5));
                let mut config = AtnConfig::new(StateId::new(u32::from(state)), u32::from(alt), context)
                    .with_outer_context_depth(u32::from(op >> 6));
                if extra & 0x80 != 0 {
                    config = config.with_semantic_context(SemanticContext::predicate(0, u32::from(extra & 1), false));
                }
                if op & 0x20 != 0 {
                    config = config.hidden();
                }
                let before = set.len();
                if set.add(config, &mut cache).is_ok() {
                    assert!(set.len() <= before + 1);
                }
            }
            4 => {
                let _ = set.remove(usize::from(extra));
            }
            5 => set.strip_hidden_configs(),
            6 => set.optimize_configs(&atn),
            _ => {
                let _ = set.set_outermost(true);
                let frozen = set.freeze();
                let thawed = frozen.thaw(&mut cache);
                if let Ok(thawed) = thawed {
                    assert_eq!(thawed.len(), frozen.len());
                }
            }
        }
        assert!(!(set.is_outermost() && set.dips_into_outer_context()));
    }
});
