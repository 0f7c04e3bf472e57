//! Shared helpers for integration tests

#![allow(dead_code)]

use sipha_atn::{AtnConfig, PredictionContext, StateId};
use std::sync::Arc;

/// Install a test-writer subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a call stack from the top return state down to the outermost
/// invocation
pub fn stack(return_states: &[u32]) -> Arc<PredictionContext> {
    return_states
        .iter()
        .rev()
        .fold(PredictionContext::empty_full(), |ctx, &s| ctx.child(s))
}

pub fn config(state: u32, alt: u32, context: Arc<PredictionContext>) -> AtnConfig {
    AtnConfig::new(StateId::new(state), alt, context)
}
