//! Tracing bootstrap for hosts that do not install their own subscriber.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Default filter directive for this crate's events
pub const DEFAULT_DIRECTIVE: &str = "edgerouter_core=info";

/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`
///
/// Adds [`DEFAULT_DIRECTIVE`] on top of the environment filter. Does
/// nothing if a global subscriber is already set, so calling it once per
/// invocation is fine.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_DIRECTIVE.parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}
