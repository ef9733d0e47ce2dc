//! Logging setup (ambient stack). Components log through the `log` facade
//! exactly as the breakpoint table and thread controller already do
//! (`log::debug!`, `log::warn!`); an embedder wires in whichever subscriber
//! it likes, but `init` gives it a sane `env_logger` default so the crate's
//! own test harness and small example binaries don't need to duplicate it.

/// Initializes `env_logger` from `RUST_LOG`, defaulting to `warn` when unset.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(cfg!(test))
        .try_init();
}
