//! Logging initialization

/// Initialize the logging system, falling back to `default_level` when
/// `RUST_LOG` is not set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_level(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Initialize a test logger that writes through the test harness
#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
