use env_logger::Env;

/// `info` by default, `RUST_LOG` overrides.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
