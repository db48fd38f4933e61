use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool, log_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match (verbose, log_level) {
        (true, _) => EnvFilter::new("pref_sync=debug,info"),
        (false, Some(level)) => EnvFilter::new(format!("pref_sync={}", level)),
        (false, None) => EnvFilter::new("pref_sync=info"),
    })
}

pub fn init_cli_logger(verbose: bool, log_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger(log_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(false, log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(), // JSON 格式方便交給日誌收集器
        )
        .init();
}
