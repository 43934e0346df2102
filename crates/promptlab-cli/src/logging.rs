use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "PROMPTLAB_LOG";
pub const LOG_FORMAT_ENV: &str = "PROMPTLAB_LOG_FORMAT";

/// Logs go to stderr so stdout stays clean for reports and JSON.
pub fn init_logging() {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV).ok().as_deref() == Some("json");

    let builder = fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) is not an error.
    let _ = if json {
        builder
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .try_init()
    } else {
        builder.try_init()
    };
}
