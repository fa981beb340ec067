use is_terminal::IsTerminal;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV_VAR: &str = "GITREPORT_LOG";

pub fn setup_logger(default_level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .init();
}
