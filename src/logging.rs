use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialise logging. In debug mode the default level is `debug`, otherwise
/// `info`. The level can be overridden via `RUST_LOG` only when debug logging
/// is enabled. When `log_file` is set, output goes to that file instead of
/// stderr.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file.as_ref().and_then(|path| {
        let dir = path.parent()?.to_path_buf();
        let name = path.file_name()?.to_owned();
        Some((dir, name))
    }) {
        Some((dir, name)) => {
            let _ = std::fs::create_dir_all(&dir);
            let appender = tracing_appender::rolling::never(dir, name);
            let _ = builder.with_ansi(false).with_writer(appender).try_init();
        }
        None => {
            let _ = builder.try_init();
        }
    }
}
