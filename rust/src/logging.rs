use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "whispa_core=debug,info";
const LOG_FILE_NAME: &str = "whispa.log";

/// Logging initialization.
///
/// - stderr via `tracing-subscriber::fmt`, filtered by `RUST_LOG` when set
/// - `<data_dir>/whispa.log` as a file fallback so logs stay retrievable when the host app
///   swallows stderr
///
/// Called once at the start of `FfiApp::new()`, before anything else. Later calls are
/// no-ops.
pub fn init_logging(data_dir: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let file_layer = if data_dir.is_empty() {
        None
    } else {
        let _ = std::fs::create_dir_all(data_dir);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(std::path::Path::new(data_dir).join(LOG_FILE_NAME))
            .ok()
            .map(|file| {
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
            })
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}
