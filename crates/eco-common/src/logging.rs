//! Process-wide logging for the matching service.
//!
//! Knobs, all read once at startup:
//! - `RUST_LOG` selects levels (`info` when unset).
//! - `ECO_LOG_DIR` sends output to a daily rotated `<dir>/<app>.log` instead of stdout.
//! - `ECO_LOG_INCLUDE_BACKTRACE=1` also prints the standard panic report after the
//!   structured `panic captured` event.

use std::panic;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Keeps the non-blocking file writer flushing for the process lifetime.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic payload not string".into())
}

/// Reports panics in request handlers and background tasks as `error` events
/// tagged with the service instance id, so they land next to the run logs.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        let include_backtrace = env_flag("ECO_LOG_INCLUDE_BACKTRACE");

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));

            tracing::error!(
                application = app_name,
                instance_id = crate::run_id::instance(),
                thread_name = thread.name().unwrap_or("unknown"),
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %panic_message(info.payload()),
                "panic captured"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn log_dir() -> Option<PathBuf> {
    std::env::var_os("ECO_LOG_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

fn file_writer(dir: &Path, app_name: &str) -> std::io::Result<BoxMakeWriter> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_tracing_subscriber(app_name: &'static str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(dir) = log_dir() else {
        let _ = builder.try_init();
        return;
    };

    match file_writer(&dir, app_name) {
        Ok(writer) => {
            if builder.with_ansi(false).with_writer(writer).try_init().is_ok() {
                tracing::info!(log_dir = %dir.display(), "logging to rotating file");
            }
        }
        Err(err) => {
            let _ = builder.try_init();
            tracing::warn!(error = %err, log_dir = %dir.display(), "log directory unusable; logging to stdout");
        }
    }
}
