//! File-backed logging setup.
//!
//! Logs go to a rolling file under the user's data directory so stdout
//! stays clean for command output. Logging is optional: if the log
//! directory or the subscriber cannot be set up, the application simply
//! runs without it.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with a daily rolling file writer.
///
/// The returned guard must stay alive for the life of the program so
/// buffered log lines are flushed on exit. The REEL_LOG environment
/// variable controls the filter; the default level is `info`.
pub fn init() -> Option<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?
    .join("reel")
    .join("logs");

  std::fs::create_dir_all(&log_dir).ok()?;

  let appender = tracing_appender::rolling::daily(log_dir, "reel.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("REEL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .ok()?;

  Some(guard)
}
