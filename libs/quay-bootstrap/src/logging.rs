//! Logging initialization: a console layer plus a rotating file sink.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

const MAX_LOG_SIZE_BYTES: usize = 100 * 1024 * 1024;
const MAX_LOG_BACKUPS: usize = 3;

fn parse_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

#[derive(Clone)]
struct RotWriterHandle(Arc<Mutex<FileRotate<AppendCount>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut w) => w.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut w) => w.flush(),
            Err(_) => Ok(()),
        }
    }
}

fn rotating_writer(log_path: &Path) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rot = FileRotate::new(
        log_path,
        AppendCount::new(MAX_LOG_BACKUPS),
        ContentLimit::Bytes(MAX_LOG_SIZE_BYTES),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

/// Initialize the global tracing subscriber: console output at
/// `console_level` plus a rotating file sink at `log_path` (debug level).
///
/// Idempotent: a second call (e.g. from tests) is a no-op.
pub fn init_logging(log_path: &Path, console_level: &str) -> std::io::Result<()> {
    let console_layer = parse_level(console_level).map(|level| {
        fmt::layer()
            .with_target(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level))
    });

    let file_layer = rotating_writer(log_path)?;
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(file_layer)
        .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
