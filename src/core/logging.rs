//! Process-wide logging, owned by the entry point.
//!
//! [`LoggingContext::init`] installs the subscriber once; afterwards
//! [`LoggingContext::configure`] switches verbosity and the production log
//! file without reinstalling anything.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use super::config::Environment;
use super::error::AppError;

pub const DEFAULT_LOG_FILE: &str = "app.log";

const INITIAL_FILTER: &str = "info";

pub struct LoggingContext {
    filter: reload::Handle<EnvFilter, Registry>,
    file: FileSink,
    log_path: PathBuf,
}

impl LoggingContext {
    /// Installs the global subscriber writing to stderr.
    pub fn init() -> Result<Self, AppError> {
        let (ctx, subscriber) = Self::build(io::stderr, DEFAULT_LOG_FILE);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;
        Ok(ctx)
    }

    /// Builds a context and its subscriber without installing it.
    pub fn build<W>(
        console: W,
        log_path: impl AsRef<Path>,
    ) -> (Self, impl Subscriber + Send + Sync + 'static)
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let (filter_layer, filter) = reload::Layer::new(EnvFilter::new(INITIAL_FILTER));
        let file = FileSink::default();

        let subscriber = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_writer(console))
            .with(fmt::layer().with_ansi(false).with_writer(file.clone()));

        let ctx = Self {
            filter,
            file,
            log_path: log_path.as_ref().to_path_buf(),
        };
        (ctx, subscriber)
    }

    /// Applies `level` (any `EnvFilter` directive) and the file sink policy
    /// for `environment`. Only production writes to the log file.
    pub fn configure(&self, level: &str, environment: Environment) -> Result<(), AppError> {
        let filter = EnvFilter::try_new(level)
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?;
        self.filter
            .reload(filter)
            .map_err(|e| AppError::Logger(format!("failed to reload filter: {e}")))?;

        let file = if environment == Environment::Production {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
                .map_err(|e| {
                    AppError::Logger(format!(
                        "failed to open log file '{}': {e}",
                        self.log_path.display()
                    ))
                })?;
            Some(f)
        } else {
            None
        };
        self.file.replace(file);

        tracing::debug!(level, environment = %environment, "logging configured");
        Ok(())
    }

    #[cfg(test)]
    fn current_filter(&self) -> Option<String> {
        self.filter.with_current(|f| f.to_string()).ok()
    }

    #[cfg(test)]
    fn writes_to_file(&self) -> bool {
        self.file.is_open()
    }
}

/// Writer that drops output until a file is attached.
#[derive(Clone, Default)]
struct FileSink(Arc<Mutex<Option<File>>>);

impl FileSink {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, file: Option<File>) {
        *self.lock() = file;
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.lock().is_some()
    }
}

struct FileSinkWriter<'a>(MutexGuard<'a, Option<File>>);

impl io::Write for FileSinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(f) => f.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for FileSink {
    type Writer = FileSinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        FileSinkWriter(self.lock())
    }
}
