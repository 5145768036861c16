use {
    crate::{Formatter, Level, LogError, LogRecord},
    std::{
        fmt,
        io::{self, Write},
        sync::{Arc, Mutex, PoisonError},
    },
};

/// A destination for formatted records.
///
/// Implementations must tolerate being called from several threads; a
/// failure is returned to the caller and must leave the sink usable for the
/// next record.
pub trait Sink: Send + Sync {
    /// Persist or display one record already rendered to `formatted`.
    fn write(&self, record: &LogRecord, formatted: &str) -> Result<(), LogError>;

    fn flush(&self) -> Result<(), LogError> {
        Ok(())
    }

    /// Release resources. The default only flushes.
    fn close(&self) -> Result<(), LogError> {
        self.flush()
    }
}

/// Unbounded passthrough to standard output, or to any writer.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write to `writer` instead of a standard stream.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        ConsoleSink {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl Sink for ConsoleSink {
    fn write(&self, _record: &LogRecord, formatted: &str) -> Result<(), LogError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{formatted}")
            .and_then(|()| writer.flush())
            .map_err(LogError::Console)
    }

    fn flush(&self) -> Result<(), LogError> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(LogError::Console)
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

/// A sink paired with its own threshold and formatter.
pub struct Handler {
    name: String,
    level: Level,
    formatter: Formatter,
    sink: Arc<dyn Sink>,
}

impl Handler {
    /// Handler that accepts every level and uses the default text layout.
    pub fn new<S: Sink + 'static>(name: impl Into<String>, sink: S) -> Self {
        Self::shared(name, Arc::new(sink))
    }

    /// Like [`Handler::new`] for a sink the caller keeps a handle to.
    pub fn shared(name: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        Handler {
            name: name.into(),
            level: Level::Debug,
            formatter: Formatter::default(),
            sink,
        }
    }

    /// Minimum severity this handler accepts.
    pub fn level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    pub fn formatter(self, formatter: impl Into<Formatter>) -> Self {
        Self {
            formatter: formatter.into(),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> Level {
        self.level
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn accepts(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Format `record` and pass it to the sink.
    pub fn handle(&self, record: &LogRecord) -> Result<(), LogError> {
        let formatted = self.formatter.format(record)?;
        self.sink.write(record, &formatted)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}
