use {
    crate::{Handler, Level, LogError, LogRecord},
    serde_json::Value,
    std::{
        collections::BTreeMap,
        error::Error,
        fmt,
        sync::atomic::{AtomicU64, Ordering},
    },
};

/// Called with the handler name and the error whenever delivery fails.
pub type ErrorHook = Box<dyn Fn(&str, &LogError) + Send + Sync>;

fn report_to_stderr(handler: &str, err: &LogError) {
    eprintln!("--- Logging error ---\nhandler '{handler}': {err}");
}

/// The record source: stamps records with its name and context fields and
/// fans them out to its handlers.
///
/// Emission is fire-and-forget. A handler that fails (bad placeholders,
/// disk full, ...) is skipped for that record; the remaining handlers still
/// receive it, the failure counter goes up and the error hook is told.
pub struct Logger {
    name: String,
    level: Level,
    handlers: Vec<Handler>,
    context: BTreeMap<String, Value>,
    failures: AtomicU64,
    on_error: ErrorHook,
}

impl Logger {
    /// Start building a logger called `name`.
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    /// A logger without handlers; records go nowhere.
    pub fn new(name: impl Into<String>) -> Self {
        LoggerBuilder::new(name).build()
    }

    /// The name stamped on every record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logger-wide threshold.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Handlers in the order they receive records.
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Number of failed deliveries since the logger was built.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Whether a record at `level` would reach at least one handler.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.level && self.handlers.iter().any(|h| h.accepts(level))
    }

    /// Deliver `record` to every handler whose threshold it meets.
    pub fn emit(&self, record: LogRecord) {
        if record.level() < self.level {
            return;
        }
        let record = record.with_defaults(&self.context);
        for handler in &self.handlers {
            if !handler.accepts(record.level()) {
                continue;
            }
            if let Err(err) = handler.handle(&record) {
                self.report(handler.name(), &err);
            }
        }
    }

    /// Start a record with placeholders, extra fields or error context.
    pub fn event(&self, level: Level, message: impl Into<String>) -> EventBuilder<'_> {
        EventBuilder {
            logger: self,
            record: LogRecord::new(level, self.name.as_str(), message),
        }
    }

    /// Log `message` verbatim at `level`.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if level < self.level {
            return;
        }
        self.emit(LogRecord::new(level, self.name.as_str(), message));
    }

    /// Log at [`Level::Debug`].
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message)
    }

    /// Log at [`Level::Info`].
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message)
    }

    /// Log at [`Level::Warning`].
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message)
    }

    /// Log at [`Level::Error`].
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message)
    }

    /// Log at [`Level::Critical`].
    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message)
    }

    /// Flush every sink, reporting failures through the error hook.
    pub fn flush(&self) {
        for handler in &self.handlers {
            if let Err(err) = handler.sink().flush() {
                self.report(handler.name(), &err);
            }
        }
    }

    /// Close every sink. Sinks that reopen lazily stay usable afterwards.
    pub fn close(&self) {
        for handler in &self.handlers {
            if let Err(err) = handler.sink().close() {
                self.report(handler.name(), &err);
            }
        }
    }

    fn report(&self, handler: &str, err: &LogError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        (self.on_error)(handler, err);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("handlers", &self.handlers)
            .field("context", &self.context)
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

/// A record being assembled for [`Logger::emit`].
#[must_use = "the record is only logged once `emit` is called"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    record: LogRecord,
}

impl EventBuilder<'_> {
    /// Value for the next `{}` placeholder.
    pub fn arg(self, arg: impl Into<Value>) -> Self {
        Self {
            record: self.record.with_arg(arg),
            ..self
        }
    }

    /// Structured field carried alongside the message.
    pub fn extra(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            record: self.record.with_extra(key, value),
            ..self
        }
    }

    /// Attach `err` and its source chain.
    pub fn error(self, err: &(dyn Error + 'static)) -> Self {
        Self {
            record: self.record.with_error(err),
            ..self
        }
    }

    /// Hand the finished record to the logger.
    pub fn emit(self) {
        self.logger.emit(self.record)
    }
}

/// Builds a [`Logger`]. Handlers are attached here, once.
pub struct LoggerBuilder {
    name: String,
    level: Level,
    handlers: Vec<Handler>,
    context: BTreeMap<String, Value>,
    on_error: ErrorHook,
}

impl LoggerBuilder {
    /// Logger at [`Level::Debug`] with no handlers, reporting failures to stderr.
    pub fn new(name: impl Into<String>) -> Self {
        LoggerBuilder {
            name: name.into(),
            level: Level::Debug,
            handlers: Vec::new(),
            context: BTreeMap::new(),
            on_error: Box::new(report_to_stderr),
        }
    }

    /// Records below `level` are dropped before any handler sees them.
    pub fn level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    /// Append a handler. Records reach handlers in insertion order.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// A field added to every record that does not set it itself.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Replace the default stderr notice for failed deliveries.
    pub fn on_error<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &LogError) + Send + Sync + 'static,
    {
        Self {
            on_error: Box::new(hook),
            ..self
        }
    }

    /// Finish the logger.
    pub fn build(self) -> Logger {
        Logger {
            name: self.name,
            level: self.level,
            handlers: self.handlers,
            context: self.context,
            failures: AtomicU64::new(0),
            on_error: self.on_error,
        }
    }
}
