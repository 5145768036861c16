//! # logfan
//!
//! logfan delivers leveled log records to several independent sinks at once:
//! standard output (plain text or one-line JSON) and **size-rotated log
//! files**. The rotating file sink keeps the active file under a byte limit
//! and shifts rotated generations down a numbered chain (`app.log.1` is always
//! the most recent backup), discarding the oldest once the configured number
//! of backups is reached.
//!
//! Every handler attached to a [`Logger`] carries its own severity threshold
//! and formatter, so a record may land in the file without reaching the
//! console. A failing handler never stops delivery to the others and never
//! aborts the caller: failures are counted and reported through an error hook.
//!
//! ## Example
//!
//! ```rust
//! use logfan::{ConsoleSink, Handler, JsonFormat, Level, Logger, RotatingFileSink};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = std::env::temp_dir().join("logfan-doc");
//!     let file = RotatingFileSink::builder(dir.join("app.log"))
//!         .max_bytes(1_000_000)
//!         .backup_count(3)
//!         .build()?;
//!
//!     let logger = Logger::builder("app")
//!         .level(Level::Debug)
//!         .handler(Handler::new("console", ConsoleSink::stdout()).level(Level::Info).formatter(JsonFormat::default()))
//!         .handler(Handler::new("file", file))
//!         .build();
//!
//!     logger.debug("only in the file");
//!     logger.event(Level::Error, "{} squared is {}").arg(13).arg(169).extra("iter", 13).emit();
//!     logger.close();
//!     Ok(())
//! }
//! ```
use {
    chrono::{DateTime, FixedOffset, Local, Utc},
    flate2::write::GzEncoder,
    regex::Regex,
    serde::Deserialize,
    std::{
        ffi::OsString,
        fs::{self, Permissions},
        io::{self, Write as _},
        path::{Path, PathBuf},
        str::FromStr,
        sync::{Mutex, PoisonError},
    },
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

mod config;
mod format;
mod level;
mod logger;
mod record;
mod sink;

pub use {
    config::{FormatKind, LoggingConfig, SinkConfig, SinkKind},
    format::{Formatter, JsonFormat, TextFormat, DEFAULT_DATEFMT, DEFAULT_PATTERN, JSON_DATEFMT},
    level::Level,
    logger::{ErrorHook, EventBuilder, Logger, LoggerBuilder},
    record::{ErrorContext, LogRecord},
    sink::{ConsoleSink, Handler, Sink},
};

/// Specifies the compression algorithm to use for rotated log files.
///
/// When the active file is rotated into generation `1`, it is compressed
/// right away and given the algorithm's extension (`app.log.1.gz`). The
/// generation chain then shifts the compressed files exactly like plain ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Gzip compression. Compressed files will have the `.gz` extension.
    Gzip,
    /// XZ compression. Slower, with a better ratio. Compressed files will
    /// have the `.xz` extension.
    XZ,
}

impl Compression {
    /// Get the extension for the compressed log file.
    fn get_extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "gz",
            Compression::XZ => "xz",
        }
    }
}

/// Specifies the time zone used when rendering record timestamps.
///
/// # Examples
/// ```
/// use logfan::TimeZone;
/// use chrono::FixedOffset;
///
/// let utc = TimeZone::UTC;
/// let local = TimeZone::Local;
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// assert_eq!("+08:00".parse::<TimeZone>().unwrap(), china);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local time zone, resolved per timestamp so daylight
    /// saving changes are honored.
    #[default]
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

impl TimeZone {
    /// Convert a UTC instant into this time zone.
    pub fn convert(&self, timestamp: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimeZone::UTC => timestamp.fixed_offset(),
            TimeZone::Local => timestamp.with_timezone(&Local).fixed_offset(),
            TimeZone::Fix(offset) => timestamp.with_timezone(offset),
        }
    }
}

impl FromStr for TimeZone {
    type Err = LogError;

    /// Accepts `utc`, `local`, or a signed `HH:MM` / `HHMM` offset.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" | "z" => return Ok(TimeZone::UTC),
            "local" => return Ok(TimeZone::Local),
            _ => {}
        }
        let pattern = Regex::new(r"^([+-])(\d{2}):?(\d{2})$").map_err(|err| LogError::InvalidConfig(err.to_string()))?;
        let caps = pattern
            .captures(s.trim())
            .ok_or_else(|| LogError::InvalidConfig(format!("unrecognized time zone '{s}'")))?;
        let hours: i32 = caps[2].parse().map_err(|_| LogError::InvalidConfig(format!("bad hours in '{s}'")))?;
        let minutes: i32 = caps[3].parse().map_err(|_| LogError::InvalidConfig(format!("bad minutes in '{s}'")))?;
        let seconds = (hours * 3600 + minutes * 60) * if &caps[1] == "-" { -1 } else { 1 };
        FixedOffset::east_opt(seconds)
            .map(TimeZone::Fix)
            .ok_or_else(|| LogError::InvalidConfig(format!("time zone offset out of range '{s}'")))
    }
}

/// Settings of a rotating file sink. Immutable once the sink is built.
#[derive(Debug, Clone)]
struct RotationMeta {
    /// Path of the active log file. Backups live next to it as `path.N`.
    path: PathBuf,
    /// Rollover threshold in bytes. `0` disables rotation.
    max_bytes: u64,
    /// Number of backup generations to keep. `0` truncates in place.
    backup_count: usize,
    /// The compression type for rotated generations.
    compression: Option<Compression>,
    /// The file permissions to set on newly created log files (Unix-like
    /// systems only), in octal notation (e.g., 0o644 for rw-r--r--).
    file_mode: Option<u32>,
}

/// Mutable state of a rotating file sink, only touched under its mutex.
struct RotationState {
    /// Handle of the active file. `None` until first write, and again after
    /// a failure so the next write reopens it.
    writer: Option<fs::File>,
    /// The current file size in bytes.
    curr_file_size_bytes: u64,
}

/// A sink that appends records to a size-bounded file, rolling it over into
/// numbered backups (`path.1` newest, `path.N` oldest) when the next record
/// would push it past `max_bytes`.
///
/// The size check, the rollover and the append run under one lock, so a
/// sink can be shared between threads (for instance behind an `Arc`).
///
/// # Examples
/// ```
/// use logfan::RotatingFileSink;
///
/// let dir = std::env::temp_dir().join("logfan-rotating-doc");
/// let sink = RotatingFileSink::new(dir.join("app.log"), 100, 2).unwrap();
/// for i in 0..10 {
///     sink.write_line(&format!("record {i:02} padded to a fixed width..")).unwrap();
/// }
/// assert!(sink.current_size() <= 100);
/// ```
pub struct RotatingFileSink {
    meta: RotationMeta,
    state: Mutex<RotationState>,
}

impl RotatingFileSink {
    /// Start configuring a rotating sink writing to `path`.
    pub fn builder<P: AsRef<Path>>(path: P) -> RotatingFileSinkBuilder {
        RotatingFileSinkBuilder::new(path)
    }

    /// Shorthand for a UTF-8 sink with the given limits.
    pub fn new<P: AsRef<Path>>(path: P, max_bytes: u64, backup_count: usize) -> Result<Self, LogError> {
        RotatingFileSinkBuilder::new(path)
            .max_bytes(max_bytes)
            .backup_count(backup_count)
            .build()
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    /// Rollover threshold in bytes, `0` when rotation is disabled.
    pub fn max_bytes(&self) -> u64 {
        self.meta.max_bytes
    }

    /// Number of backup generations kept.
    pub fn backup_count(&self) -> usize {
        self.meta.backup_count
    }

    /// Path of backup generation `index` (uncompressed name).
    pub fn backup_path(&self, index: usize) -> PathBuf {
        self.meta.generation_path(index, None)
    }

    /// Existing backup generations, ordered from newest (`1`) to oldest.
    pub fn backups(&self) -> Result<Vec<PathBuf>, LogError> {
        Ok(self.meta.list_generations()?.into_iter().map(|(_, path)| path).collect())
    }

    /// Size in bytes of the active file as tracked by the sink.
    pub fn current_size(&self) -> u64 {
        self.lock_state().curr_file_size_bytes
    }

    /// Append `text` followed by a line terminator as one record.
    pub fn write_line(&self, text: &str) -> Result<(), LogError> {
        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');
        self.append(&line)
    }

    /// Flush the active file, if open.
    pub fn flush(&self) -> Result<(), LogError> {
        let mut state = self.lock_state();
        if let Some(writer) = state.writer.as_mut() {
            writer.flush().map_err(|source| LogError::Io {
                path: self.meta.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Flush and release the active file. A later write reopens it.
    pub fn close(&self) -> Result<(), LogError> {
        let mut state = self.lock_state();
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|source| LogError::Io {
                path: self.meta.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RotationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `bytes` as a single unit: check, rollover if needed, write.
    /// Any failure drops the handle so the next call starts from disk again.
    fn append(&self, bytes: &[u8]) -> Result<(), LogError> {
        let mut state = self.lock_state();
        let result = self.append_locked(&mut state, bytes);
        if result.is_err() {
            state.writer = None;
        }
        result
    }

    fn append_locked(&self, state: &mut RotationState, bytes: &[u8]) -> Result<(), LogError> {
        self.meta.ensure_open(state)?;
        if self.meta.should_rollover(state.curr_file_size_bytes, bytes.len() as u64) {
            // Close before renaming.
            state.writer = None;
            self.meta.rollover()?;
            self.meta.ensure_open(state)?;
        }
        let writer = self.meta.ensure_open(state)?;
        writer
            .write_all(bytes)
            .and_then(|()| writer.flush())
            .map_err(|source| LogError::Io {
                path: self.meta.path.clone(),
                source,
            })?;
        state.curr_file_size_bytes += bytes.len() as u64;
        Ok(())
    }
}

impl RotationMeta {
    /// Check if the active file should be rolled over before appending
    /// `incoming` bytes. An empty file is never rolled over, so a single
    /// oversized record is written whole.
    fn should_rollover(&self, curr_file_size_bytes: u64, incoming: u64) -> bool {
        self.max_bytes > 0 && curr_file_size_bytes > 0 && curr_file_size_bytes + incoming > self.max_bytes
    }

    /// Open the active file if it is not open yet, re-reading its size from
    /// disk, and hand back the handle.
    fn ensure_open<'a>(&self, state: &'a mut RotationState) -> Result<&'a mut fs::File, LogError> {
        if state.writer.is_none() {
            let file = self.create_log_file(&self.path)?;
            state.curr_file_size_bytes = file.metadata().map_or(0, |m| m.len());
            state.writer = Some(file);
        }
        state.writer.as_mut().ok_or_else(|| LogError::Io {
            path: self.path.clone(),
            source: io::Error::other("log file is not open"),
        })
    }

    /// Create or open the log file in append mode.
    /// If the directory does not exist, it is created and the open retried.
    fn create_log_file(&self, log_path: &Path) -> Result<fs::File, LogError> {
        let mut open_options = fs::OpenOptions::new();
        open_options.append(true).create(true);

        let mut create_log_file_res = open_options.open(log_path);
        if create_log_file_res.is_err() {
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| LogError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
                create_log_file_res = open_options.open(log_path);
            }
        }

        let log_file = create_log_file_res.map_err(|source| LogError::Io {
            path: log_path.to_path_buf(),
            source,
        })?;

        self.set_permissions(log_path)?;

        Ok(log_file)
    }

    /// Rotate the files on disk. The caller has already closed the handle.
    fn rollover(&self) -> Result<(), LogError> {
        if self.backup_count == 0 {
            return match fs::OpenOptions::new().write(true).truncate(true).open(&self.path) {
                Ok(_) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(LogError::Io {
                    path: self.path.clone(),
                    source,
                }),
            };
        }

        // 1. Shift existing generations down, oldest first. The occupant of
        // `backup_count` is overwritten, which discards it.
        let extensions = self.generation_extensions();
        for idx in (1..self.backup_count).rev() {
            for extension in &extensions {
                Self::rename_replacing(
                    &self.generation_path(idx, *extension),
                    &self.generation_path(idx + 1, *extension),
                )?;
            }
        }

        // 2. The active file becomes generation 1.
        let first = self.generation_path(1, None);
        Self::rename_replacing(&self.path, &first)?;
        if self.compression.is_some() && first.exists() {
            self.compress(&first)?;
        }
        Ok(())
    }

    /// Rename `from` onto `to`, replacing any occupant. A missing source is
    /// nothing to rename, even if it vanishes between the check and the
    /// rename.
    fn rename_replacing(from: &Path, to: &Path) -> Result<(), LogError> {
        if !from.exists() {
            return Ok(());
        }
        match fs::remove_file(to) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(LogError::Io {
                    path: to.to_path_buf(),
                    source,
                })
            }
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LogError::Rename {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            }),
        }
    }

    /// The name variants a generation may carry on disk.
    fn generation_extensions(&self) -> Vec<Option<&'static str>> {
        let mut extensions = vec![None];
        if let Some(compression) = &self.compression {
            extensions.push(Some(compression.get_extension()));
        }
        extensions
    }

    /// `path.index`, or `path.index.ext` for a compressed generation.
    fn generation_path(&self, index: usize, extension: Option<&str>) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        if let Some(extension) = extension {
            name.push(format!(".{extension}"));
        }
        PathBuf::from(name)
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// List the backup generations found next to the active file, sorted by
    /// index. Both plain and compressed names are recognized.
    fn list_generations(&self) -> Result<Vec<(usize, PathBuf)>, LogError> {
        let directory = self.directory();
        if !directory.is_dir() {
            return Ok(Vec::new());
        }
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_pattern = Regex::new(&format!(r"^{}\.(\d+)(\.(gz|xz))?$", regex::escape(&filename)))
            .map_err(|err| LogError::InvalidConfig(err.to_string()))?;

        let files = fs::read_dir(&directory).map_err(|source| LogError::Io {
            path: directory.clone(),
            source,
        })?;

        let mut generations = Vec::new();
        for file in files.flatten() {
            if !file.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Some(file_name) = file.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Some(index) = file_pattern
                .captures(&file_name)
                .and_then(|caps| caps[1].parse::<usize>().ok())
            {
                generations.push((index, file.path()));
            }
        }
        generations.sort();
        Ok(generations)
    }

    /// Remove generations beyond `backup_count`, left behind by an earlier
    /// configuration.
    fn prune_generations(&self) -> Result<(), LogError> {
        for (index, path) in self.list_generations()? {
            if index > self.backup_count {
                if let Err(err) = fs::remove_file(&path) {
                    eprintln!("Failed to remove old log file '{}': {}", path.display(), err);
                }
            }
        }
        Ok(())
    }

    /// Compress a rotated generation in place of the plain file.
    fn compress(&self, log_path: &Path) -> Result<(), LogError> {
        let compression = match &self.compression {
            Some(compression) => compression,
            None => return Ok(()),
        };
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| LogError::Io { path, source }
        };
        let infile = fs::File::open(log_path).map_err(io_err(log_path))?;
        let mut reader = io::BufReader::new(infile);

        let mut compressed_name: OsString = log_path.as_os_str().to_owned();
        compressed_name.push(format!(".{}", compression.get_extension()));
        let compressed_path = PathBuf::from(compressed_name);
        let outfile = fs::File::create(&compressed_path).map_err(io_err(&compressed_path))?;
        let mut writer = io::BufWriter::new(outfile);

        match compression {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
                io::copy(&mut reader, &mut encoder).map_err(io_err(&compressed_path))?;
                encoder
                    .finish()
                    .and_then(|mut inner| inner.flush())
                    .map_err(io_err(&compressed_path))?;
            }
            Compression::XZ => {
                lzma_rs::xz_compress(&mut reader, &mut writer).map_err(io_err(&compressed_path))?;
                writer.flush().map_err(io_err(&compressed_path))?;
            }
        }
        // Ensures compressed file has correct permissions.
        self.set_permissions(&compressed_path)?;

        fs::remove_file(log_path).map_err(io_err(log_path))?;
        Ok(())
    }

    /// Set the permissions for a file based on the configured file mode.
    ///
    /// On non-Unix systems the mode is ignored with a warning, as the Unix
    /// permission model doesn't apply.
    fn set_permissions(&self, path: &Path) -> Result<(), LogError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                let perms = Permissions::from_mode(mode);
                fs::set_permissions(path, perms).map_err(|source| LogError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            #[cfg(not(unix))]
            {
                let _ = (mode, path);
                eprintln!("Warning: Setting file permissions is not supported on non-Unix platforms");
            }
        }
        Ok(())
    }
}

/// Classification of a [`LogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected at setup time.
    Config,
    /// A filesystem or stream operation failed while writing.
    Io,
    /// A record could not be rendered.
    Format,
}

/// Errors that can occur while configuring or writing logs.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to parse logging configuration: {0}")]
    ConfigParse(#[from] serde_yaml_ng::Error),
    #[error("Failed to read logging configuration '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("I/O failure on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to rename file from '{from}' to '{to}': {source}")]
    Rename { from: PathBuf, to: PathBuf, source: io::Error },
    #[error("Failed to write to console: {0}")]
    Console(#[source] io::Error),
    #[error("Failed to format record: {0}")]
    Format(String),
    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

impl LogError {
    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LogError::InvalidConfig(_) | LogError::ConfigParse(_) | LogError::ConfigRead { .. } => ErrorKind::Config,
            LogError::Io { .. } | LogError::Rename { .. } | LogError::Console(_) => ErrorKind::Io,
            LogError::Format(_) | LogError::Json(_) => ErrorKind::Format,
        }
    }

    /// The path an I/O failure is about, if any. For a failed rename this is
    /// the source path.
    pub fn path(&self) -> Option<&Path> {
        match self {
            LogError::Io { path, .. } | LogError::ConfigRead { path, .. } => Some(path),
            LogError::Rename { from, .. } => Some(from),
            _ => None,
        }
    }
}

/// Provides a fluent interface for configuring [`RotatingFileSink`]s.
///
/// # Default Configuration
///
/// * No rotation (`max_bytes` is 0, the file grows unbounded)
/// * No backups
/// * UTF-8 encoding
/// * No compression
/// * Standard file permissions
///
/// # Examples
///
/// ```rust
/// use logfan::{Compression, RotatingFileSink};
///
/// let dir = std::env::temp_dir().join("logfan-builder-doc");
/// let sink = RotatingFileSink::builder(dir.join("app.log"))
///     .max_bytes(1_000_000)          // Rotate at 1 MB
///     .backup_count(3)               // app.log.1 .. app.log.3
///     .compression(Compression::Gzip) // app.log.1.gz ..
///     .build()
///     .unwrap();
/// assert_eq!(sink.backup_count(), 3);
/// ```
pub struct RotatingFileSinkBuilder {
    meta: RotationMeta,
    encoding: String,
}

impl RotatingFileSinkBuilder {
    /// Create a new builder for the log file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        RotatingFileSinkBuilder {
            meta: RotationMeta {
                path: path.as_ref().to_path_buf(),
                max_bytes: 0,
                backup_count: 0,
                compression: None,
                file_mode: None,
            },
            encoding: "utf-8".to_string(),
        }
    }

    /// Set the rollover threshold. `0` disables rotation.
    pub fn max_bytes(self, max_bytes: u64) -> Self {
        Self {
            meta: RotationMeta { max_bytes, ..self.meta },
            ..self
        }
    }

    /// Set the number of backup generations to keep.
    pub fn backup_count(self, backup_count: usize) -> Self {
        Self {
            meta: RotationMeta { backup_count, ..self.meta },
            ..self
        }
    }

    /// Set the text encoding. Only UTF-8 is supported.
    pub fn encoding<S: Into<String>>(self, encoding: S) -> Self {
        Self {
            encoding: encoding.into(),
            ..self
        }
    }

    /// Compress rotated generations.
    pub fn compression(self, compression: Compression) -> Self {
        Self {
            meta: RotationMeta {
                compression: Some(compression),
                ..self.meta
            },
            ..self
        }
    }

    /// Set the file permissions for log files (Unix-like systems only).
    /// For example, 0o644 for rw-r--r-- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: RotationMeta {
                file_mode: Some(mode),
                ..self.meta
            },
            ..self
        }
    }

    /// Validate the settings and build the sink. The file itself is opened
    /// lazily on the first write.
    pub fn build(self) -> Result<RotatingFileSink, LogError> {
        if self.meta.path.as_os_str().is_empty() || self.meta.path.file_name().is_none() {
            return Err(LogError::InvalidConfig(format!(
                "log file path '{}' does not name a file",
                self.meta.path.display()
            )));
        }
        if self.meta.path.is_dir() {
            return Err(LogError::InvalidConfig(format!(
                "log file path '{}' is a directory",
                self.meta.path.display()
            )));
        }
        let encoding = self.encoding.to_ascii_lowercase();
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(LogError::InvalidConfig(format!(
                "unsupported encoding '{}', only utf-8 is supported",
                self.encoding
            )));
        }

        self.meta.prune_generations()?;
        let curr_file_size_bytes = fs::metadata(&self.meta.path).map_or(0, |m| m.len());
        Ok(RotatingFileSink {
            meta: self.meta,
            state: Mutex::new(RotationState {
                writer: None,
                curr_file_size_bytes,
            }),
        })
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, _record: &LogRecord, formatted: &str) -> Result<(), LogError> {
        self.write_line(formatted)
    }

    fn flush(&self) -> Result<(), LogError> {
        RotatingFileSink::flush(self)
    }

    fn close(&self) -> Result<(), LogError> {
        RotatingFileSink::close(self)
    }
}

/// Each `write` call is one rollover unit, which lets the sink back a
/// `tracing_appender::non_blocking` writer.
impl io::Write for RotatingFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingFileSink::flush(self).map_err(io::Error::other)
    }
}
