//! Declarative logger setup from a YAML document.
//!
//! ```yaml
//! name: app
//! level: DEBUG
//! timezone: local
//! context: { service: demo }
//! sinks:
//!   - name: console
//!     type: console
//!     level: INFO
//!     format: json
//!   - name: file
//!     type: rotating_file
//!     path: logs/app.log
//!     max_bytes: 1000000
//!     backup_count: 3
//! ```

use {
    crate::{
        Compression, ConsoleSink, Formatter, Handler, JsonFormat, Level, LogError, Logger, RotatingFileSink,
        TextFormat, TimeZone,
    },
    serde::Deserialize,
    serde_json::Value,
    std::{
        collections::{BTreeMap, HashSet},
        fs,
        path::{Path, PathBuf},
        str::FromStr,
    },
};

fn default_encoding() -> String {
    "utf-8".to_string()
}

/// Top-level logging document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logger name stamped on every record.
    pub name: String,
    /// Logger-wide minimum severity.
    #[serde(default)]
    pub level: Level,
    /// `utc`, `local` or a fixed offset such as `+08:00`.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Fields added to every record.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Console,
    RotatingFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Text,
    Json,
}

/// One sink definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SinkKind,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub format: FormatKind,
    /// Text layout, see [`TextFormat::with_pattern`].
    pub pattern: Option<String>,
    pub datefmt: Option<String>,
    pub path: Option<PathBuf>,
    /// Zero or negative disables rotation.
    #[serde(default)]
    pub max_bytes: i64,
    #[serde(default)]
    pub backup_count: i64,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    pub compression: Option<Compression>,
    pub file_mode: Option<u32>,
}

impl FromStr for LoggingConfig {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml_str(s)
    }
}

impl LoggingConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, LogError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| LogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn time_zone(&self) -> Result<TimeZone, LogError> {
        self.timezone
            .as_deref()
            .map_or(Ok(TimeZone::default()), TimeZone::from_str)
    }

    /// Check the document without touching the filesystem.
    pub fn validate(&self) -> Result<(), LogError> {
        if self.name.trim().is_empty() {
            return Err(LogError::InvalidConfig("logger name is empty".to_string()));
        }
        self.time_zone()?;
        let mut names = HashSet::new();
        for sink in &self.sinks {
            if !names.insert(sink.name.as_str()) {
                return Err(LogError::InvalidConfig(format!("duplicate sink name '{}'", sink.name)));
            }
            sink.validate()?;
        }
        Ok(())
    }

    /// Validate, open every sink and assemble the logger.
    pub fn build(&self) -> Result<Logger, LogError> {
        self.validate()?;
        let time_zone = self.time_zone()?;
        let mut builder = Logger::builder(self.name.as_str()).level(self.level);
        for (key, value) in &self.context {
            builder = builder.context(key.as_str(), value.clone());
        }
        for sink in &self.sinks {
            builder = builder.handler(sink.build_handler(&time_zone)?);
        }
        Ok(builder.build())
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<(), LogError> {
        if self.backup_count < 0 {
            return Err(LogError::InvalidConfig(format!(
                "sink '{}': backup_count must not be negative, got {}",
                self.name, self.backup_count
            )));
        }
        if self.kind == SinkKind::RotatingFile && self.path.is_none() {
            return Err(LogError::InvalidConfig(format!("sink '{}': rotating_file needs a path", self.name)));
        }
        self.formatter(&TimeZone::UTC).map(|_| ())
    }

    fn formatter(&self, time_zone: &TimeZone) -> Result<Formatter, LogError> {
        Ok(match self.format {
            FormatKind::Text => {
                let mut text = TextFormat::default().with_time_zone(time_zone.clone());
                if let Some(pattern) = &self.pattern {
                    text = text.with_pattern(pattern.as_str())?;
                }
                if let Some(datefmt) = &self.datefmt {
                    text = text.with_datefmt(datefmt.as_str())?;
                }
                text.into()
            }
            FormatKind::Json => {
                if self.pattern.is_some() {
                    return Err(LogError::InvalidConfig(format!(
                        "sink '{}': pattern only applies to the text format",
                        self.name
                    )));
                }
                let mut json = JsonFormat::default().with_time_zone(time_zone.clone());
                if let Some(datefmt) = &self.datefmt {
                    json = json.with_datefmt(datefmt.as_str())?;
                }
                json.into()
            }
        })
    }

    fn build_handler(&self, time_zone: &TimeZone) -> Result<Handler, LogError> {
        let handler = match self.kind {
            SinkKind::Console => Handler::new(self.name.as_str(), ConsoleSink::stdout()),
            SinkKind::RotatingFile => Handler::new(self.name.as_str(), self.build_rotating()?),
        };
        Ok(handler.level(self.level).formatter(self.formatter(time_zone)?))
    }

    fn build_rotating(&self) -> Result<RotatingFileSink, LogError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| LogError::InvalidConfig(format!("sink '{}': rotating_file needs a path", self.name)))?;
        let backup_count = usize::try_from(self.backup_count).map_err(|_| {
            LogError::InvalidConfig(format!("sink '{}': backup_count must not be negative", self.name))
        })?;
        // Zero or negative keeps the file growing unbounded.
        let max_bytes = u64::try_from(self.max_bytes).unwrap_or(0);

        let mut builder = RotatingFileSink::builder(path)
            .max_bytes(max_bytes)
            .backup_count(backup_count)
            .encoding(self.encoding.as_str());
        if let Some(compression) = &self.compression {
            builder = builder.compression(compression.clone());
        }
        if let Some(mode) = self.file_mode {
            builder = builder.file_mode(mode);
        }
        builder.build()
    }
}
