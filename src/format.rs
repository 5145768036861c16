//! Turning a [`LogRecord`] into one line of text.

use {
    crate::{LogError, LogRecord, TimeZone},
    chrono::format::{Item, StrftimeItems},
    serde_json::{Map, Value},
    std::fmt::Write as _,
};

/// Default plain-text layout.
pub const DEFAULT_PATTERN: &str = "{timestamp} | {name} | {level} | {message}";
/// Default timestamp layout for plain text.
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S";
/// Default timestamp layout for JSON.
pub const JSON_DATEFMT: &str = "%Y-%m-%dT%H:%M:%S%z";

fn check_datefmt(datefmt: &str) -> Result<(), LogError> {
    if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
        return Err(LogError::InvalidConfig(format!("invalid date format '{datefmt}'")));
    }
    Ok(())
}

fn render_timestamp(record: &LogRecord, time_zone: &TimeZone, datefmt: &str) -> Result<String, LogError> {
    let mut out = String::new();
    write!(out, "{}", time_zone.convert(record.timestamp()).format(datefmt))
        .map_err(|_| LogError::Format(format!("cannot render timestamp with '{datefmt}'")))?;
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Timestamp,
    Name,
    Level,
    Message,
}

/// Split a layout into literal text and `{token}` fields.
fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, LogError> {
    let mut segments = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            return Err(LogError::InvalidConfig(format!("unclosed '{{' in pattern '{pattern}'")));
        };
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        segments.push(match &rest[start + 1..start + len] {
            "timestamp" => Segment::Timestamp,
            "name" => Segment::Name,
            "level" => Segment::Level,
            "message" => Segment::Message,
            other => {
                return Err(LogError::InvalidConfig(format!(
                    "unknown token '{{{other}}}' in pattern '{pattern}'"
                )))
            }
        });
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// Plain-text layout built from `{timestamp}`, `{name}`, `{level}` and
/// `{message}` tokens. Error context, when present, follows on the next
/// lines.
#[derive(Debug, Clone)]
pub struct TextFormat {
    pattern: String,
    segments: Vec<Segment>,
    datefmt: String,
    time_zone: TimeZone,
}

impl Default for TextFormat {
    fn default() -> Self {
        let separator = || Segment::Literal(" | ".to_string());
        TextFormat {
            pattern: DEFAULT_PATTERN.to_string(),
            segments: vec![
                Segment::Timestamp,
                separator(),
                Segment::Name,
                separator(),
                Segment::Level,
                separator(),
                Segment::Message,
            ],
            datefmt: DEFAULT_DATEFMT.to_string(),
            time_zone: TimeZone::default(),
        }
    }
}

impl TextFormat {
    /// Use `pattern` as the line layout. Unknown tokens are rejected.
    pub fn with_pattern(self, pattern: impl Into<String>) -> Result<Self, LogError> {
        let pattern = pattern.into();
        let segments = parse_pattern(&pattern)?;
        Ok(Self {
            pattern,
            segments,
            ..self
        })
    }

    /// Use `datefmt` (strftime syntax) for `{timestamp}`.
    pub fn with_datefmt(self, datefmt: impl Into<String>) -> Result<Self, LogError> {
        let datefmt = datefmt.into();
        check_datefmt(&datefmt)?;
        Ok(Self { datefmt, ..self })
    }

    pub fn with_time_zone(self, time_zone: TimeZone) -> Self {
        Self { time_zone, ..self }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, record: &LogRecord) -> Result<String, LogError> {
        let mut out = String::with_capacity(self.pattern.len() + record.template().len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Timestamp => out.push_str(&render_timestamp(record, &self.time_zone, &self.datefmt)?),
                Segment::Name => out.push_str(record.name()),
                Segment::Level => out.push_str(record.level().as_str()),
                Segment::Message => out.push_str(&record.message()?),
            }
        }

        if let Some(error) = record.error() {
            out.push('\n');
            out.push_str(&error.to_string());
        }
        Ok(out)
    }
}

/// One-line JSON layout with the keys `timestamp`, `level`, `name` and
/// `message`, followed by the record's extra fields and `exc_info`.
#[derive(Debug, Clone)]
pub struct JsonFormat {
    datefmt: String,
    time_zone: TimeZone,
}

impl Default for JsonFormat {
    fn default() -> Self {
        JsonFormat {
            datefmt: JSON_DATEFMT.to_string(),
            time_zone: TimeZone::default(),
        }
    }
}

impl JsonFormat {
    pub fn with_datefmt(self, datefmt: impl Into<String>) -> Result<Self, LogError> {
        let datefmt = datefmt.into();
        check_datefmt(&datefmt)?;
        Ok(Self { datefmt, ..self })
    }

    pub fn with_time_zone(self, time_zone: TimeZone) -> Self {
        Self { time_zone, ..self }
    }

    pub fn format(&self, record: &LogRecord) -> Result<String, LogError> {
        let mut object = Map::new();
        object.insert(
            "timestamp".to_string(),
            Value::String(render_timestamp(record, &self.time_zone, &self.datefmt)?),
        );
        object.insert("level".to_string(), Value::String(record.level().as_str().to_string()));
        object.insert("name".to_string(), Value::String(record.name().to_string()));
        object.insert("message".to_string(), Value::String(record.message()?));
        for (key, value) in record.extra() {
            if !object.contains_key(key) {
                object.insert(key.clone(), value.clone());
            }
        }
        if let Some(error) = record.error() {
            object
                .entry("exc_info")
                .or_insert_with(|| Value::String(error.to_string()));
        }
        Ok(serde_json::to_string(&Value::Object(object))?)
    }
}

/// The layout a handler applies before handing text to its sink.
#[derive(Debug, Clone)]
pub enum Formatter {
    Text(TextFormat),
    Json(JsonFormat),
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::Text(TextFormat::default())
    }
}

impl Formatter {
    pub fn format(&self, record: &LogRecord) -> Result<String, LogError> {
        match self {
            Formatter::Text(text) => text.format(record),
            Formatter::Json(json) => json.format(record),
        }
    }
}

impl From<TextFormat> for Formatter {
    fn from(format: TextFormat) -> Self {
        Formatter::Text(format)
    }
}

impl From<JsonFormat> for Formatter {
    fn from(format: JsonFormat) -> Self {
        Formatter::Json(format)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{ErrorKind, Level},
        chrono::{TimeZone as _, Utc},
        std::io,
    };

    fn record() -> LogRecord {
        LogRecord::new(Level::Warning, "demo", "reached {} lines")
            .with_arg(250)
            .with_timestamp(Utc.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap())
    }

    #[test]
    fn text_uses_the_default_layout() {
        let line = TextFormat::default()
            .with_time_zone(TimeZone::UTC)
            .format(&record())
            .unwrap();
        assert_eq!(line, "2025-07-04 12:00:00 | demo | WARNING | reached 250 lines");
    }

    #[test]
    fn text_custom_pattern_and_zone() {
        let format = TextFormat::default()
            .with_pattern("[{level}] {message} ({name})")
            .unwrap()
            .with_datefmt("%H:%M")
            .unwrap()
            .with_time_zone("+02:00".parse().unwrap());
        assert_eq!(format.format(&record()).unwrap(), "[WARNING] reached 250 lines (demo)");

        let format = TextFormat::default()
            .with_pattern("{timestamp} {message}")
            .unwrap()
            .with_datefmt("%H:%M")
            .unwrap()
            .with_time_zone("+02:00".parse().unwrap());
        assert_eq!(format.format(&record()).unwrap(), "14:00 reached 250 lines");
    }

    #[test]
    fn default_layout_matches_default_pattern() {
        assert_eq!(parse_pattern(DEFAULT_PATTERN).unwrap(), TextFormat::default().segments);
    }

    #[test]
    fn text_rejects_unknown_tokens_and_bad_datefmt() {
        let err = TextFormat::default().with_pattern("{when} {message}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = TextFormat::default().with_pattern("{message").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = TextFormat::default().with_datefmt("%Q").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn text_appends_error_context() {
        let rec = record().with_error(&io::Error::other("disk on fire"));
        let line = TextFormat::default()
            .with_time_zone(TimeZone::UTC)
            .format(&rec)
            .unwrap();
        assert!(line.ends_with("reached 250 lines\ndisk on fire"));
    }

    #[test]
    fn json_has_fixed_keys_then_extras() {
        let rec = record()
            .with_extra("iter", 13)
            .with_extra("level", "spoofed")
            .with_error(&io::Error::other("bad luck"));
        let line = JsonFormat::default()
            .with_time_zone(TimeZone::UTC)
            .format(&rec)
            .unwrap();
        assert_eq!(
            line,
            r#"{"timestamp":"2025-07-04T12:00:00+0000","level":"WARNING","name":"demo","message":"reached 250 lines","iter":13,"exc_info":"bad luck"}"#
        );
    }

    #[test]
    fn format_errors_surface_from_the_message() {
        let rec = LogRecord::new(Level::Info, "demo", "{} {}").with_arg(1);
        let err = Formatter::from(JsonFormat::default()).format(&rec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
