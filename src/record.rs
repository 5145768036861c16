use {
    crate::{Level, LogError},
    chrono::{DateTime, Utc},
    serde_json::Value,
    std::{collections::BTreeMap, error::Error, fmt},
};

/// Display text of an error followed by its `source()` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    chain: Vec<String>,
}

impl ErrorContext {
    /// Capture `err` and every error in its source chain.
    pub fn capture(err: &(dyn Error + 'static)) -> Self {
        let mut chain = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        ErrorContext { chain }
    }

    /// The error itself, outermost first, then its causes.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chain = self.chain.iter();
        if let Some(first) = chain.next() {
            f.write_str(first)?;
        }
        for cause in chain {
            write!(f, "\nCaused by: {cause}")?;
        }
        Ok(())
    }
}

/// A single log event.
///
/// Built once with the consuming `with_*` methods, then only read. The
/// message is a template: each `{}` takes the next positional argument and
/// `{{` / `}}` are literal braces. A record without arguments keeps its
/// message verbatim.
#[derive(Debug, Clone)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    level: Level,
    name: String,
    template: String,
    args: Vec<Value>,
    extra: BTreeMap<String, Value>,
    error: Option<ErrorContext>,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn new(level: Level, name: impl Into<String>, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            name: name.into(),
            template: message.into(),
            args: Vec::new(),
            extra: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..self }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Attach a structured field. A later value for the same key wins.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_error(self, err: &(dyn Error + 'static)) -> Self {
        Self {
            error: Some(ErrorContext::capture(err)),
            ..self
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Name of the logger that produced the record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unrendered message template.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn error(&self) -> Option<&ErrorContext> {
        self.error.as_ref()
    }

    /// Fill in fields the record does not set itself.
    pub(crate) fn with_defaults(mut self, defaults: &BTreeMap<String, Value>) -> Self {
        for (key, value) in defaults {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    /// Render the message, resolving placeholders against the arguments.
    pub fn message(&self) -> Result<String, LogError> {
        if self.args.is_empty() {
            return Ok(self.template.clone());
        }

        let mut out = String::with_capacity(self.template.len());
        let mut args = self.args.iter();
        let mut chars = self.template.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => match chars.next() {
                    Some('{') => out.push('{'),
                    Some('}') => {
                        let arg = args.next().ok_or_else(|| {
                            LogError::Format(format!("not enough arguments for message '{}'", self.template))
                        })?;
                        push_value(&mut out, arg);
                    }
                    _ => return Err(LogError::Format(format!("unmatched '{{' in message '{}'", self.template))),
                },
                '}' => match chars.next() {
                    Some('}') => out.push('}'),
                    _ => return Err(LogError::Format(format!("unmatched '}}' in message '{}'", self.template))),
                },
                c => out.push(c),
            }
        }
        if args.next().is_some() {
            return Err(LogError::Format(format!(
                "not all arguments converted for message '{}'",
                self.template
            )));
        }
        Ok(out)
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::ErrorKind, std::io};

    fn record(template: &str) -> LogRecord {
        LogRecord::new(Level::Info, "test", template)
    }

    #[test]
    fn resolves_positional_placeholders() {
        let rec = record("{} squared is {}").with_arg(4).with_arg(16);
        assert_eq!(rec.message().unwrap(), "4 squared is 16");

        let rec = record("user {} said {}").with_arg("ana").with_arg(serde_json::json!({"ok": true}));
        assert_eq!(rec.message().unwrap(), r#"user ana said {"ok":true}"#);
    }

    #[test]
    fn escaped_braces_are_literal() {
        let rec = record("{{{}}}").with_arg("x");
        assert_eq!(rec.message().unwrap(), "{x}");
    }

    #[test]
    fn message_without_arguments_is_verbatim() {
        assert_eq!(record("{not a placeholder}").message().unwrap(), "{not a placeholder}");
    }

    #[test]
    fn argument_count_mismatch_is_a_format_error() {
        let err = record("{} and {}").with_arg(1).message().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);

        let err = record("just {}").with_arg(1).with_arg(2).message().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);

        let err = record("open { brace").with_arg(1).message().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("computation failed")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_context_keeps_source_chain() {
        let err = Wrapped(io::Error::other("bad luck"));
        let rec = record("failed").with_error(&err);
        let context = rec.error().unwrap();
        assert_eq!(context.chain(), ["computation failed", "bad luck"]);
        assert_eq!(context.to_string(), "computation failed\nCaused by: bad luck");
    }

    #[test]
    fn defaults_do_not_override_record_fields() {
        let defaults = BTreeMap::from([
            ("pid".to_string(), Value::from(42)),
            ("stage".to_string(), Value::from("default")),
        ]);
        let rec = record("x").with_extra("stage", "startup").with_defaults(&defaults);
        assert_eq!(rec.extra()["stage"], "startup");
        assert_eq!(rec.extra()["pid"], 42);
    }
}
