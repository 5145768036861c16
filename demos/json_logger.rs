use {
    logfan::{ConsoleSink, Handler, JsonFormat, Level, Logger, RotatingFileSink},
    std::{error::Error, fmt},
};

#[derive(Debug)]
struct BadLuck;

impl fmt::Display for BadLuck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bad luck!")
    }
}

impl Error for BadLuck {}

fn expensive_operation(x: u64) -> Result<u64, BadLuck> {
    if x == 13 {
        return Err(BadLuck);
    }
    Ok(x * x)
}

fn main() -> Result<(), Box<dyn Error>> {
    let file = RotatingFileSink::new("./logs/json_demo.log", 1_000_000, 3)?;
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());

    let logger = Logger::builder("json_logger")
        .level(Level::Debug)
        .context("hostname", hostname)
        .context("pid", std::process::id())
        .handler(
            Handler::new("json", ConsoleSink::stdout())
                .level(Level::Info)
                .formatter(JsonFormat::default()),
        )
        .handler(Handler::new("file", file).level(Level::Debug))
        .build();

    logger
        .event(Level::Info, "Starting JSON logger demo")
        .extra("stage", "startup")
        .emit();

    for i in 0..15 {
        match expensive_operation(i) {
            Ok(result) => logger
                .event(Level::Debug, "{} squared is {}")
                .arg(i)
                .arg(result)
                .extra("iter", i)
                .emit(),
            Err(err) => logger
                .event(Level::Error, "Computation failed")
                .error(&err)
                .extra("iter", i)
                .emit(),
        }
    }

    logger
        .event(Level::Info, "Finished demo run")
        .extra("records", 15)
        .emit();
    logger.close();
    Ok(())
}
