use {
    chrono::Local,
    logfan::{ConsoleSink, Handler, Level, Logger, RotatingFileSink},
};

const LOG_PATH: &str = "./logs/app.log";

/// A cheap deterministic stand-in for random filler text.
fn filler_line(seed: usize, length: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..length)
        .map(|i| ALPHABET[(seed * 31 + i * 17) % ALPHABET.len()] as char)
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let file = RotatingFileSink::builder(LOG_PATH)
        .max_bytes(10_000) // small on purpose so the demo rolls over a few times
        .backup_count(3)
        .encoding("utf-8")
        .build()?;

    let logger = Logger::builder("rotating_file")
        .level(Level::Debug)
        .handler(Handler::new("console", ConsoleSink::stdout()).level(Level::Info))
        .handler(Handler::new("file", file).level(Level::Debug))
        .build();

    logger
        .event(Level::Info, "Starting demo run at {}")
        .arg(Local::now().to_rfc3339())
        .emit();

    for i in 0..2000 {
        logger
            .event(Level::Debug, "{} | {}")
            .arg(format!("{i:04}"))
            .arg(filler_line(i, 60))
            .emit();
        if i % 250 == 0 {
            logger.event(Level::Warning, "Reached {} lines").arg(i).emit();
        }
    }

    logger
        .event(Level::Info, "Demo run complete; check {} and rotated backups")
        .arg(LOG_PATH)
        .emit();
    logger.close();
    Ok(())
}
