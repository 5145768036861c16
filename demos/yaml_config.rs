use {logfan::LoggingConfig, std::path::Path};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the document relative to this demo, not the working directory.
    let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/logging_config.yaml");
    let logger = LoggingConfig::from_path(&config_path)?.build()?;

    logger
        .event(logfan::Level::Info, "YAML logging active via {}")
        .arg(config_path.display().to_string())
        .emit();
    logger.debug("debug details go to the file only");
    logger.close();
    Ok(())
}
