use logfan::{ConsoleSink, Handler, Level, Logger};

fn main() {
    let logger = Logger::builder("test_logger")
        .level(Level::Debug)
        .handler(Handler::new("stdout", ConsoleSink::stdout()).level(Level::Debug))
        .build();

    logger.debug("This is DEBUG - useful while developing");
    logger.info("This is INFO - standard operational messages");
    logger.warning("This is WARNING - something unexpected happened");
    logger.error("This is ERROR - the operation failed but the program is still running");
    logger.critical("This is CRITICAL - the program might not be able to continue");
}
