use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Initializes the logging system with a console appender. Safe to call more
/// than once; only the first call installs the logger.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)
}

pub fn init_with_level(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = Ok(());
    INIT.get_or_init(|| {
        result = try_install(level);
    });
    result
}

fn try_install(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder().build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}
