use std::{panic::PanicHookInfo, sync::Once};

use tracing::Level;

/// Install the global subscriber. Later calls are no-ops.
pub fn setup_logging(level: Level) {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(level)
            .init();

        std::panic::set_hook(Box::new(panic_hook));
    })
}

fn panic_hook(info: &PanicHookInfo) {
    tracing::error!("{info}")
}

pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
