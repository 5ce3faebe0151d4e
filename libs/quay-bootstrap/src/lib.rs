pub mod config;
pub mod i18n;
pub mod logging;
pub mod paths;
pub mod signals;

pub use config::*;
pub use i18n::I18n;
pub use logging::init_logging;
pub use signals::*;
