pub mod error;
pub mod instance;
pub mod logging;
