pub mod cli;
pub mod inspect;
pub mod logging;
pub mod replay;
pub mod settings;
