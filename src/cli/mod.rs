mod app;
mod main;
mod shell;

pub use app::*;
pub use main::*;
pub use shell::*;
