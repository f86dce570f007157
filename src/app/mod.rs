pub mod commands;
pub mod session;

pub use session::Session;
