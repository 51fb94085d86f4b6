pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod library;
pub mod session;

pub use app::AppState;
pub use config::{Config, ConfigError};
pub use error::ClientError;
pub use library::VideoLibrary;
pub use session::SessionManager;
