pub mod config;
pub mod session;
pub mod types;

pub use config::NectarConfig;
pub use session::{Connector, Session, SessionError};
pub use types::*;
