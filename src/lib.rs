//! # Aruba Central 身份治理连接器
//!
//! 同步 Aruba Central 的用户、角色、分组，输出资源、权益与授权

pub mod auth;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use connector::{Connector, SyncSnapshot};
pub use error::{ConnectorError, Result};
