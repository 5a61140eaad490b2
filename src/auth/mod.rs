//! # 认证模块
//!
//! 令牌生命周期：
//! - refresh flow：外部提供的 access/refresh token 对，首次使用时立即刷新
//! - code flow：登录 → CSRF cookie → 授权码 → 令牌交换
//! - `AuthenticatedTransport`：给每个请求附加 Bearer 令牌，过期时在锁内刷新

pub mod code_flow;
pub mod strategy;
pub mod token;
pub mod transport;

pub use code_flow::{CodeFlowCredentials, acquire_token};
pub use strategy::CredentialStrategy;
pub use token::{Token, TokenResponse};
pub use transport::{AuthenticatedTransport, HttpTransport, TokenRefresher};

/// 所有出站请求使用的 User-Agent
pub const USER_AGENT: &str = concat!("baton-aruba-central/", env!("CARGO_PKG_VERSION"));
