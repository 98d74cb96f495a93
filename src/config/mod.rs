pub mod database;
pub mod rate_limit;
pub mod server;

pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;
