pub mod config;
pub mod error;
pub mod geometry;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod services;

pub use error::{AppError, AppResult};
pub use normalize::IncidentResponse;
