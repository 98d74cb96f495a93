pub mod incident;
pub mod stats;
pub mod submission;
pub mod upload;
