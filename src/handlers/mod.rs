pub mod calamity;
pub mod graph;
pub mod manage;
