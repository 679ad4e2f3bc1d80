pub mod app;
pub mod config;
pub mod dispatch;
pub mod instruction;
pub mod shared;
pub mod workspace;
