pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod state;
