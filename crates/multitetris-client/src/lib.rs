pub mod config;
pub mod error;
pub mod identity;
pub mod input;
pub mod net;
pub mod runner;
pub mod session;
