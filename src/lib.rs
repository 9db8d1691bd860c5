pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod mutation;
pub mod persist;
pub mod render;
pub mod resolve;
pub mod session;
pub mod store;
