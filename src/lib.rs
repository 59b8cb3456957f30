pub mod config;
pub mod goals;
pub mod schema;
pub mod shared;
