pub mod backends;
pub mod config;
pub mod documents;
pub mod health;
pub mod selection;
pub mod transfers;
mod utils;
