// HTTP routes
pub mod benchmark;
pub mod generate;
pub mod health;
pub mod questions;
pub mod results;
