// Event admin library
// Lifecycle and countdown core shared by the console binary and the tests

pub mod error;
pub mod models;
pub mod services;
pub mod utils;
