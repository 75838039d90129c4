// Utility modules shared by models and services

pub mod clock;
pub mod time;
