// Service module exports

pub mod api;
pub mod countdown;
pub mod database;
pub mod drafts;
pub mod lifecycle;
pub mod session;
pub mod settings;
