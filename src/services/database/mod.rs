// Database service module
// SQLite storage for the operator's local state: session and countdowns

mod connection;
mod schema;

pub use connection::Database;
