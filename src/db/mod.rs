pub mod connection;
pub mod store;

pub use connection::Database;
