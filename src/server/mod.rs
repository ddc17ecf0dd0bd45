// Server module entry point
// Listener setup, connection handling and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

pub use connection::{accept_connection, ConnectionContext};
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;
