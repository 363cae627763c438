//! Concrete transports.
//!
//! Only the native tokio-tungstenite transport exists; the manager itself
//! never touches a socket, so tests swap in a recording transport instead.

mod connection_native;

pub use connection_native::TungsteniteTransport;
