//! Connection query and mutation engine

pub mod connections;
pub mod handler;

pub use connections::{Connection, NodeConnections};
pub use handler::ConnectionHandler;
