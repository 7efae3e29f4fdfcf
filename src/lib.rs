//! A client-side driver for the PostgreSQL frontend/backend wire protocol
//! (protocol version 3): startup and authentication, a bit-exact binary
//! codec, a streaming decoder tolerant of arbitrary chunk boundaries, a
//! concurrent receiver that multiplexes server replies into a data stream
//! and a control stream, and the simple- and extended-query request APIs.
//!
//! <https://www.postgresql.org/docs/current/protocol.html>

mod auth;
mod common;
mod connection;
mod decode;
mod error;
mod ext;
mod net;
mod options;
mod params;
pub mod postgres;
mod receiver;
mod request;
mod statement;

pub use connection::Connection;
pub use error::Error;
pub use options::{Config, ConfigError, TlsMode};
pub use params::ConnectionParameters;
pub use receiver::DataMessage;
pub use request::{
    Described, QuerySpec, describe_statement, read_next_data, read_ready_for_query, send_batch,
    send_batch_and_sync, send_flush, send_sync,
};
pub use statement::{NameGenerator, NoStatementCache, StatementName, StatementStorage, UNNAMED};
