//! Postgres frontend/backend protocol (version 3).
//!
//! All communication is a stream of messages: the first byte identifies the
//! message type, the next four bytes (big-endian) give the length of the
//! rest of the message including the length field itself.
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┓
//! ┃ Ty ┃       Length      ┃ Body ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ u8 ┃        u32        ┃ [u8] ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┛
//! ```
//!
//! For historical reasons the very first message sent by the client, the
//! startup message, has no leading message-type byte.
//!
//! <https://www.postgresql.org/docs/current/protocol-overview.html>

mod pg_format;
mod pg_type;

pub mod backend;
pub mod command;
pub mod fields;
mod error;
pub mod frontend;
pub mod version;

pub use pg_format::PgFormat;
pub use pg_type::Oid;

pub use backend::{BackendMessage, ServerMessage, TransactionStatus};
pub use error::ProtocolError;
pub use frontend::FrontendMessage;
