//! Crate-root error type surfaced to callers of the connection and request API.
use crate::options::ConfigError;
use crate::postgres::ProtocolError;
use crate::postgres::fields::Desc;

/// Every way a connection or request can fail.
///
/// `Clone` so a single fatal decode/transport failure inside the receiver
/// task can be delivered to both `dataQ` and `allQ` (see §5's "implementors
/// must pick one and document it" on observing closure).
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// An `ErrorResponse` the server emitted mid-session.
    #[error("postgres error: {0}")]
    PostgresError(Desc),

    /// An `ErrorResponse` the server emitted during authentication.
    #[error("postgres error during authentication: {0}")]
    AuthPostgresError(Desc),

    /// The server asked for an authentication method this driver does not
    /// implement (GSS, SSPI, or a GSS continuation).
    #[error("authentication method not supported: {0}")]
    AuthNotSupported(&'static str),

    /// A malformed frame, unknown tag, or otherwise unparseable message.
    #[error("decode error: {0}")]
    DecodeError(#[from] ProtocolError),

    /// The underlying transport failed to send or receive.
    #[error("transport error: {0}")]
    TransportError(std::sync::Arc<std::io::Error>),

    /// A `Config` could not be parsed or assembled.
    #[error("configuration error: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Requested a feature the configuration does not support (e.g. TLS).
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// The connection's receiver task is gone; further queue reads cannot
    /// make progress.
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::TransportError(std::sync::Arc::new(err))
    }
}
