use crate::common::ByteStr;

/// An error decoding a backend message: a malformed frame, an unknown tag,
/// an unknown authentication sub-type, an unknown transaction status, an
/// unknown format code, a malformed command tag, or a missing mandatory
/// error field.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown backend message type: {0:?}")]
    UnknownMessageType(u8),

    #[error("malformed frame: declared length {0} is shorter than the length field itself")]
    MalformedFrame(u32),

    #[error("expected message type {expected:?}, found {found:?}")]
    UnexpectedMessageType { expected: u8, found: u8 },

    #[error("message type {msgtype:?} is not valid during {phase}")]
    UnexpectedPhase { msgtype: u8, phase: &'static str },

    #[error("unknown authentication sub-type: {0}")]
    UnknownAuthentication(u32),

    #[error("unknown transaction status byte: {0:?}")]
    UnknownTransactionStatus(u8),

    #[error("unknown format code: {0}")]
    UnknownFormatCode(i16),

    #[error("malformed command tag: {0:?}")]
    MalformedCommandTag(ByteStr),

    #[error("missing mandatory error field {0:?}")]
    MissingErrorField(u8),

    #[error("invalid utf-8 in protocol string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl ProtocolError {
    pub(crate) fn unexpected(expected: u8, found: u8) -> Self {
        Self::UnexpectedMessageType { expected, found }
    }

    pub(crate) fn unknown(msgtype: u8) -> Self {
        Self::UnknownMessageType(msgtype)
    }

    pub(crate) fn unexpected_phase(msgtype: u8, phase: &'static str) -> Self {
        Self::UnexpectedPhase { msgtype, phase }
    }
}
