//! Backend (server → client) messages.
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{Buf, Bytes};

use super::{Oid, PgFormat, ProtocolError};
use crate::{common::ByteStr, ext::BytesExt};

/// A type that can be decoded from a backend message body.
///
/// `body` is only the main body, excluding the tag byte and length prefix.
pub trait BackendMessage: Sized {
    const MSGTYPE: u8;

    fn decode(body: Bytes) -> Result<Self, ProtocolError>;
}

macro_rules! assert_msgtype {
    ($ty:ty, $found:expr) => {
        if $found != <$ty>::MSGTYPE {
            return Err(ProtocolError::unexpected(<$ty>::MSGTYPE, $found));
        }
    };
}

/// Every server message, tagged by wire type.
#[derive(Debug)]
pub enum ServerMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! dispatch_backend {
    ($($name:ident,)*) => {
        impl ServerMessage {
            pub const fn msgtype(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }

            /// Decode a message body given its tag byte.
            pub fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name(<$name as BackendMessage>::decode(body)?),)*
                    other => return Err(ProtocolError::unknown(other)),
                };
                Ok(message)
            }
        }
    };
}

dispatch_backend! {
    Authentication,
    BackendKeyData,
    BindComplete,
    CloseComplete,
    CommandComplete,
    DataRow,
    EmptyQueryResponse,
    ErrorResponse,
    NegotiateProtocolVersion,
    NoData,
    NoticeResponse,
    NotificationResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

/// Identifies the message as an authentication request.
#[derive(Debug)]
pub enum Authentication {
    Ok,
    KerberosV5,
    CleartextPassword,
    MD5Password { salt: [u8; 4] },
    GSS,
    GSSContinue { data: Bytes },
    SSPI,
    SASL { mechanisms: Bytes },
    SASLContinue { data: Bytes },
    SASLFinal { data: Bytes },
}

impl BackendMessage for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let auth = match body.get_u32() {
            0 => Self::Ok,
            2 => Self::KerberosV5,
            3 => Self::CleartextPassword,
            5 => Self::MD5Password { salt: body.get_u32().to_be_bytes() },
            7 => Self::GSS,
            8 => Self::GSSContinue { data: body },
            9 => Self::SSPI,
            10 => Self::SASL { mechanisms: body },
            11 => Self::SASLContinue { data: body },
            12 => Self::SASLFinal { data: body },
            other => return Err(ProtocolError::UnknownAuthentication(other)),
        };
        Ok(auth)
    }
}

/// The server's cancellation key data. The frontend must save these values
/// if it wishes to be able to issue `CancelRequest` messages later.
pub struct BackendKeyData {
    pub process_id: u32,
    pub secret_key: u32,
}

impl BackendMessage for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { process_id: body.get_u32(), secret_key: body.get_u32() })
    }
}

impl std::fmt::Debug for BackendKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendKeyData")
            .field("process_id", &self.process_id)
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

/// A run-time parameter status report, e.g. `server_version`.
#[derive(Debug)]
pub struct ParameterStatus {
    pub name: ByteStr,
    pub value: ByteStr,
}

impl BackendMessage for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { name: body.get_nul_bytestr()?, value: body.get_nul_bytestr()? })
    }
}

/// Raw field-coded payload shared by `ErrorResponse` and `NoticeResponse`.
///
/// Kept as the raw body here; structured parsing into
/// [`crate::postgres::fields::Desc`] happens in the `fields` module so the
/// decoder itself never allocates more than this single `Bytes` view.
pub struct ErrorResponse {
    pub body: Bytes,
}

impl BackendMessage for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorResponse").field("body", &"<FIELDS>").finish()
    }
}

pub struct NoticeResponse {
    pub body: Bytes,
}

impl BackendMessage for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for NoticeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeResponse").field("body", &"<FIELDS>").finish()
    }
}

/// One field in a `RowDescription`.
pub struct FieldDescription {
    pub name: ByteStr,
    pub table_oid: Oid,
    pub column_attr: u16,
    pub type_oid: Oid,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: PgFormat,
}

pub struct RowDescription {
    pub fields: Vec<FieldDescription>,
}

impl BackendMessage for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16();
        let mut fields = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let name = body.get_nul_bytestr()?;
            let table_oid = body.get_u32();
            let column_attr = body.get_u16();
            let type_oid = body.get_u32();
            let type_size = body.get_i16();
            let type_modifier = body.get_i32();
            let format_code = body.get_i16();
            let format = PgFormat::from_code(format_code)
                .ok_or(ProtocolError::UnknownFormatCode(format_code))?;
            fields.push(FieldDescription { name, table_oid, column_attr, type_oid, type_size, type_modifier, format });
        }
        Ok(Self { fields })
    }
}

impl std::fmt::Debug for RowDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowDescription").field("fields", &self.fields.len()).finish()
    }
}

/// One row of data. A column length of `-1` denotes SQL `NULL` and is
/// represented as `None`, consuming zero payload bytes.
pub struct DataRow {
    pub columns: Vec<Option<Bytes>>,
}

impl BackendMessage for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16();
        let mut columns = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let len = body.get_i32();
            if len < 0 {
                columns.push(None);
            } else {
                columns.push(Some(body.split_to(len as usize)));
            }
        }
        Ok(Self { columns })
    }
}

impl std::fmt::Debug for DataRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRow").field("columns", &self.columns.len()).finish()
    }
}

/// The command tag, e.g. `b"INSERT 0 3"`. Parsed further by
/// [`crate::postgres::command`].
#[derive(Debug)]
pub struct CommandComplete {
    pub tag: ByteStr,
}

impl BackendMessage for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tag: body.get_nul_bytestr()? })
    }
}

/// The server declined a requested protocol minor version.
#[derive(Debug)]
pub struct NegotiateProtocolVersion {
    pub minor: u32,
    pub unrecognized_options: Vec<ByteStr>,
}

impl BackendMessage for NegotiateProtocolVersion {
    const MSGTYPE: u8 = b'v';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let minor = body.get_u32();
        let count = body.get_u32();
        let mut unrecognized_options = Vec::with_capacity(count as usize);
        for _ in 0..count {
            unrecognized_options.push(body.get_nul_bytestr()?);
        }
        Ok(Self { minor, unrecognized_options })
    }
}

#[derive(Debug)]
pub struct ParameterDescription {
    pub oids: Vec<Oid>,
}

impl BackendMessage for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_u16();
        let mut oids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            oids.push(body.get_u32());
        }
        Ok(Self { oids })
    }
}

/// Current backend transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InBlock,
    Failed,
}

pub struct ReadyForQuery {
    pub tx_status: TransactionStatus,
}

impl BackendMessage for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let byte = body.get_u8();
        let tx_status = match byte {
            b'I' => TransactionStatus::Idle,
            b'T' => TransactionStatus::InBlock,
            b'E' => TransactionStatus::Failed,
            other => return Err(ProtocolError::UnknownTransactionStatus(other)),
        };
        Ok(Self { tx_status })
    }
}

impl std::fmt::Debug for ReadyForQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyForQuery").field("tx_status", &self.tx_status).finish()
    }
}

/// A LISTEN/NOTIFY delivery. Raw delivery only; no dispatch beyond this.
#[derive(Debug)]
pub struct NotificationResponse {
    pub process_id: u32,
    pub channel: ByteStr,
    pub payload: ByteStr,
}

impl BackendMessage for NotificationResponse {
    const MSGTYPE: u8 = b'A';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let process_id = body.get_u32();
        let channel = body.get_nul_bytestr()?;
        let payload = body.get_nul_bytestr()?;
        Ok(Self { process_id, channel, payload })
    }
}

macro_rules! unit_message {
    ($(#[$doc:meta])* struct $name:ident, $ty:literal;) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name;

        impl BackendMessage for $name {
            const MSGTYPE: u8 = $ty;

            fn decode(_body: Bytes) -> Result<Self, ProtocolError> {
                Ok(Self)
            }
        }
    };
}

unit_message! {
    /// Response to a successful `Bind`.
    struct BindComplete, b'2';
}

unit_message! {
    /// Response to a successful `Close`.
    struct CloseComplete, b'3';
}

unit_message! {
    /// Substitutes for `CommandComplete` when the simple query string was empty.
    struct EmptyQueryResponse, b'I';
}

unit_message! {
    /// No result set (e.g. `Describe` on a statement with no output columns).
    struct NoData, b'n';
}

unit_message! {
    /// Response to a successful `Parse`.
    struct ParseComplete, b'1';
}

unit_message! {
    /// The `Execute` row-count limit was reached before the portal was exhausted.
    ///
    /// Not expected in practice: this driver always executes with `max_rows = 0`.
    struct PortalSuspended, b's';
}
