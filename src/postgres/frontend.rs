//! Frontend (client → server) messages.
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{BufMut, BytesMut};

use super::{Oid, PgFormat};
use crate::ext::{BufMutExt, StrExt, UsizeExt};

/// Write a frontend message to `buf`, prefixing it with its tag byte and
/// big-endian length (length field included).
pub fn write<F: FrontendMessage>(msg: F, buf: &mut BytesMut) {
    const PREFIX: usize = 1 + 4;

    let size_hint = msg.size_hint();
    buf.reserve(PREFIX + size_hint as usize);

    let offset = buf.len();
    buf.put_u8(F::MSGTYPE);
    buf.put_u32(4 + size_hint);

    msg.encode(&mut *buf);

    debug_assert_eq!(
        buf.len() - offset,
        PREFIX + size_hint as usize,
        "frontend message body size did not match its size_hint"
    );
}

/// A type that can be encoded as a frontend message body.
pub trait FrontendMessage {
    /// The leading tag byte.
    const MSGTYPE: u8;

    /// Size of the encoded body, excluding the tag byte and length prefix.
    fn size_hint(&self) -> u32;

    /// Write the body. Must write exactly [`size_hint`][FrontendMessage::size_hint] bytes.
    fn encode(self, buf: impl BufMut);
}

/// The startup message.
///
/// For historical reasons this is the only frontend message with no leading
/// tag byte, so it does not implement [`FrontendMessage`] and is written with
/// [`StartupMessage::write`] instead.
#[derive(Debug)]
pub struct StartupMessage<'a> {
    /// The database user name to connect as. Required; there is no default.
    pub user: &'a str,
    /// The database to connect to. Defaults to the user name.
    pub database: Option<&'a str>,
}

const PROTOCOL_VERSION: u32 = 0x0003_0000;

impl StartupMessage<'_> {
    pub fn write(self, buf: &mut BytesMut) {
        let offset = buf.len();

        buf.put_u32(0); // length placeholder
        buf.put_u32(PROTOCOL_VERSION);

        buf.put_nul_string("user");
        buf.put_nul_string(self.user);

        if let Some(db) = self.database {
            buf.put_nul_string("database");
            buf.put_nul_string(db);
        }

        buf.put_u8(b'\0');

        let mut written = &mut buf[offset..];
        written.put_u32(written.len().to_u32());
    }
}

macro_rules! size_of_field {
    ($self:tt.$field:ident) => {
        u32::try_from(size_of_val(&$self.$field)).expect("field too large for protocol")
    };
}

/// `PasswordMessage` — the response to a cleartext or MD5 password request.
pub struct PasswordMessage<'a> {
    pub password: &'a str,
}

impl FrontendMessage for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> u32 {
        self.password.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.password);
    }
}

/// `Query` — a simple query.
pub struct SimpleQuery<'a> {
    pub sql: &'a str,
}

impl FrontendMessage for SimpleQuery<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> u32 {
        self.sql.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.sql);
    }
}

/// `Parse` — prepare a statement.
pub struct Parse<'a, I> {
    /// An empty string selects the unnamed prepared statement.
    pub stmt_name: &'a str,
    pub sql: &'a str,
    /// Object IDs of the parameter types the caller wants to prespecify.
    /// Zero means "unspecified".
    pub oids: I,
}

impl<'a, I> FrontendMessage for Parse<'a, I>
where
    I: ExactSizeIterator<Item = Oid>,
{
    const MSGTYPE: u8 = b'P';

    fn size_hint(&self) -> u32 {
        self.stmt_name.nul_string_len()
            + self.sql.nul_string_len()
            + size_of::<u16>() as u32
            + self.oids.len().to_u32() * size_of::<Oid>() as u32
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.stmt_name);
        buf.put_nul_string(self.sql);
        buf.put_u16(self.oids.len().to_u16());
        for oid in self.oids {
            buf.put_u32(oid);
        }
    }
}

/// A single encoded `Bind` parameter value, or `None` for SQL `NULL`.
pub type BindParam<'a> = Option<&'a [u8]>;

/// `Bind` — bind parameter values to a portal.
///
/// A single format code applies to all parameters and all result columns
/// (the "compact form" the protocol allows), matching invariant (4) in
/// the design notes: the driver never needs per-parameter format codes.
pub struct Bind<'a, Params> {
    /// An empty string selects the unnamed portal.
    pub portal_name: &'a str,
    /// An empty string selects the unnamed prepared statement.
    pub stmt_name: &'a str,
    pub param_format: PgFormat,
    pub params: Params,
    pub result_format: PgFormat,
}

impl<'a, Params> FrontendMessage for Bind<'a, Params>
where
    Params: ExactSizeIterator<Item = BindParam<'a>> + Clone,
{
    const MSGTYPE: u8 = b'B';

    fn size_hint(&self) -> u32 {
        let params_len: u32 = self
            .params
            .clone()
            .map(|p| size_of::<i32>() as u32 + p.map_or(0, |b| b.len().to_u32()))
            .sum();

        self.portal_name.nul_string_len()
            + self.stmt_name.nul_string_len()
            + size_of::<u16>() as u32 // n_param_formats
            + size_of::<i16>() as u32 // one format code
            + size_of::<u16>() as u32 // n_params
            + params_len
            + size_of::<u16>() as u32 // n_result_formats
            + size_of::<i16>() as u32 // one format code
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_nul_string(self.stmt_name);

        buf.put_u16(1);
        buf.put_i16(self.param_format.format_code());

        buf.put_u16(self.params.len().to_u16());
        for param in self.params {
            match param {
                Some(bytes) => {
                    buf.put_i32(bytes.len().to_u32() as i32);
                    buf.put_slice(bytes);
                }
                None => buf.put_i32(-1),
            }
        }

        buf.put_u16(1);
        buf.put_i16(self.result_format.format_code());
    }
}

/// `Execute` — execute a bound portal.
pub struct Execute<'a> {
    /// An empty string selects the unnamed portal.
    pub portal_name: &'a str,
    /// Zero denotes "no limit".
    pub max_rows: u32,
}

impl FrontendMessage for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn size_hint(&self) -> u32 {
        self.portal_name.nul_string_len() + size_of_field!(self.max_rows)
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_u32(self.max_rows);
    }
}

/// Which object a `Describe`/`Close` message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Statement,
    Portal,
}

impl Target {
    const fn byte(self) -> u8 {
        match self {
            Self::Statement => b'S',
            Self::Portal => b'P',
        }
    }
}

/// `Describe` — request `ParameterDescription`/`RowDescription`/`NoData` for
/// a statement or portal.
pub struct Describe<'a> {
    pub target: Target,
    /// An empty string selects the unnamed statement or portal.
    pub name: &'a str,
}

impl FrontendMessage for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn size_hint(&self) -> u32 {
        size_of::<u8>() as u32 + self.name.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.target.byte());
        buf.put_nul_string(self.name);
    }
}

/// `Close` — close a statement or portal.
pub struct Close<'a> {
    pub target: Target,
    /// An empty string selects the unnamed statement or portal.
    pub name: &'a str,
}

impl FrontendMessage for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn size_hint(&self) -> u32 {
        size_of::<u8>() as u32 + self.name.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.target.byte());
        buf.put_nul_string(self.name);
    }
}

macro_rules! unit_message {
    ($(#[$doc:meta])* struct $name:ident, $ty:literal;) => {
        $(#[$doc])*
        pub struct $name;

        impl FrontendMessage for $name {
            const MSGTYPE: u8 = $ty;

            fn size_hint(&self) -> u32 { 0 }

            fn encode(self, _buf: impl BufMut) { }
        }
    };
}

unit_message! {
    /// `Flush` — ask the backend to deliver pending results without a `Sync`.
    struct Flush, b'H';
}

unit_message! {
    /// `Sync` — close out an extended-query round, delimiting it with the
    /// matching `ReadyForQuery`.
    struct Sync, b'S';
}

unit_message! {
    /// `Terminate` — politely close the connection.
    struct Terminate, b'X';
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf;

    fn framed<F: FrontendMessage>(msg: F) -> BytesMut {
        let mut buf = BytesMut::new();
        write(msg, &mut buf);
        buf
    }

    #[test]
    fn sync_is_five_bytes() {
        let buf = framed(Sync);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'S');
    }

    #[test]
    fn startup_message_has_no_tag_and_correct_length() {
        let mut buf = BytesMut::new();
        StartupMessage { user: "alice", database: Some("app") }.write(&mut buf);
        let mut view = buf.clone();
        let len = view.get_u32();
        assert_eq!(len as usize, buf.len());
    }

    #[test]
    fn parse_frame_length_matches_payload() {
        let buf = framed(Parse { stmt_name: "s", sql: "SELECT 1", oids: [23u32].into_iter() });
        let mut view = buf.clone();
        assert_eq!(view.get_u8(), b'P');
        let len = view.get_u32();
        assert_eq!(len as usize, buf.len() - 1);
    }

    #[test]
    fn simple_query_frame_length_matches_payload() {
        let buf = framed(SimpleQuery { sql: "SELECT 1" });
        let mut view = buf.clone();
        assert_eq!(view.get_u8(), b'Q');
        let len = view.get_u32();
        assert_eq!(len as usize, buf.len() - 1);
    }

    #[test]
    fn close_targets_statement_or_portal() {
        let stmt = framed(Close { target: Target::Statement, name: "s" });
        let portal = framed(Close { target: Target::Portal, name: "s" });
        assert_eq!(stmt[5], b'S');
        assert_eq!(portal[5], b'P');
    }

    #[test]
    fn bind_null_param_consumes_no_payload() {
        let params: Vec<BindParam> = vec![None];
        let buf = framed(Bind {
            portal_name: "",
            stmt_name: "",
            param_format: PgFormat::Text,
            params: params.into_iter(),
            result_format: PgFormat::Text,
        });
        // tag(1) + len(4) + portal nul(1) + stmt nul(1) + n_fmt(2) + fmt(2)
        // + n_params(2) + param_len(4, == -1) + n_result_fmt(2) + result_fmt(2)
        assert_eq!(buf.len(), 1 + 4 + 1 + 1 + 2 + 2 + 2 + 4 + 2 + 2);
    }
}
