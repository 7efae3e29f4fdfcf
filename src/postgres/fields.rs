//! Structured diagnostics: the field-coded payload shared by `ErrorResponse`
//! and `NoticeResponse`.
//!
//! <https://www.postgresql.org/docs/current/protocol-error-fields.html>
use bytes::{Buf, Bytes};

use super::ProtocolError;
use crate::ext::BytesExt;

/// Error/notice severity, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Fatal,
    Panic,
    Warning,
    Notice,
    Debug,
    Info,
    Log,
    UnknownSeverity,
}

impl Severity {
    fn parse(s: &str) -> Self {
        match s {
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            "PANIC" => Self::Panic,
            "WARNING" => Self::Warning,
            "NOTICE" => Self::Notice,
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "LOG" => Self::Log,
            _ => Self::UnknownSeverity,
        }
    }
}

/// A fully parsed `ErrorResponse`/`NoticeResponse` body.
///
/// Only `severity`, `code`, and `message` are mandatory on the wire; every
/// other field is optional diagnostic context.
#[derive(Debug, Clone)]
pub struct Desc {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<u32>,
    pub internal_position: Option<u32>,
    pub internal_query: Option<String>,
    pub context: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub data_type: Option<String>,
    pub constraint: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub routine: Option<String>,
}

#[derive(Default)]
struct Builder {
    localized_severity: Option<String>,
    unlocalized_severity: Option<String>,
    code: Option<String>,
    message: Option<String>,
    detail: Option<String>,
    hint: Option<String>,
    position: Option<u32>,
    internal_position: Option<u32>,
    internal_query: Option<String>,
    context: Option<String>,
    schema: Option<String>,
    table: Option<String>,
    column: Option<String>,
    data_type: Option<String>,
    constraint: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    routine: Option<String>,
}

/// Parse the `(Byte1 key, NUL-terminated value)*` sequence terminated by a
/// lone NUL into a [`Desc`].
pub fn parse(mut body: Bytes) -> Result<Desc, ProtocolError> {
    let mut b = Builder::default();

    loop {
        let key = body.get_u8();
        if key == 0 {
            break;
        }
        let value = body.get_nul_bytestr()?.as_str().to_owned();
        match key {
            b'S' => b.localized_severity = Some(value),
            b'V' => b.unlocalized_severity = Some(value),
            b'C' => b.code = Some(value),
            b'M' => b.message = Some(value),
            b'D' => b.detail = Some(value),
            b'H' => b.hint = Some(value),
            b'P' => b.position = value.parse().ok(),
            b'p' => b.internal_position = value.parse().ok(),
            b'q' => b.internal_query = Some(value),
            b'W' => b.context = Some(value),
            b's' => b.schema = Some(value),
            b't' => b.table = Some(value),
            b'c' => b.column = Some(value),
            b'd' => b.data_type = Some(value),
            b'n' => b.constraint = Some(value),
            b'F' => b.file = Some(value),
            b'L' => b.line = value.parse().ok(),
            b'R' => b.routine = Some(value),
            _ => {} // frontends should silently ignore unrecognized field types
        }
    }

    let severity_str = b.unlocalized_severity.or(b.localized_severity)
        .ok_or(ProtocolError::MissingErrorField(b'S'))?;

    Ok(Desc {
        severity: Severity::parse(&severity_str),
        code: b.code.ok_or(ProtocolError::MissingErrorField(b'C'))?,
        message: b.message.ok_or(ProtocolError::MissingErrorField(b'M'))?,
        detail: b.detail,
        hint: b.hint,
        position: b.position,
        internal_position: b.internal_position,
        internal_query: b.internal_query,
        context: b.context,
        schema: b.schema,
        table: b.table,
        column: b.column,
        data_type: b.data_type,
        constraint: b.constraint,
        file: b.file,
        line: b.line,
        routine: b.routine,
    })
}

impl std::fmt::Display for Desc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} [{}]: {}", self.severity, self.code, self.message)
    }
}
