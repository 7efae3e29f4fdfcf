//! Startup and the authentication state machine (§4.3).
//!
//! Runs once, before the receiver task exists: startup and authentication
//! are strictly request/response, so there is nothing to gain from
//! concurrent dispatch yet. The [`Decoder`] used here is handed off to the
//! receiver afterward, carrying over any bytes already buffered past
//! `ReadyForQuery` (the server frequently bundles the whole startup reply
//! into one or two reads).
use bytes::BytesMut;
use md5::{Digest, Md5};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::decode::Decoder;
use crate::error::Error;
use crate::params::ConnectionParameters;
use crate::postgres::backend::{Authentication, BackendKeyData, ServerMessage};
use crate::postgres::fields;
use crate::postgres::frontend::{self, PasswordMessage, StartupMessage};

/// Result of a successful startup: the negotiated session parameters and the
/// cancellation key data the server handed back.
pub struct Startup {
    pub params: ConnectionParameters,
    pub backend_key_data: BackendKeyData,
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to a String never fails");
    }
    out
}

/// `"md5" ++ hex(md5(hex(md5(password ++ user)) ++ salt))`.
pub fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    let inner = hex_lower(&Md5::digest([password.as_bytes(), user.as_bytes()].concat()));

    let mut salted = Vec::with_capacity(inner.len() + salt.len());
    salted.extend_from_slice(inner.as_bytes());
    salted.extend_from_slice(&salt);

    format!("md5{}", hex_lower(&Md5::digest(salted)))
}

async fn read_message<T: AsyncRead + Unpin>(
    io: &mut T,
    decoder: &mut Decoder,
) -> Result<ServerMessage, Error> {
    let (msgtype, body) = decoder.read_frame(io).await?;
    Ok(ServerMessage::decode(msgtype, body)?)
}

/// Send `StartupMessage`, answer whatever authentication challenge the
/// server issues, then collect `ParameterStatus`/`BackendKeyData` until
/// `ReadyForQuery`.
pub async fn perform<T: AsyncRead + AsyncWrite + Unpin>(
    io: &mut T,
    decoder: &mut Decoder,
    user: &str,
    password: &str,
    database: &str,
) -> Result<Startup, Error> {
    let mut out = BytesMut::new();
    StartupMessage { user, database: Some(database) }.write(&mut out);
    io.write_all(&out).await?;
    io.flush().await?;

    loop {
        match read_message(io, decoder).await? {
            ServerMessage::Authentication(Authentication::Ok) => break,
            ServerMessage::Authentication(Authentication::CleartextPassword) => {
                send_password(io, PasswordMessage { password }).await?;
            }
            ServerMessage::Authentication(Authentication::MD5Password { salt }) => {
                let digest = md5_password(user, password, salt);
                send_password(io, PasswordMessage { password: &digest }).await?;
            }
            ServerMessage::Authentication(Authentication::KerberosV5) => {
                return Err(Error::AuthNotSupported("KerberosV5"));
            }
            ServerMessage::Authentication(Authentication::GSS)
            | ServerMessage::Authentication(Authentication::GSSContinue { .. }) => {
                return Err(Error::AuthNotSupported("GSS"));
            }
            ServerMessage::Authentication(Authentication::SSPI) => {
                return Err(Error::AuthNotSupported("SSPI"));
            }
            ServerMessage::Authentication(
                Authentication::SASL { .. }
                | Authentication::SASLContinue { .. }
                | Authentication::SASLFinal { .. },
            ) => {
                return Err(Error::AuthNotSupported("SASL"));
            }
            ServerMessage::ErrorResponse(err) => {
                return Err(Error::AuthPostgresError(fields::parse(err.body)?));
            }
            other => return Err(unexpected(other)),
        }
    }

    let mut params = ConnectionParameters::default();
    let mut backend_key_data = None;

    loop {
        match read_message(io, decoder).await? {
            ServerMessage::ParameterStatus(status) => {
                params.apply(status.name.as_str(), status.value.as_str());
            }
            ServerMessage::BackendKeyData(key_data) => backend_key_data = Some(key_data),
            ServerMessage::NoticeResponse(_) => {
                #[cfg(feature = "log")]
                log::warn!("notice during startup");
            }
            ServerMessage::NegotiateProtocolVersion(neg) => {
                #[cfg(feature = "log")]
                log::warn!("server declined protocol minor version, negotiated down to {}", neg.minor);
                #[cfg(not(feature = "log"))]
                let _ = neg;
            }
            ServerMessage::ErrorResponse(err) => {
                return Err(Error::AuthPostgresError(fields::parse(err.body)?));
            }
            ServerMessage::ReadyForQuery(_) => break,
            other => return Err(unexpected(other)),
        }
    }

    Ok(Startup {
        params,
        backend_key_data: backend_key_data
            .unwrap_or(BackendKeyData { process_id: 0, secret_key: 0 }),
    })
}

async fn send_password<T: AsyncWrite + Unpin>(
    io: &mut T,
    msg: PasswordMessage<'_>,
) -> Result<(), Error> {
    let mut out = BytesMut::new();
    frontend::write(msg, &mut out);
    io.write_all(&out).await?;
    io.flush().await?;
    Ok(())
}

fn unexpected(message: ServerMessage) -> Error {
    Error::DecodeError(crate::postgres::ProtocolError::unexpected_phase(message.msgtype(), "startup"))
}
