//! Streaming frame decoder.
//!
//! Feeds arbitrary, socket-sized chunks into an internal buffer and yields
//! complete `(tag, body)` frames as soon as enough bytes have accumulated.
//! Never reads past a message's declared length and never panics on a
//! partial frame — the caller just feeds more bytes and asks again.
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;
use crate::postgres::ProtocolError;

const HEADER_LEN: usize = 1 + 4;
const READ_CHUNK: usize = 4096;

/// A buffered byte window plus a parser that returns one frame at a time.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: BytesMut,
}

/// Result of asking the decoder for the next frame.
pub enum Frame {
    /// A full frame was available; the raw message type byte and its body
    /// (length-prefix already removed) are returned.
    Done { msgtype: u8, body: Bytes },
    /// Not enough bytes have been fed yet.
    Partial,
}

impl Decoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Append freshly read bytes, in whatever chunk size the transport handed back.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Try to parse the next frame out of the buffered bytes.
    ///
    /// Returns [`Frame::Partial`] without consuming anything if the header
    /// or body is not fully buffered yet. Fails if the declared length is
    /// too short to even cover the length field itself.
    pub fn next_frame(&mut self) -> Result<Frame, ProtocolError> {
        let Some(header) = self.buf.get(..HEADER_LEN) else {
            return Ok(Frame::Partial);
        };

        let msgtype = header[0];
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        // `len` includes itself (4 bytes) but not the tag byte.
        let body_len = len.checked_sub(4).ok_or(ProtocolError::MalformedFrame(len))? as usize;

        if self.buf.len() < HEADER_LEN + body_len {
            return Ok(Frame::Partial);
        }

        self.buf.advance(HEADER_LEN);
        let body = self.buf.split_to(body_len).freeze();
        Ok(Frame::Done { msgtype, body })
    }

    /// Read from `io` until a full frame is available, feeding whatever
    /// chunk size the transport hands back. Used both by the startup
    /// sequence and the receiver task so the two share one buffering
    /// strategy; a decoder handed from one to the other carries over any
    /// bytes already buffered past the frame that was just consumed.
    pub async fn read_frame<T: AsyncRead + Unpin>(
        &mut self,
        io: &mut T,
    ) -> Result<(u8, Bytes), Error> {
        loop {
            if let Frame::Done { msgtype, body } = self.next_frame()? {
                return Ok((msgtype, body));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = io.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )
                .into());
            }
            self.feed(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::frontend::{self, Sync};

    fn frame(msgtype: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![msgtype];
        out.extend_from_slice(&((4 + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn partial_header_yields_partial() {
        let mut dec = Decoder::new();
        dec.feed(&[b'Z', 0, 0]);
        assert!(matches!(dec.next_frame(), Ok(Frame::Partial)));
    }

    #[test]
    fn splits_arbitrary_chunk_boundaries() {
        let full = frame(b'Z', b"I");
        for split in 1..full.len() {
            let mut dec = Decoder::new();
            dec.feed(&full[..split]);
            assert!(matches!(dec.next_frame(), Ok(Frame::Partial)), "split at {split}");
            dec.feed(&full[split..]);
            match dec.next_frame() {
                Ok(Frame::Done { msgtype, body }) => {
                    assert_eq!(msgtype, b'Z');
                    assert_eq!(&body[..], b"I");
                }
                Ok(Frame::Partial) => panic!("expected Done after feeding remainder (split {split})"),
                Err(_) => panic!("unexpected decode error (split {split})"),
            }
        }
    }

    #[test]
    fn two_concatenated_frames_decode_in_order() {
        let mut bytes = BytesMut::new();
        frontend::write(Sync, &mut bytes);
        frontend::write(Sync, &mut bytes);

        let mut dec = Decoder::new();
        dec.feed(&bytes);

        let mut count = 0;
        while let Ok(Frame::Done { msgtype, .. }) = dec.next_frame() {
            assert_eq!(msgtype, b'S');
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn never_consumes_beyond_declared_length() {
        let mut trailing = frame(b'Z', b"I");
        trailing.extend_from_slice(b"TRAILING-BYTES-NOT-PART-OF-FRAME");

        let mut dec = Decoder::new();
        dec.feed(&trailing);
        let Ok(Frame::Done { body, .. }) = dec.next_frame() else { panic!("expected Done") };
        assert_eq!(&body[..], b"I");
        assert!(matches!(dec.next_frame(), Ok(Frame::Partial)));
    }

    #[test]
    fn declared_length_below_four_is_a_decode_error() {
        let mut dec = Decoder::new();
        // length field declares 3, too short to even cover itself.
        dec.feed(&[b'Z', 0, 0, 0, 3]);
        assert!(matches!(dec.next_frame(), Err(ProtocolError::MalformedFrame(3))));
    }
}
