//! Small extension traits smoothing over the wire protocol's integer
//! signedness and NUL-terminated string conventions.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::ByteStr;

/// Fallible `usize` → protocol integer width conversions.
///
/// Postgres message lengths are `u32`/`u16` on the wire; a `usize` that does
/// not fit indicates a message far beyond anything the protocol permits, so
/// this panics rather than silently wrapping.
pub trait UsizeExt {
    fn to_u32(self) -> u32;
    fn to_u16(self) -> u16;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for protocol")
    }

    fn to_u16(self) -> u16 {
        self.try_into().expect("message size too large for protocol")
    }
}

pub trait StrExt {
    /// Length of `self` once NUL-terminated on the wire.
    fn nul_string_len(&self) -> u32;
}

impl StrExt for str {
    fn nul_string_len(&self) -> u32 {
        self.len().to_u32() + 1
    }
}

pub trait BufMutExt {
    fn put_nul_string(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

pub trait BytesExt {
    /// Splits off everything up to (and consuming) the next NUL byte.
    fn get_nul_bytes(&mut self) -> Bytes;

    /// Same as [`get_nul_bytes`][BytesExt::get_nul_bytes] but validated as UTF-8.
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error>;
}

impl BytesExt for Bytes {
    fn get_nul_bytes(&mut self) -> Bytes {
        let end = self
            .iter()
            .position(|&b| b == b'\0')
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        me
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        ByteStr::from_utf8(self.get_nul_bytes())
    }
}

impl BytesExt for BytesMut {
    fn get_nul_bytes(&mut self) -> Bytes {
        let end = self
            .iter()
            .position(|&b| b == b'\0')
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        me.freeze()
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        ByteStr::from_utf8(self.get_nul_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_roundtrip() {
        let mut buf = BytesMut::new();
        buf.put_nul_string("hello");
        let mut bytes = buf.freeze();
        assert_eq!(bytes.get_nul_bytestr().unwrap().as_str(), "hello");
        assert!(bytes.is_empty());
    }
}
