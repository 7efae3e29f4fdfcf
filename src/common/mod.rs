//! Supporting utility types shared across the crate.
mod bytestr;
mod url;

pub use bytestr::ByteStr;
pub(crate) use url::{Url, UrlParseError};

/// Trace a protocol-level event when the `verbose` feature is enabled.
///
/// Kept as a macro (rather than calling `tracing` directly) so the hot
/// codec/receiver paths compile to nothing when `verbose` is off.
macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")] tracing::trace!($($tt)*);
    };
}

pub(crate) use trace;
