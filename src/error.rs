use std::{fmt, io};

use liaise::{Liaise, RegisterErrors};

use crate::BufferTooSmall;

#[derive(RegisterErrors, Debug, Copy, Clone, PartialEq, Eq)]
#[error_prefix = "GATE"]
pub enum GateCode {
    Io = 1,
    BufferTooSmall = 2,
    FrameTooLarge = 3,
    FileNotFound = 4,
    AttrDoesntExist = 20,
    AttrNameExists = 21,
    TypeMismatch = 22,
    BadIndex = 23,
    BadArgument = 24,
    WrongObjectType = 25,
    Alloc = 30,
    #[cfg(feature = "postcard")]
    PostcardEncode = 40,
    #[cfg(feature = "postcard")]
    PostcardDecode = 41,
    #[cfg(feature = "cbor")]
    CborEncode = 42,
    #[cfg(feature = "cbor")]
    CborDecode = 43,
}

impl Liaise for GateCode {
    fn code_id(self) -> u16 { self as u16 }

    fn message(self) -> &'static str {
        match self {
            Self::Io => "I/O error",
            Self::BufferTooSmall => "Buffer too small",
            Self::FrameTooLarge => "Frame too large",
            Self::FileNotFound => "File not found",
            Self::AttrDoesntExist => "Attribute does not exist",
            Self::AttrNameExists => "Attribute name already exists",
            Self::TypeMismatch => "Attribute type mismatch",
            Self::BadIndex => "Bad value index",
            Self::BadArgument => "Bad argument",
            Self::WrongObjectType => "Wrong object type",
            Self::Alloc => "Allocation failed",
            #[cfg(feature = "postcard")]
            Self::PostcardEncode => "Postcard encode failed",
            #[cfg(feature = "postcard")]
            Self::PostcardDecode => "Postcard decode failed",
            #[cfg(feature = "cbor")]
            Self::CborEncode => "CBOR encode failed",
            #[cfg(feature = "cbor")]
            Self::CborDecode => "CBOR decode failed",
        }
    }
}

/// Concrete runtime error type for the crate.
/// Uses `liaise` for stable IDs + formatting.
#[derive(Debug)]
pub struct GateError {
    pub code: GateCode,
    pub ctx: Option<String>,
    pub source: Option<GateSource>,
}

#[derive(Debug)]
pub enum GateSource {
    Io(io::Error),
    Short(BufferTooSmall),
    #[cfg(feature = "postcard")]
    Postcard(postcard::Error),
    #[cfg(feature = "cbor")]
    Cbor(serde_cbor::Error),
}

impl GateError {
    #[inline]
    pub fn new(code: GateCode) -> Self {
        Self { code, ctx: None, source: None }
    }

    #[inline]
    pub fn ctx(mut self, ctx: impl fmt::Display) -> Self {
        self.ctx = Some(ctx.to_string());
        self
    }

    #[inline]
    pub fn is(&self, code: GateCode) -> bool {
        self.code == code
    }

    /// Required length when this is a `BufferTooSmall` error.
    pub fn needed(&self) -> Option<usize> {
        match &self.source {
            Some(GateSource::Short(s)) => Some(s.needed),
            _ => None,
        }
    }

    #[inline]
    pub fn io(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => GateCode::FileNotFound,
            _ => GateCode::Io,
        };
        Self {
            code,
            ctx: Some(err.to_string()),
            source: Some(GateSource::Io(err)),
        }
    }

    #[inline]
    pub fn buffer_too_small(needed: usize) -> Self {
        Self {
            code: GateCode::BufferTooSmall,
            ctx: Some(format!("need {needed} bytes")),
            source: Some(GateSource::Short(BufferTooSmall { needed })),
        }
    }

    #[inline]
    pub fn frame_too_large(len: usize, max: usize) -> Self {
        Self::new(GateCode::FrameTooLarge).ctx(format_args!("len {len} exceeds max {max}"))
    }

    #[inline]
    pub fn attr_missing(what: impl fmt::Display) -> Self {
        Self::new(GateCode::AttrDoesntExist).ctx(what)
    }

    #[inline]
    pub fn bad_index(index: u32, count: u32) -> Self {
        Self::new(GateCode::BadIndex).ctx(format_args!("index {index}, {count} values"))
    }

    #[inline]
    pub fn alloc(len: usize) -> Self {
        Self::new(GateCode::Alloc).ctx(format_args!("{len} bytes"))
    }

    #[cfg(feature = "postcard")]
    #[inline]
    pub fn postcard_encode(err: postcard::Error) -> Self {
        Self {
            code: GateCode::PostcardEncode,
            ctx: Some(err.to_string()),
            source: Some(GateSource::Postcard(err)),
        }
    }

    #[cfg(feature = "postcard")]
    #[inline]
    pub fn postcard_decode(err: postcard::Error) -> Self {
        Self {
            code: GateCode::PostcardDecode,
            ctx: Some(err.to_string()),
            source: Some(GateSource::Postcard(err)),
        }
    }

    #[cfg(feature = "cbor")]
    #[inline]
    pub fn cbor_encode(err: serde_cbor::Error) -> Self {
        Self {
            code: GateCode::CborEncode,
            ctx: Some(err.to_string()),
            source: Some(GateSource::Cbor(err)),
        }
    }

    #[cfg(feature = "cbor")]
    #[inline]
    pub fn cbor_decode(err: serde_cbor::Error) -> Self {
        Self {
            code: GateCode::CborDecode,
            ctx: Some(err.to_string()),
            source: Some(GateSource::Cbor(err)),
        }
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "[GATE0002] Buffer too small: need 8 bytes"
        let base = self.code.render();
        match &self.ctx {
            Some(ctx) => write!(f, "{base}: {ctx}"),
            None => write!(f, "{base}"),
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(GateSource::Io(e)) => Some(e),
            Some(GateSource::Short(e)) => Some(e),
            #[cfg(feature = "postcard")]
            Some(GateSource::Postcard(e)) => Some(e),
            #[cfg(feature = "cbor")]
            Some(GateSource::Cbor(e)) => Some(e),
            None => None,
        }
    }
}

impl From<io::Error> for GateError {
    #[inline]
    fn from(e: io::Error) -> Self {
        GateError::io(e)
    }
}

impl From<BufferTooSmall> for GateError {
    fn from(e: BufferTooSmall) -> Self {
        GateError::buffer_too_small(e.needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_maps_to_file_not_found() {
        let e = GateError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(e.is(GateCode::FileNotFound));

        let e = GateError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(e.is(GateCode::Io));
    }

    #[test]
    fn buffer_too_small_keeps_needed_len() {
        let e = GateError::from(BufferTooSmall { needed: 12 });
        assert_eq!(e.needed(), Some(12));
        assert!(format!("{e}").contains("Buffer too small"));
        assert!(format!("{e}").contains("need 12 bytes"));

        assert_eq!(GateError::new(GateCode::BadIndex).needed(), None);
    }
}
