use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Returned by stores that need a larger destination buffer to hand out a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTooSmall {
    pub needed: usize,
}

impl core::fmt::Display for BufferTooSmall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "buffer too small (need {} bytes)", self.needed)
    }
}

impl std::error::Error for BufferTooSmall {}

/// Handle naming one attribute slot on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub u32);

impl AttrId {
    /// Returned by lookups that find nothing.
    pub const ILLEGAL: AttrId = AttrId(u32::MAX);

    pub fn is_illegal(self) -> bool { self == Self::ILLEGAL }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrType {
    Unknown,
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Milliseconds since the Unix epoch, stored as an `i64`.
    TimeVal,
    CharArray,
    Bytes,
    Object,
}

impl AttrType {
    /// Exact byte length of one value, for fixed-size types.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::TimeVal => Some(8),
            Self::Unknown | Self::CharArray | Self::Bytes | Self::Object => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Bool => "Bool",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::TimeVal => "TimeVal",
            Self::CharArray => "CharArray",
            Self::Bytes => "Bytes",
            Self::Object => "Object",
        }
    }

    /// Renders stored bytes of this type as text.
    ///
    /// Bytes whose length does not fit the type render as hex, so this never fails.
    pub fn format_bytes(self, bytes: &[u8]) -> String {
        fn arr<const N: usize>(b: &[u8]) -> Option<[u8; N]> { b.try_into().ok() }

        let text = match self {
            Self::Bool => arr::<1>(bytes).map(|b| (b[0] != 0).to_string()),
            Self::Int16 => arr(bytes).map(|b| i16::from_ne_bytes(b).to_string()),
            Self::UInt16 => arr(bytes).map(|b| u16::from_ne_bytes(b).to_string()),
            Self::Int32 => arr(bytes).map(|b| i32::from_ne_bytes(b).to_string()),
            Self::UInt32 => arr(bytes).map(|b| u32::from_ne_bytes(b).to_string()),
            Self::Int64 | Self::TimeVal => arr(bytes).map(|b| i64::from_ne_bytes(b).to_string()),
            Self::UInt64 => arr(bytes).map(|b| u64::from_ne_bytes(b).to_string()),
            Self::Float32 => arr(bytes).map(|b| f32::from_ne_bytes(b).to_string()),
            Self::Float64 => arr(bytes).map(|b| f64::from_ne_bytes(b).to_string()),
            Self::CharArray => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Unknown | Self::Bytes | Self::Object => None,
        };

        text.unwrap_or_else(|| bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

impl core::fmt::Display for AttrType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    TimeVal(i64),
    CharArray(String),
    Bytes(Vec<u8>),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Bool(_) => AttrType::Bool,
            Self::Int16(_) => AttrType::Int16,
            Self::UInt16(_) => AttrType::UInt16,
            Self::Int32(_) => AttrType::Int32,
            Self::UInt32(_) => AttrType::UInt32,
            Self::Int64(_) => AttrType::Int64,
            Self::UInt64(_) => AttrType::UInt64,
            Self::Float32(_) => AttrType::Float32,
            Self::Float64(_) => AttrType::Float64,
            Self::TimeVal(_) => AttrType::TimeVal,
            Self::CharArray(_) => AttrType::CharArray,
            Self::Bytes(_) => AttrType::Bytes,
        }
    }

    /// Stored representation (native byte order for scalars).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Int16(v) => v.to_ne_bytes().to_vec(),
            Self::UInt16(v) => v.to_ne_bytes().to_vec(),
            Self::Int32(v) => v.to_ne_bytes().to_vec(),
            Self::UInt32(v) => v.to_ne_bytes().to_vec(),
            Self::Int64(v) | Self::TimeVal(v) => v.to_ne_bytes().to_vec(),
            Self::UInt64(v) => v.to_ne_bytes().to_vec(),
            Self::Float32(v) => v.to_ne_bytes().to_vec(),
            Self::Float64(v) => v.to_ne_bytes().to_vec(),
            Self::CharArray(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }
}

/// Fixed-size values that can be read through the defaulting accessors.
pub trait AttrScalar: Copy {
    const TYPE: AttrType;
    /// Size of the stored representation.
    const LEN: usize;

    fn encode(self) -> [u8; 8];
    fn decode(src: &[u8]) -> Option<Self>;
}

macro_rules! scalar {
    ($t:ty, $variant:ident) => {
        impl AttrScalar for $t {
            const TYPE: AttrType = AttrType::$variant;
            const LEN: usize = core::mem::size_of::<$t>();

            fn encode(self) -> [u8; 8] {
                let mut out = [0u8; 8];
                out[..Self::LEN].copy_from_slice(&self.to_ne_bytes());
                out
            }

            fn decode(src: &[u8]) -> Option<Self> {
                Some(<$t>::from_ne_bytes(src.try_into().ok()?))
            }
        }
    };
}

scalar!(i16, Int16);
scalar!(u16, UInt16);
scalar!(i32, Int32);
scalar!(u32, UInt32);
scalar!(i64, Int64);
scalar!(u64, UInt64);
scalar!(f32, Float32);
scalar!(f64, Float64);

impl AttrScalar for bool {
    const TYPE: AttrType = AttrType::Bool;
    const LEN: usize = 1;

    fn encode(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = u8::from(self);
        out
    }

    fn decode(src: &[u8]) -> Option<Self> {
        match src {
            [b] => Some(*b != 0),
            _ => None,
        }
    }
}

/// Error log verbosity, lowest value is most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Verbosity {
    Fatal = 0,
    Warning = 1,
    Message = 2,
    Assert = 3,
    Debug = 4,
}

impl Verbosity {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Fatal,
            1 => Self::Warning,
            2 => Self::Message,
            3 => Self::Assert,
            4 => Self::Debug,
            _ => return None,
        })
    }
}

bitflags! {
    /// Rights granted to a user profile.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Rights: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const ADMIN = 1 << 2;
        const EXTENDED = 1 << 30;
        const NOT = 1 << 31;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilsConfig {
    /// Level used for "preference missing, default applied" diagnostics.
    pub missing_pref_verbosity: Verbosity,

    /// This host's address, as matched by `ModuleUtils::is_local`.
    pub local_address: String,
}

impl Default for UtilsConfig {
    fn default() -> Self {
        Self {
            missing_pref_verbosity: Verbosity::Message,
            local_address: "127.0.0.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_bytes_match_type_len() {
        for v in [
            AttrValue::Bool(true),
            AttrValue::Int16(-2),
            AttrValue::UInt32(7),
            AttrValue::Int64(-9),
            AttrValue::Float64(0.5),
            AttrValue::TimeVal(1_000),
        ] {
            assert_eq!(Some(v.to_bytes().len()), v.attr_type().fixed_len(), "{v:?}");
        }
        assert_eq!(AttrValue::CharArray("abc".into()).attr_type().fixed_len(), None);
    }

    #[test]
    fn format_bytes_renders_scalars_and_strings() {
        assert_eq!(AttrType::Int32.format_bytes(&30i32.to_ne_bytes()), "30");
        assert_eq!(AttrType::Bool.format_bytes(&[1]), "true");
        assert_eq!(AttrType::CharArray.format_bytes(b"rtsp"), "rtsp");
        // wrong length falls back to hex
        assert_eq!(AttrType::Int32.format_bytes(&[0xab, 0x01]), "ab01");
    }

    #[test]
    fn scalar_decode_rejects_wrong_len() {
        let enc = 554u32.encode();
        assert_eq!(u32::decode(&enc[..u32::LEN]), Some(554));
        assert_eq!(u32::decode(&enc[..2]), None);
        assert_eq!(bool::decode(&[0]), Some(false));
        assert_eq!(bool::decode(&[1, 0]), None);
    }

    #[test]
    fn verbosity_roundtrips_through_u8() {
        for v in [Verbosity::Fatal, Verbosity::Warning, Verbosity::Message, Verbosity::Assert, Verbosity::Debug] {
            assert_eq!(Verbosity::from_u8(v as u8), Some(v));
        }
        assert_eq!(Verbosity::from_u8(9), None);
    }

    #[test]
    fn illegal_id_sentinel() {
        assert!(AttrId::ILLEGAL.is_illegal());
        assert!(!AttrId(0).is_illegal());
    }
}
