//! Component-wise IP address matching.
//!
//! An address is split into exactly [`NUM_COMPONENTS`] groups, either dotted
//! decimal (`10.0.0.1`) or colon separated hextets (`fe80:0:0:1`). A group
//! may be `*`, which matches any group at the same position. Anything else
//! yields an invalid instance that compares unequal to everything, itself
//! included.

use once_cell::sync::OnceCell;

pub const NUM_COMPONENTS: usize = 4;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy)]
pub struct IpComponents<'a> {
    parts: [&'a str; NUM_COMPONENTS],
    valid: bool,
}

impl Default for IpComponents<'_> {
    fn default() -> Self {
        Self { parts: [""; NUM_COMPONENTS], valid: false }
    }
}

impl<'a> IpComponents<'a> {
    /// Parses a textual address. Never fails; check [`IpComponents::valid`].
    pub fn parse(address: &'a str) -> Self {
        let address = address.trim();
        let sep = if address.contains(':') { ':' } else { '.' };

        let mut parts = [""; NUM_COMPONENTS];
        let mut count = 0;
        for group in address.split(sep) {
            if count == NUM_COMPONENTS {
                return Self::default();
            }
            parts[count] = group;
            count += 1;
        }

        if count != NUM_COMPONENTS || !parts.iter().all(|p| component_ok(p, sep)) {
            return Self::default();
        }
        Self { parts, valid: true }
    }

    /// Builds from groups that were already split by the caller.
    pub fn from_parts(groups: &[&'a str]) -> Self {
        let Ok(parts) = <[&'a str; NUM_COMPONENTS]>::try_from(groups) else {
            return Self::default();
        };
        let valid = ['.', ':'].iter().any(|&sep| parts.iter().all(|p| component_ok(p, sep)));
        if !valid {
            return Self::default();
        }
        Self { parts, valid }
    }

    pub fn valid(&self) -> bool { self.valid }

    pub fn component(&self, which: usize) -> Option<&'a str> {
        self.parts.get(which).copied()
    }

    /// True iff both are valid and every position matches (or either side is `*`).
    pub fn equal(&self, other: &IpComponents<'_>) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        self.parts.iter().zip(other.parts.iter()).all(|(a, b)| {
            *a == WILDCARD || *b == WILDCARD || a.as_bytes() == b.as_bytes()
        })
    }

    /// Compares against the process-wide local address.
    pub fn is_local(&self) -> bool {
        self.equal(&local_address().components())
    }

    pub fn is_local_to(&self, local: &LocalAddress) -> bool {
        self.equal(&local.components())
    }
}

impl PartialEq for IpComponents<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

fn component_ok(part: &str, sep: char) -> bool {
    if part == WILDCARD {
        return true;
    }
    match sep {
        '.' => {
            (1..=3).contains(&part.len())
                && part.bytes().all(|b| b.is_ascii_digit())
                && part.parse::<u16>().is_ok_and(|v| v <= 255)
        }
        _ => (1..=4).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_hexdigit()),
    }
}

/// Owned address text for "this host".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAddress {
    text: String,
}

impl LocalAddress {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str { &self.text }

    pub fn components(&self) -> IpComponents<'_> {
        IpComponents::parse(&self.text)
    }
}

impl Default for LocalAddress {
    fn default() -> Self { Self::new("127.0.0.1") }
}

static LOCAL_ADDRESS: OnceCell<LocalAddress> = OnceCell::new();

/// Installs the process-wide local address. Only the first call (or the first
/// read, which freezes the default) wins; later calls return `false`.
pub fn install_local_address(address: impl Into<String>) -> bool {
    LOCAL_ADDRESS.set(LocalAddress::new(address)).is_ok()
}

pub fn local_address() -> &'static LocalAddress {
    LOCAL_ADDRESS.get_or_init(LocalAddress::default)
}
