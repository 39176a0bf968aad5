//! Four-character codes used to identify plugin components.

use crate::error::FourCcError;
use std::fmt;
use std::str::FromStr;

/// Pack ASCII bytes big-endian: `result = (result << 8) + byte`, left to right.
///
/// Longer inputs keep only their last four bytes.
pub const fn pack_fourcc(code: &[u8]) -> u32 {
    let mut result: u32 = 0;
    let mut i = 0;
    while i < code.len() {
        result = (result << 8) + code[i] as u32;
        i += 1;
    }
    result
}

/// Packed component identifier (`aumu`, `Pt8q`, ...). Zero is the wildcard.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCharCode(u32);

impl FourCharCode {
    pub const WILDCARD: FourCharCode = FourCharCode(0);

    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(pack_fourcc(bytes))
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_wildcard(&self) -> bool {
        self.0 == 0
    }

    pub const fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl FromStr for FourCharCode {
    type Err = FourCcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() {
            return Err(FourCcError::NonAscii(s.to_string()));
        }
        if s.len() != 4 {
            return Err(FourCcError::InvalidLength {
                code: s.to_string(),
                len: s.len(),
            });
        }
        Ok(Self(pack_fourcc(s.as_bytes())))
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            bytes.iter().try_for_each(|&b| write!(f, "{}", b as char))
        } else {
            write!(f, "????")
        }
    }
}

impl fmt::Debug for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCharCode({:?} = {:#010x})", self.to_string(), self.0)
    }
}
