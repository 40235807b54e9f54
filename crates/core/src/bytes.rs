//! Opaque byte-string primitives.
//!
//! Keys and values are arbitrary byte sequences with 16-bit lengths (§6).
//! `KeyBytes` and `ValueBytes` are thin `Vec<u8>` wrappers that enforce that
//! ceiling at construction time, so every other module can assume a valid
//! length without re-checking it.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// The largest key or value length the engine accepts (`u16::MAX`).
pub const MAX_LEN: usize = u16::MAX as usize;

/// An opaque key, at most [`MAX_LEN`] bytes.
///
/// Ordering follows §4.2's compare function: `memcmp` over the shorter of
/// the two lengths, with the shorter key winning ties at equal prefix. This
/// happens to coincide with `Vec<u8>`'s derived `Ord`, but is implemented
/// explicitly here so the ordering is a named, testable contract rather than
/// an implementation detail borrowed from `Vec`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyBytes(Vec<u8>);

impl KeyBytes {
    /// Build a key from raw bytes, rejecting anything over [`MAX_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_LEN {
            return Err(Error::TooLarge {
                len: bytes.len(),
                max: MAX_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Borrow the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Consume the key, returning the underlying bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Number of bytes in the key.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the key is the empty byte string (a valid key, per §6).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialOrd for KeyBytes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyBytes {
    fn cmp(&self, other: &Self) -> Ordering {
        let shared = self.0.len().min(other.0.len());
        match self.0[..shared].cmp(&other.0[..shared]) {
            Ordering::Equal => self.0.len().cmp(&other.0.len()),
            ord => ord,
        }
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBytes({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// An opaque value, at most [`MAX_LEN`] bytes.
///
/// A `ValueBytes` always denotes a present value; the tombstone case (§3,
/// "a version is a zero-length value denoting a delete") is represented one
/// layer up as `Option<ValueBytes>` rather than folded into this type, so
/// construction can never silently coerce an empty value into a delete.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValueBytes(Vec<u8>);

impl ValueBytes {
    /// Build a value from raw bytes, rejecting anything over [`MAX_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_LEN {
            return Err(Error::TooLarge {
                len: bytes.len(),
                max: MAX_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Borrow the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the value is the empty byte string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy up to `buf.len()` bytes into `buf`, returning the number copied.
    ///
    /// This is the truncation behavior §6 requires of `txn_lookup`: the
    /// caller's buffer bounds the copy, and the returned length reflects the
    /// truncated count, not the value's original length.
    pub fn copy_into(&self, buf: &mut [u8]) -> usize {
        let n = self.0.len().min(buf.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        n
    }
}
