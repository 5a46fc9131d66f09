use std::time::SystemTime;

use x509_cert::Certificate;

use crate::error::MalformedQuote;

pub mod crypto;
pub mod hash;

pub trait Expireable {
    fn valid_at(&self, timestamp: SystemTime) -> bool;
}

impl Expireable for Certificate {
    /// Validate a single certificate not_before/not_after
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        let nb = self.tbs_certificate.validity.not_before.to_system_time();
        let na = self.tbs_certificate.validity.not_after.to_system_time();
        !(timestamp < nb || na < timestamp)
    }
}

/// Removes `std::mem::size_of<T>()` bytes from the front of `bytes` and returns it as a `T`.
///
/// Leaves `bytes` unchanged and reports `field` if it isn't long enough.
pub fn read_from_bytes<T: zerocopy::FromBytes>(
    bytes: &mut &[u8],
    field: &'static str,
) -> Result<T, MalformedQuote> {
    let size = std::mem::size_of::<T>();
    let front = T::read_from_prefix(bytes).ok_or(MalformedQuote::Truncated {
        field,
        expected: size,
        actual: bytes.len(),
    })?;
    *bytes = &bytes[size..];
    Ok(front)
}

/// Removes a slice of `size` from the front of `bytes` and returns it.
pub fn read_bytes<'a>(
    bytes: &mut &'a [u8],
    size: usize,
    field: &'static str,
) -> Result<&'a [u8], MalformedQuote> {
    if bytes.len() < size {
        return Err(MalformedQuote::LengthMismatch {
            field,
            declared: size,
            remaining: bytes.len(),
        });
    }
    let (front, rest) = bytes.split_at(size);
    *bytes = rest;
    Ok(front)
}

/// Takes the rest of `bytes`, which must be exactly `declared` long.
///
/// Used for length-prefixed blocks that close their enclosing structure.
pub fn read_remaining<'a>(
    bytes: &mut &'a [u8],
    declared: usize,
    field: &'static str,
) -> Result<&'a [u8], MalformedQuote> {
    if bytes.len() != declared {
        return Err(MalformedQuote::LengthMismatch {
            field,
            declared,
            remaining: bytes.len(),
        });
    }
    read_bytes(bytes, declared, field)
}
