//! RADIUS Accounting status codes (RFC 2866) and Gigawords counters (RFC 2869)
//!
//! # Example
//!
//! ```rust
//! use radius_proto::accounting::{compose_octets, split_octets, AcctStatusType};
//!
//! assert_eq!(AcctStatusType::InterimUpdate.as_u32(), 3);
//!
//! let (giga, low) = split_octets(5_000_000_000);
//! assert_eq!((giga, low), (1, 705_032_704));
//! assert_eq!(compose_octets(giga, low), 5_000_000_000);
//! ```

/// Accounting Status-Type values (RFC 2866 Section 5.1)
///
/// Indicates the type of accounting packet being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcctStatusType {
    /// Start (1) - Session has begun
    Start = 1,
    /// Stop (2) - Session has ended
    Stop = 2,
    /// Interim-Update (3) - Periodic update during session
    InterimUpdate = 3,
}

impl AcctStatusType {
    /// Convert from u32 value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AcctStatusType::Start),
            2 => Some(AcctStatusType::Stop),
            3 => Some(AcctStatusType::InterimUpdate),
            _ => None,
        }
    }

    /// Convert to u32 value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Split a 64-bit octet counter into `(gigawords, low 32 bits)`
pub fn split_octets(total: u64) -> (u32, u32) {
    ((total >> 32) as u32, (total & 0xFFFF_FFFF) as u32)
}

/// Recombine a Gigawords counter with its low 32-bit octet counter
pub fn compose_octets(gigawords: u32, octets: u32) -> u64 {
    (u64::from(gigawords) << 32) | u64::from(octets)
}
