//! RADIUS Protocol Implementation
//!
//! Wire codec for the accounting side of RADIUS (RFC 2865, 2866, 2869).
//!
//! # Features
//!
//! - Packet encoding and decoding
//! - Attribute values shaped by a per-type value class table (address,
//!   integer, password, vendor-specific, text)
//! - Vendor-Specific sub-attributes
//! - MD5-chained User-Password obfuscation
//! - Accounting Request/Response Authenticator calculation
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Attribute, AttributeType, Code, Packet};
//! use radius_proto::auth::calculate_accounting_request_authenticator;
//!
//! let mut packet = Packet::new(Code::AccountingRequest, 1, [0u8; 16]);
//! packet.add_attribute(
//!     Attribute::encode_value(AttributeType::UserName as u8, b"alice").unwrap()
//! );
//! packet.add_attribute(
//!     Attribute::encode_value(AttributeType::FramedIpAddress as u8, b"10.8.0.6").unwrap()
//! );
//! packet.add_attribute(
//!     Attribute::encode_value(AttributeType::AcctStatusType as u8, b"1").unwrap()
//! );
//!
//! packet.authenticator = calculate_accounting_request_authenticator(&packet, b"secret").unwrap();
//! let bytes = packet.encode().unwrap();
//! assert_eq!(bytes.len(), packet.length());
//! ```

pub mod accounting;
pub mod attributes;
pub mod auth;
pub mod packet;

pub use accounting::{compose_octets, split_octets, AcctStatusType};
pub use attributes::{Attribute, AttributeType, ValueClass, VendorSpecific};
pub use auth::{
    calculate_accounting_request_authenticator, calculate_response_authenticator,
    deobfuscate_password, generate_request_authenticator, obfuscate_password,
    verify_response_authenticator,
};
pub use packet::{Code, Packet, PacketError};
