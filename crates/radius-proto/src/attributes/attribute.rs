use super::types::ValueClass;
use super::vendor::VendorSpecific;
use crate::auth::pad_password;
use crate::packet::PacketError;
use std::net::Ipv4Addr;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The length octet is not stored; it is always `2 + value.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes), already in wire representation
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length (253 bytes)
    pub const MAX_VALUE_LENGTH: usize = 253;

    /// Wrap an already-shaped value
    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute {} value too long: {} bytes (max {})",
                attr_type,
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Encode a textual value according to the value class of `attr_type`
    ///
    /// - address types parse a dotted quad into 4 octets
    /// - integer types parse a decimal into a 4-octet big-endian integer
    /// - User-Password is zero padded to the next multiple of 16 (minimum 16);
    ///   obfuscation is a separate step, see [`crate::auth::obfuscate_password`]
    /// - Vendor-Specific takes a pre-shaped buffer whose sixth octet holds the
    ///   sub-attribute length
    /// - everything else is copied verbatim
    pub fn encode_value(attr_type: u8, value: &[u8]) -> Result<Self, PacketError> {
        let shaped = match ValueClass::of(attr_type) {
            ValueClass::Address => parse_ipv4(value)?.octets().to_vec(),
            ValueClass::Integer => parse_integer(value)?.to_be_bytes().to_vec(),
            ValueClass::Password => pad_password(value),
            ValueClass::VendorSpecific => VendorSpecific::shaped_prefix(value)?.to_vec(),
            ValueClass::Text => value.to_vec(),
        };
        Self::new(attr_type, shaped)
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create an integer attribute (32-bit big-endian)
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Append the wire form of this attribute to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Encoded attribute too long: {} bytes",
                length
            )));
        }
        buffer.push(self.attr_type);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Decode attribute from bytes
    ///
    /// Only the header is checked; the value is not validated against the
    /// declared type.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let [attr_type, length, ..] = *data else {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        };
        let length = length as usize;

        if length < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }

        if data.len() < length {
            return Err(PacketError::AttributeError(format!(
                "Insufficient data for attribute: expected {}, got {}",
                length,
                data.len()
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[Self::MIN_LENGTH..length].to_vec(),
        })
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    /// Interpret the value as a 32-bit big-endian integer
    pub fn as_integer(&self) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().map_err(|_| {
            PacketError::AttributeError(format!(
                "Expected 4 bytes for integer, got {}",
                self.value.len()
            ))
        })?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Format the value as a dotted quad, or an empty string when the value is
    /// shorter than 4 octets
    pub fn to_ip_string(&self) -> String {
        match self.value.get(..4) {
            Some(octets) => format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]),
            None => String::new(),
        }
    }

    /// The raw value as text; empty when the attribute carries no value
    pub fn to_display_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

fn parse_ipv4(value: &[u8]) -> Result<Ipv4Addr, PacketError> {
    let text = std::str::from_utf8(value)
        .map_err(|_| PacketError::BadAddress(String::from_utf8_lossy(value).into_owned()))?;
    text.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| PacketError::BadAddress(text.to_string()))
}

fn parse_integer(value: &[u8]) -> Result<u32, PacketError> {
    let text = std::str::from_utf8(value)
        .map_err(|_| PacketError::BadInteger(String::from_utf8_lossy(value).into_owned()))?;
    text.trim()
        .parse::<u32>()
        .map_err(|_| PacketError::BadInteger(text.to_string()))
}
