//! Vendor-Specific attribute (RFC 2865 Section 5.26)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |  Length       |            Vendor-Id
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!      Vendor-Id (cont)           | Vendor type   | Vendor length |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Attribute-Specific...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use super::{Attribute, AttributeType};
use crate::packet::PacketError;

/// A single vendor sub-attribute carried inside a Vendor-Specific attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecific {
    /// IANA private enterprise number
    pub vendor_id: u32,
    /// Vendor-defined sub-attribute type
    pub vendor_type: u8,
    /// Sub-attribute value
    pub value: Vec<u8>,
}

impl VendorSpecific {
    /// Vendor id (4) + vendor type (1) + vendor length (1)
    pub const HEADER_LENGTH: usize = 6;

    pub fn new(vendor_id: u32, vendor_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        let vsa = VendorSpecific {
            vendor_id,
            vendor_type,
            value,
        };
        if vsa.shaped_length() > Attribute::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor-Specific value too long: {} bytes",
                vsa.value.len()
            )));
        }
        Ok(vsa)
    }

    /// Create a vendor sub-attribute holding a 32-bit big-endian integer
    pub fn integer(vendor_id: u32, vendor_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(vendor_id, vendor_type, value.to_be_bytes().to_vec())
    }

    /// Sub-attribute length octet: vendor type + vendor length + value
    pub fn sub_length(&self) -> usize {
        2 + self.value.len()
    }

    /// Length of the shaped buffer (vendor id + sub-attribute)
    pub fn shaped_length(&self) -> usize {
        4 + self.sub_length()
    }

    /// Shape into `vendor id | type | length | value`
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.shaped_length());
        buffer.extend_from_slice(&self.vendor_id.to_be_bytes());
        buffer.push(self.vendor_type);
        buffer.push(self.sub_length() as u8);
        buffer.extend_from_slice(&self.value);
        buffer
    }

    /// Decode a shaped buffer (the value of a Vendor-Specific attribute)
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let shaped = Self::shaped_prefix(data)?;
        let vendor_id = u32::from_be_bytes([shaped[0], shaped[1], shaped[2], shaped[3]]);
        Ok(VendorSpecific {
            vendor_id,
            vendor_type: shaped[4],
            value: shaped[Self::HEADER_LENGTH..].to_vec(),
        })
    }

    /// The part of `data` covered by its embedded sub-attribute length marker
    pub(crate) fn shaped_prefix(data: &[u8]) -> Result<&[u8], PacketError> {
        if data.len() < Self::HEADER_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor-Specific data too short: {} bytes",
                data.len()
            )));
        }
        let sub_length = data[5] as usize;
        if sub_length < 2 || data.len() < sub_length + 4 {
            return Err(PacketError::AttributeError(format!(
                "Invalid vendor sub-attribute length {} for {} bytes of data",
                sub_length,
                data.len()
            )));
        }
        Ok(&data[..sub_length + 4])
    }

    /// Wrap into a top-level Vendor-Specific attribute
    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        Attribute::new(AttributeType::VendorSpecific as u8, self.encode())
    }

    /// Unwrap a top-level Vendor-Specific attribute
    pub fn from_attribute(attr: &Attribute) -> Result<Self, PacketError> {
        if attr.attr_type != AttributeType::VendorSpecific as u8 {
            return Err(PacketError::AttributeError(format!(
                "Attribute {} is not Vendor-Specific",
                attr.attr_type
            )));
        }
        Self::decode(&attr.value)
    }

    pub fn as_integer(&self) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().map_err(|_| {
            PacketError::AttributeError(format!(
                "Expected 4 bytes for vendor integer, got {}",
                self.value.len()
            ))
        })?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn to_ip_string(&self) -> String {
        match self.value.get(..4) {
            Some(o) => format!("{}.{}.{}.{}", o[0], o[1], o[2], o[3]),
            None => String::new(),
        }
    }

    pub fn to_display_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}
