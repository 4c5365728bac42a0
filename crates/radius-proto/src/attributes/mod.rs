//! RADIUS attributes: the generic TLV, the per-type value classes and the
//! Vendor-Specific sub-attribute.

mod attribute;
mod types;
mod vendor;

pub use attribute::Attribute;
pub use types::{AttributeType, ValueClass};
pub use vendor::VendorSpecific;
