/// RADIUS attribute types used by the accounting client (RFC 2865, 2866, 2869)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1) - RFC 2865
    UserName = 1,
    /// User-Password (2) - RFC 2865
    UserPassword = 2,
    /// NAS-IP-Address (4) - RFC 2865
    NasIpAddress = 4,
    /// NAS-Port (5) - RFC 2865
    NasPort = 5,
    /// Service-Type (6) - RFC 2865
    ServiceType = 6,
    /// Framed-Protocol (7) - RFC 2865
    FramedProtocol = 7,
    /// Framed-IP-Address (8) - RFC 2865
    FramedIpAddress = 8,
    /// Framed-IP-Netmask (9) - RFC 2865
    FramedIpNetmask = 9,
    /// Framed-Route (22) - RFC 2865
    FramedRoute = 22,
    /// Class (25) - RFC 2865
    Class = 25,
    /// Vendor-Specific (26) - RFC 2865
    VendorSpecific = 26,
    /// Session-Timeout (27) - RFC 2865
    SessionTimeout = 27,
    /// Calling-Station-Id (31) - RFC 2865
    CallingStationId = 31,
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier = 32,
    /// Acct-Status-Type (40) - RFC 2866
    AcctStatusType = 40,
    /// Acct-Delay-Time (41) - RFC 2866
    AcctDelayTime = 41,
    /// Acct-Input-Octets (42) - RFC 2866
    AcctInputOctets = 42,
    /// Acct-Output-Octets (43) - RFC 2866
    AcctOutputOctets = 43,
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId = 44,
    /// Acct-Authentic (45) - RFC 2866
    AcctAuthentic = 45,
    /// Acct-Session-Time (46) - RFC 2866
    AcctSessionTime = 46,
    /// Acct-Terminate-Cause (49) - RFC 2866
    AcctTerminateCause = 49,
    /// Acct-Input-Gigawords (52) - RFC 2869
    /// High 32 bits of the 64-bit Acct-Input-Octets counter
    AcctInputGigawords = 52,
    /// Acct-Output-Gigawords (53) - RFC 2869
    /// High 32 bits of the 64-bit Acct-Output-Octets counter
    AcctOutputGigawords = 53,
    /// Event-Timestamp (55) - RFC 2869
    EventTimestamp = 55,
    /// NAS-Port-Type (61) - RFC 2865
    NasPortType = 61,
    /// Acct-Interim-Interval (85) - RFC 2869
    AcctInterimInterval = 85,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            2 => Some(AttributeType::UserPassword),
            4 => Some(AttributeType::NasIpAddress),
            5 => Some(AttributeType::NasPort),
            6 => Some(AttributeType::ServiceType),
            7 => Some(AttributeType::FramedProtocol),
            8 => Some(AttributeType::FramedIpAddress),
            9 => Some(AttributeType::FramedIpNetmask),
            22 => Some(AttributeType::FramedRoute),
            25 => Some(AttributeType::Class),
            26 => Some(AttributeType::VendorSpecific),
            27 => Some(AttributeType::SessionTimeout),
            31 => Some(AttributeType::CallingStationId),
            32 => Some(AttributeType::NasIdentifier),
            40 => Some(AttributeType::AcctStatusType),
            41 => Some(AttributeType::AcctDelayTime),
            42 => Some(AttributeType::AcctInputOctets),
            43 => Some(AttributeType::AcctOutputOctets),
            44 => Some(AttributeType::AcctSessionId),
            45 => Some(AttributeType::AcctAuthentic),
            46 => Some(AttributeType::AcctSessionTime),
            49 => Some(AttributeType::AcctTerminateCause),
            52 => Some(AttributeType::AcctInputGigawords),
            53 => Some(AttributeType::AcctOutputGigawords),
            55 => Some(AttributeType::EventTimestamp),
            61 => Some(AttributeType::NasPortType),
            85 => Some(AttributeType::AcctInterimInterval),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Value class declared for this attribute type
    pub fn value_class(self) -> ValueClass {
        ValueClass::of(self as u8)
    }
}

/// How an attribute value is represented on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// IPv4 address, 4 octets in network order
    Address,
    /// 32-bit unsigned integer (or enumerated value) in network order
    Integer,
    /// User-Password: zero padded to a multiple of 16 octets
    Password,
    /// Vendor-Specific: a pre-shaped vendor id + sub-attribute buffer
    VendorSpecific,
    /// Octets copied verbatim (text, string, IPv6 forms)
    Text,
}

/// Attribute codes carrying an IPv4 address
const ADDRESS_TYPES: &[u8] = &[
    4,  // NAS-IP-Address
    8,  // Framed-IP-Address
    9,  // Framed-IP-Netmask
    14, // Login-IP-Host
];

/// Attribute codes carrying a 32-bit integer or enumeration
const INTEGER_TYPES: &[u8] = &[
    5,  // NAS-Port
    6,  // Service-Type
    7,  // Framed-Protocol
    10, // Framed-Routing
    12, // Framed-MTU
    13, // Framed-Compression
    15, // Login-Service
    16, // Login-TCP-Port
    23, // Framed-IPX-Network
    27, // Session-Timeout
    28, // Idle-Timeout
    29, // Termination-Action
    37, // Framed-AppleTalk-Link
    38, // Framed-AppleTalk-Network
    40, // Acct-Status-Type
    41, // Acct-Delay-Time
    42, // Acct-Input-Octets
    43, // Acct-Output-Octets
    45, // Acct-Authentic
    46, // Acct-Session-Time
    47, // Acct-Input-Packets
    48, // Acct-Output-Packets
    49, // Acct-Terminate-Cause
    51, // Acct-Link-Count
    52, // Acct-Input-Gigawords
    53, // Acct-Output-Gigawords
    55, // Event-Timestamp
    61, // NAS-Port-Type
    62, // Port-Limit
    63, // Login-LAT-Port
    72, // ARAP-Zone-Access
    73, // ARAP-Security
    75, // Password-Retry
    76, // Prompt
    85, // Acct-Interim-Interval
];

const fn build_value_classes() -> [ValueClass; 256] {
    let mut table = [ValueClass::Text; 256];
    let mut i = 0;
    while i < ADDRESS_TYPES.len() {
        table[ADDRESS_TYPES[i] as usize] = ValueClass::Address;
        i += 1;
    }
    let mut i = 0;
    while i < INTEGER_TYPES.len() {
        table[INTEGER_TYPES[i] as usize] = ValueClass::Integer;
        i += 1;
    }
    table[AttributeType::UserPassword as usize] = ValueClass::Password;
    table[AttributeType::VendorSpecific as usize] = ValueClass::VendorSpecific;
    table
}

static VALUE_CLASSES: [ValueClass; 256] = build_value_classes();

impl ValueClass {
    /// Look up the value class for a raw attribute code
    pub fn of(attr_type: u8) -> ValueClass {
        VALUE_CLASSES[attr_type as usize]
    }
}
