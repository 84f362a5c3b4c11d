//! Wire-value enums for the slice of the DNS type/class space this crate touches.

/// Response codes. Only `NoError` and `ServerFailure` are ever produced locally;
/// the rest exist so an upstream-forwarded rcode round-trips through `Rcode::from`.
pub struct Rcode;

impl Rcode {
    pub const NO_ERROR: u8 = 0;
    pub const FORMAT_ERROR: u8 = 1;
    pub const SERVER_FAILURE: u8 = 2;
    pub const NAME_ERROR: u8 = 3;
    pub const NOT_IMPLEMENTED: u8 = 4;
    pub const REFUSED: u8 = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    ANY,
    Other(u16),
}

impl From<u16> for ResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => ResourceType::A,
            2 => ResourceType::NS,
            5 => ResourceType::CNAME,
            6 => ResourceType::SOA,
            12 => ResourceType::PTR,
            15 => ResourceType::MX,
            16 => ResourceType::TXT,
            28 => ResourceType::AAAA,
            33 => ResourceType::SRV,
            41 => ResourceType::OPT,
            255 => ResourceType::ANY,
            other => ResourceType::Other(other),
        }
    }
}

impl From<ResourceType> for u16 {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::A => 1,
            ResourceType::NS => 2,
            ResourceType::CNAME => 5,
            ResourceType::SOA => 6,
            ResourceType::PTR => 12,
            ResourceType::MX => 15,
            ResourceType::TXT => 16,
            ResourceType::AAAA => 28,
            ResourceType::SRV => 33,
            ResourceType::OPT => 41,
            ResourceType::ANY => 255,
            ResourceType::Other(other) => other,
        }
    }
}

impl Default for ResourceType {
    fn default() -> Self {
        ResourceType::Other(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    IN,
    CH,
    HS,
    ANY,
    Other(u16),
}

impl From<u16> for ResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => ResourceClass::IN,
            3 => ResourceClass::CH,
            4 => ResourceClass::HS,
            255 => ResourceClass::ANY,
            other => ResourceClass::Other(other),
        }
    }
}

impl From<ResourceClass> for u16 {
    fn from(value: ResourceClass) -> Self {
        match value {
            ResourceClass::IN => 1,
            ResourceClass::CH => 3,
            ResourceClass::HS => 4,
            ResourceClass::ANY => 255,
            ResourceClass::Other(other) => other,
        }
    }
}

impl Default for ResourceClass {
    fn default() -> Self {
        ResourceClass::IN
    }
}
