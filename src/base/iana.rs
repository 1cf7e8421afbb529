//! IANA registry values used by zone data.
//!
//! Only the parameters the signer itself needs are given names; everything
//! else travels through the types as its raw integer value.

use core::fmt;
use core::str::FromStr;

//------------ Rtype ---------------------------------------------------------

/// A resource record type.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rtype(u16);

impl Rtype {
    pub const A: Rtype = Rtype(1);
    pub const NS: Rtype = Rtype(2);
    pub const CNAME: Rtype = Rtype(5);
    pub const SOA: Rtype = Rtype(6);
    pub const PTR: Rtype = Rtype(12);
    pub const MX: Rtype = Rtype(15);
    pub const TXT: Rtype = Rtype(16);
    pub const AAAA: Rtype = Rtype(28);
    pub const SRV: Rtype = Rtype(33);
    pub const DNAME: Rtype = Rtype(39);
    pub const OPT: Rtype = Rtype(41);
    pub const DS: Rtype = Rtype(43);
    pub const RRSIG: Rtype = Rtype(46);
    pub const NSEC: Rtype = Rtype(47);
    pub const DNSKEY: Rtype = Rtype(48);
    pub const NSEC3: Rtype = Rtype(50);
    pub const NSEC3PARAM: Rtype = Rtype(51);
    pub const ANY: Rtype = Rtype(255);

    /// Creates a record type from its IANA number.
    #[must_use]
    pub const fn from_int(value: u16) -> Self {
        Rtype(value)
    }

    /// Returns the IANA number of the record type.
    #[must_use]
    pub const fn to_int(self) -> u16 {
        self.0
    }

    /// Returns whether the type is a glue address type.
    #[must_use]
    pub fn is_address(self) -> bool {
        matches!(self.0, 1 | 28)
    }

    /// Returns whether the type is a Meta-TYPE or QTYPE.
    ///
    /// Such types never appear in zone data and must not be set in type
    /// bitmaps (RFC 5155, section 3.2).
    #[must_use]
    pub fn is_pseudo(self) -> bool {
        matches!(self.0, 41 | 249..=255)
    }

    fn mnemonic(self) -> Option<&'static str> {
        Some(match self.0 {
            1 => "A",
            2 => "NS",
            5 => "CNAME",
            6 => "SOA",
            12 => "PTR",
            15 => "MX",
            16 => "TXT",
            28 => "AAAA",
            33 => "SRV",
            39 => "DNAME",
            41 => "OPT",
            43 => "DS",
            46 => "RRSIG",
            47 => "NSEC",
            48 => "DNSKEY",
            50 => "NSEC3",
            51 => "NSEC3PARAM",
            255 => "ANY",
            _ => return None,
        })
    }
}

impl From<u16> for Rtype {
    fn from(value: u16) -> Self {
        Rtype(value)
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

impl FromStr for Rtype {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(num) = s.strip_prefix("TYPE") {
            return num.parse::<u16>().map(Rtype).map_err(|_| UnknownValue);
        }
        Ok(match s.to_ascii_uppercase().as_str() {
            "A" => Rtype::A,
            "NS" => Rtype::NS,
            "CNAME" => Rtype::CNAME,
            "SOA" => Rtype::SOA,
            "PTR" => Rtype::PTR,
            "MX" => Rtype::MX,
            "TXT" => Rtype::TXT,
            "AAAA" => Rtype::AAAA,
            "SRV" => Rtype::SRV,
            "DNAME" => Rtype::DNAME,
            "DS" => Rtype::DS,
            "RRSIG" => Rtype::RRSIG,
            "NSEC" => Rtype::NSEC,
            "DNSKEY" => Rtype::DNSKEY,
            "NSEC3" => Rtype::NSEC3,
            "NSEC3PARAM" => Rtype::NSEC3PARAM,
            _ => return Err(UnknownValue),
        })
    }
}

//------------ Class ---------------------------------------------------------

/// A DNS class.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Class(u16);

impl Class {
    pub const IN: Class = Class(1);
    pub const CH: Class = Class(3);
    pub const HS: Class = Class(4);

    /// Creates a class from its IANA number.
    #[must_use]
    pub const fn from_int(value: u16) -> Self {
        Class(value)
    }

    /// Returns the IANA number of the class.
    #[must_use]
    pub const fn to_int(self) -> u16 {
        self.0
    }
}

impl Default for Class {
    fn default() -> Self {
        Class::IN
    }
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Class(value)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            1 => f.write_str("IN"),
            3 => f.write_str("CH"),
            4 => f.write_str("HS"),
            value => write!(f, "CLASS{value}"),
        }
    }
}

impl FromStr for Class {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(num) = s.strip_prefix("CLASS") {
            return num.parse::<u16>().map(Class).map_err(|_| UnknownValue);
        }
        Ok(match s.to_ascii_uppercase().as_str() {
            "IN" => Class::IN,
            "CH" => Class::CH,
            "HS" => Class::HS,
            _ => return Err(UnknownValue),
        })
    }
}

//------------ SecAlg --------------------------------------------------------

/// A DNSSEC signing algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SecAlg(u8);

impl SecAlg {
    pub const RSASHA1: SecAlg = SecAlg(5);
    pub const RSASHA256: SecAlg = SecAlg(8);
    pub const RSASHA512: SecAlg = SecAlg(10);
    pub const ECDSAP256SHA256: SecAlg = SecAlg(13);
    pub const ECDSAP384SHA384: SecAlg = SecAlg(14);
    pub const ED25519: SecAlg = SecAlg(15);

    /// Creates an algorithm value from its IANA number.
    #[must_use]
    pub const fn from_int(value: u8) -> Self {
        SecAlg(value)
    }

    /// Returns the IANA number of the algorithm.
    #[must_use]
    pub const fn to_int(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SecAlg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            5 => f.write_str("RSASHA1"),
            8 => f.write_str("RSASHA256"),
            10 => f.write_str("RSASHA512"),
            13 => f.write_str("ECDSAP256SHA256"),
            14 => f.write_str("ECDSAP384SHA384"),
            15 => f.write_str("ED25519"),
            value => write!(f, "SECALG{value}"),
        }
    }
}

//------------ Nsec3HashAlg --------------------------------------------------

/// An NSEC3 hash algorithm.
///
/// Only SHA-1 has ever been assigned (RFC 5155, section 11).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nsec3HashAlg(u8);

impl Nsec3HashAlg {
    pub const SHA1: Nsec3HashAlg = Nsec3HashAlg(1);

    /// Creates an algorithm value from its IANA number.
    #[must_use]
    pub const fn from_int(value: u8) -> Self {
        Nsec3HashAlg(value)
    }

    /// Returns the IANA number of the algorithm.
    #[must_use]
    pub const fn to_int(self) -> u8 {
        self.0
    }
}

impl Default for Nsec3HashAlg {
    fn default() -> Self {
        Nsec3HashAlg::SHA1
    }
}

impl fmt::Display for Nsec3HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

//------------ UnknownValue --------------------------------------------------

/// A mnemonic could not be mapped to a registry value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownValue;

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown mnemonic")
    }
}

impl std::error::Error for UnknownValue {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rtype_mnemonics() {
        assert_eq!("NSEC3PARAM".parse::<Rtype>(), Ok(Rtype::NSEC3PARAM));
        assert_eq!("nsec".parse::<Rtype>(), Ok(Rtype::NSEC));
        assert_eq!("TYPE1234".parse::<Rtype>(), Ok(Rtype::from_int(1234)));
        assert_eq!(format!("{}", Rtype::SOA), "SOA");
        assert_eq!(format!("{}", Rtype::from_int(4711)), "TYPE4711");
    }

    #[test]
    fn pseudo_types() {
        assert!(Rtype::OPT.is_pseudo());
        assert!(Rtype::ANY.is_pseudo());
        assert!(!Rtype::NSEC3.is_pseudo());
    }
}
