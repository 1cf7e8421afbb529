//! Resource records and their data.
//!
//! The engine stores record data in structured form for the types whose
//! content it needs to look inside of — SOA for the serial, NS/CNAME/DNAME
//! for structural checks, and the DNSSEC types it synthesises itself — and
//! as opaque octets for everything else. All variants know how to append
//! their canonical wire form to a buffer, which is all that signing needs.

pub use self::dnssec::{
    Nsec, ProtoRrsig, Rrsig, RtypeBitmap, RtypeBitmapBuilder, Timestamp,
};
pub use self::nsec3::{Nsec3, Nsec3Salt, Nsec3param, OwnerHash};

pub mod dnssec;
pub mod nsec3;

use core::cmp::Ordering;
use core::fmt;

use bytes::Bytes;

use crate::base::cmp::CanonicalOrd;
use crate::base::iana::{Class, Rtype};
use crate::base::name::Name;
use crate::base::serial::Serial;
use crate::base::Ttl;
use crate::utils::base16;

//------------ Record --------------------------------------------------------

/// A resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    owner: Name,
    class: Class,
    ttl: Ttl,
    data: RecordData,
}

impl Record {
    /// Creates a record from its parts.
    #[must_use]
    pub fn new(owner: Name, class: Class, ttl: Ttl, data: RecordData) -> Self {
        Record {
            owner,
            class,
            ttl,
            data,
        }
    }

    /// Returns the owner name.
    #[must_use]
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// Returns the class.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the TTL.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Returns the record type.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.data.rtype()
    }

    /// Returns a reference to the record data.
    #[must_use]
    pub fn data(&self) -> &RecordData {
        &self.data
    }

    /// Returns a mutable reference to the record data.
    pub fn data_mut(&mut self) -> &mut RecordData {
        &mut self.data
    }

    /// Appends the canonical wire form of the whole record.
    ///
    /// That is owner, type, class, TTL, and length-prefixed record data,
    /// with embedded names lowercased (RFC 4034, section 6).
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        self.owner.compose_canonical(target);
        target.extend_from_slice(&self.rtype().to_int().to_be_bytes());
        target.extend_from_slice(&self.class.to_int().to_be_bytes());
        target.extend_from_slice(&self.ttl.as_secs().to_be_bytes());
        let len_pos = target.len();
        target.extend_from_slice(&[0, 0]);
        self.data.compose_canonical(target);
        let rdlen = (target.len() - len_pos - 2) as u16;
        target[len_pos..len_pos + 2].copy_from_slice(&rdlen.to_be_bytes());
    }
}

impl CanonicalOrd for Record {
    /// Orders records by class, canonical owner, type, canonical data.
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        match self.class.cmp(&other.class) {
            Ordering::Equal => {}
            res => return res,
        }
        match self.owner.canonical_cmp(&other.owner) {
            Ordering::Equal => {}
            res => return res,
        }
        match self.rtype().cmp(&other.rtype()) {
            Ordering::Equal => {}
            res => return res,
        }
        self.data.canonical_cmp(&other.data)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.owner,
            self.ttl,
            self.class,
            self.rtype(),
            self.data
        )
    }
}

//------------ RecordData ----------------------------------------------------

/// The data of a resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordData {
    Soa(Soa),
    Ns(Ns),
    Cname(Cname),
    Dname(Dname),
    Rrsig(Rrsig),
    Nsec(Nsec),
    Nsec3(Nsec3),
    Nsec3param(Nsec3param),
    Generic(Generic),
}

impl RecordData {
    /// Returns the record type of the data.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        match self {
            RecordData::Soa(_) => Rtype::SOA,
            RecordData::Ns(_) => Rtype::NS,
            RecordData::Cname(_) => Rtype::CNAME,
            RecordData::Dname(_) => Rtype::DNAME,
            RecordData::Rrsig(_) => Rtype::RRSIG,
            RecordData::Nsec(_) => Rtype::NSEC,
            RecordData::Nsec3(_) => Rtype::NSEC3,
            RecordData::Nsec3param(_) => Rtype::NSEC3PARAM,
            RecordData::Generic(data) => data.rtype,
        }
    }

    /// Appends the canonical wire form of the data.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        match self {
            RecordData::Soa(data) => data.compose_canonical(target),
            RecordData::Ns(data) => data.nsdname.compose_canonical(target),
            RecordData::Cname(data) => data.cname.compose_canonical(target),
            RecordData::Dname(data) => data.target.compose_canonical(target),
            RecordData::Rrsig(data) => data.compose_canonical(target),
            RecordData::Nsec(data) => data.compose_canonical(target),
            RecordData::Nsec3(data) => data.compose_canonical(target),
            RecordData::Nsec3param(data) => data.compose(target),
            RecordData::Generic(data) => {
                target.extend_from_slice(data.rdata.as_ref())
            }
        }
    }
}

impl CanonicalOrd for RecordData {
    /// Orders record data by its canonical wire form.
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        let mut left = Vec::new();
        let mut right = Vec::new();
        self.compose_canonical(&mut left);
        other.compose_canonical(&mut right);
        left.cmp(&right)
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordData::Soa(data) => data.fmt(f),
            RecordData::Ns(data) => data.nsdname.fmt(f),
            RecordData::Cname(data) => data.cname.fmt(f),
            RecordData::Dname(data) => data.target.fmt(f),
            RecordData::Rrsig(data) => data.fmt(f),
            RecordData::Nsec(data) => data.fmt(f),
            RecordData::Nsec3(data) => data.fmt(f),
            RecordData::Nsec3param(data) => data.fmt(f),
            RecordData::Generic(data) => data.fmt(f),
        }
    }
}

//--- From

impl From<Soa> for RecordData {
    fn from(data: Soa) -> Self {
        RecordData::Soa(data)
    }
}

impl From<Rrsig> for RecordData {
    fn from(data: Rrsig) -> Self {
        RecordData::Rrsig(data)
    }
}

impl From<Nsec> for RecordData {
    fn from(data: Nsec) -> Self {
        RecordData::Nsec(data)
    }
}

impl From<Nsec3> for RecordData {
    fn from(data: Nsec3) -> Self {
        RecordData::Nsec3(data)
    }
}

impl From<Nsec3param> for RecordData {
    fn from(data: Nsec3param) -> Self {
        RecordData::Nsec3param(data)
    }
}

//------------ Soa -----------------------------------------------------------

/// SOA record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: Serial,
    pub refresh: Ttl,
    pub retry: Ttl,
    pub expire: Ttl,
    pub minimum: Ttl,
}

impl Soa {
    fn compose_canonical(&self, target: &mut Vec<u8>) {
        self.mname.compose_canonical(target);
        self.rname.compose_canonical(target);
        target.extend_from_slice(&self.serial.into_int().to_be_bytes());
        target.extend_from_slice(&self.refresh.as_secs().to_be_bytes());
        target.extend_from_slice(&self.retry.as_secs().to_be_bytes());
        target.extend_from_slice(&self.expire.as_secs().to_be_bytes());
        target.extend_from_slice(&self.minimum.as_secs().to_be_bytes());
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}

//------------ Ns, Cname, Dname ----------------------------------------------

/// NS record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ns {
    pub nsdname: Name,
}

/// CNAME record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cname {
    pub cname: Name,
}

/// DNAME record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dname {
    pub target: Name,
}

//------------ Generic -------------------------------------------------------

/// Record data of a type the engine does not look inside of.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Generic {
    pub rtype: Rtype,
    pub rdata: Bytes,
}

impl fmt::Display for Generic {
    /// Formats the data in the RFC 3597 unknown-data notation.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\\# {} {}",
            self.rdata.len(),
            base16::encode_string(self.rdata.as_ref())
        )
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn canonical_record_form() {
        let record = Record::new(
            name("WWW.Example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Ns(Ns {
                nsdname: name("NS1.example.com"),
            }),
        );
        let mut buf = Vec::new();
        record.compose_canonical(&mut buf);
        let mut expected = Vec::new();
        expected.extend_from_slice(b"\x03www\x07example\x03com\x00");
        expected.extend_from_slice(&2u16.to_be_bytes()); // NS
        expected.extend_from_slice(&1u16.to_be_bytes()); // IN
        expected.extend_from_slice(&3600u32.to_be_bytes());
        expected.extend_from_slice(&17u16.to_be_bytes());
        expected.extend_from_slice(b"\x03ns1\x07example\x03com\x00");
        assert_eq!(buf, expected);
    }

    #[test]
    fn rdata_order_is_canonical_wire_order() {
        let a = RecordData::Generic(Generic {
            rtype: Rtype::A,
            rdata: Bytes::from_static(&[192, 0, 2, 1]),
        });
        let b = RecordData::Generic(Generic {
            rtype: Rtype::A,
            rdata: Bytes::from_static(&[192, 0, 2, 10]),
        });
        assert_eq!(a.canonical_cmp(&b), Ordering::Less);
    }
}
