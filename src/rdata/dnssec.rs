//! Record data for the DNSSEC-defined record types.
//!
//! RRSIG and NSEC record data, the type bitmap shared by NSEC and NSEC3,
//! and the timestamps RRSIG uses.

use core::fmt;

use bytes::Bytes;
use chrono::{TimeZone, Utc};

use crate::base::iana::{Rtype, SecAlg};
use crate::base::name::Name;
use crate::base::Ttl;
use crate::utils::base64;

//------------ Timestamp -----------------------------------------------------

/// The inception or expiration time of a signature.
///
/// Timestamps are 32 bit values counting seconds since the Unix epoch.
/// Like serials they are to be compared in RFC 1982 fashion, but the engine
/// only ever formats and carries them, so plain storage suffices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Returns a timestamp for the current time.
    #[must_use]
    pub fn now() -> Self {
        Timestamp(crate::base::Serial::now().into_int())
    }

    /// Returns the timestamp as a raw integer.
    #[must_use]
    pub fn into_int(self) -> u32 {
        self.0
    }

    /// Returns the timestamp shifted by a signed number of seconds.
    #[must_use]
    pub fn offset_by(self, secs: i64) -> Self {
        Timestamp(self.0.wrapping_add(secs as u32))
    }
}

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Timestamp(value)
    }
}

impl fmt::Display for Timestamp {
    /// Formats the timestamp in the RRSIG `YYYYMMDDHHmmSS` notation.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Utc.timestamp_opt(i64::from(self.0), 0).single() {
            Some(time) => write!(f, "{}", time.format("%Y%m%d%H%M%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

//------------ Rrsig ---------------------------------------------------------

/// RRSIG record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrsig {
    pub type_covered: Rtype,
    pub algorithm: SecAlg,
    pub labels: u8,
    pub original_ttl: Ttl,
    pub expiration: Timestamp,
    pub inception: Timestamp,
    pub key_tag: u16,
    pub signer_name: Name,
    pub signature: Bytes,
}

impl Rrsig {
    /// Appends the canonical wire form of the data.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        self.compose_head(target);
        target.extend_from_slice(self.signature.as_ref());
    }

    fn compose_head(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.type_covered.to_int().to_be_bytes());
        target.push(self.algorithm.to_int());
        target.push(self.labels);
        target
            .extend_from_slice(&self.original_ttl.as_secs().to_be_bytes());
        target.extend_from_slice(&self.expiration.into_int().to_be_bytes());
        target.extend_from_slice(&self.inception.into_int().to_be_bytes());
        target.extend_from_slice(&self.key_tag.to_be_bytes());
        self.signer_name.compose_canonical(target);
    }
}

impl fmt::Display for Rrsig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm.to_int(),
            self.labels,
            self.original_ttl,
            self.expiration,
            self.inception,
            self.key_tag,
            self.signer_name,
            base64::encode_string(self.signature.as_ref())
        )
    }
}

//------------ ProtoRrsig ----------------------------------------------------

/// An RRSIG without its signature.
///
/// The data to be signed starts with the RRSIG RDATA with the signature
/// field excluded (RFC 4034, section 3.1.8.1). This type holds exactly
/// those fields, composes them, and turns into a full [`Rrsig`] once the
/// signature octets exist.
#[derive(Clone, Debug)]
pub struct ProtoRrsig {
    pub type_covered: Rtype,
    pub algorithm: SecAlg,
    pub labels: u8,
    pub original_ttl: Ttl,
    pub expiration: Timestamp,
    pub inception: Timestamp,
    pub key_tag: u16,
    pub signer_name: Name,
}

impl ProtoRrsig {
    /// Appends the canonical wire form of the signature-less RDATA.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        self.clone().into_rrsig(Bytes::new()).compose_head(target);
    }

    /// Attaches the signature and returns the full record data.
    #[must_use]
    pub fn into_rrsig(self, signature: Bytes) -> Rrsig {
        Rrsig {
            type_covered: self.type_covered,
            algorithm: self.algorithm,
            labels: self.labels,
            original_ttl: self.original_ttl,
            expiration: self.expiration,
            inception: self.inception,
            key_tag: self.key_tag,
            signer_name: self.signer_name,
            signature,
        }
    }
}

//------------ Nsec ----------------------------------------------------------

/// NSEC record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Nsec {
    pub next_name: Name,
    pub types: RtypeBitmap,
}

impl Nsec {
    /// Appends the canonical wire form of the data.
    ///
    /// Per RFC 6840, section 5.1, the next owner name is *not* lowercased.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        self.next_name.compose(target);
        self.types.compose(target);
    }
}

impl fmt::Display for Nsec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.next_name, self.types)
    }
}

//------------ RtypeBitmap ---------------------------------------------------

/// The type bitmap of NSEC and NSEC3 records.
///
/// Stored in wire format: a sequence of `(window, length, octets)` blocks
/// as defined in RFC 4034, section 4.1.2.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RtypeBitmap {
    data: Bytes,
}

impl RtypeBitmap {
    /// Returns a builder for a bitmap.
    #[must_use]
    pub fn builder() -> RtypeBitmapBuilder {
        RtypeBitmapBuilder::new()
    }

    /// Returns whether the bitmap contains no types at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns whether the given type is set in the bitmap.
    #[must_use]
    pub fn contains(&self, rtype: Rtype) -> bool {
        self.iter().any(|item| item == rtype)
    }

    /// Returns an iterator over the types in the bitmap, ascending.
    #[must_use]
    pub fn iter(&self) -> RtypeBitmapIter<'_> {
        RtypeBitmapIter {
            slice: self.data.as_ref(),
            octet: 0,
            bit: 0,
        }
    }

    /// Appends the wire form of the bitmap.
    pub fn compose(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(self.data.as_ref());
    }
}

impl fmt::Display for RtypeBitmap {
    /// Formats the types space-separated, with a leading space per type.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rtype in self.iter() {
            write!(f, " {rtype}")?;
        }
        Ok(())
    }
}

//------------ RtypeBitmapIter -----------------------------------------------

/// An iterator over the types set in a bitmap.
pub struct RtypeBitmapIter<'a> {
    /// The remaining window blocks, starting with the current one.
    slice: &'a [u8],

    /// The next octet to inspect within the current block’s bitmap.
    octet: usize,

    /// The next bit to inspect within that octet.
    bit: u8,
}

impl<'a> Iterator for RtypeBitmapIter<'a> {
    type Item = Rtype;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.slice.len() < 2 {
                return None;
            }
            let window = self.slice[0];
            let len = self.slice[1] as usize;
            while self.octet < len {
                let octet = self.slice[2 + self.octet];
                while self.bit < 8 {
                    let bit = self.bit;
                    self.bit += 1;
                    if octet & (0x80 >> bit) != 0 {
                        return Some(Rtype::from_int(
                            u16::from(window) << 8
                                | (self.octet as u16) * 8
                                | u16::from(bit),
                        ));
                    }
                }
                self.bit = 0;
                self.octet += 1;
            }
            self.slice = &self.slice[2 + len..];
            self.octet = 0;
            self.bit = 0;
        }
    }
}

//------------ RtypeBitmapBuilder --------------------------------------------

/// A builder for a type bitmap.
#[derive(Clone, Debug, Default)]
pub struct RtypeBitmapBuilder {
    types: std::collections::BTreeSet<u16>,
}

impl RtypeBitmapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a type to the bitmap.
    ///
    /// Adding a type twice is fine; the bitmap is a set.
    pub fn add(&mut self, rtype: Rtype) {
        self.types.insert(rtype.to_int());
    }

    /// Returns whether no types have been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Builds the wire-format bitmap.
    #[must_use]
    pub fn finalize(self) -> RtypeBitmap {
        let mut data = Vec::new();
        let mut window: Option<(u8, [u8; 32], usize)> = None;
        for value in self.types {
            let win = (value >> 8) as u8;
            let low = value as u8;
            if window.as_ref().is_some_and(|(cur, _, _)| *cur != win) {
                let (cur, octets, used) = window.take().unwrap();
                data.push(cur);
                data.push(used as u8);
                data.extend_from_slice(&octets[..used]);
            }
            let entry = window.get_or_insert((win, [0u8; 32], 0));
            entry.1[usize::from(low / 8)] |= 0x80 >> (low % 8);
            // Types ascend, so the last octet touched is the length.
            entry.2 = usize::from(low / 8) + 1;
        }
        if let Some((cur, octets, used)) = window {
            data.push(cur);
            data.push(used as u8);
            data.extend_from_slice(&octets[..used]);
        }
        RtypeBitmap { data: data.into() }
    }
}

//============ Testing =======================================================
