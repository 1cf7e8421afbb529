//! Record data for NSEC3 and NSEC3PARAM, and the NSEC3 hash.

use core::fmt;
use core::str::FromStr;

use bytes::Bytes;
use ring::digest;

use crate::base::iana::Nsec3HashAlg;
use crate::base::name::Name;
use crate::utils::{base16, base32};

use super::dnssec::RtypeBitmap;

//------------ Nsec3 ---------------------------------------------------------

/// NSEC3 record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Nsec3 {
    pub hash_algorithm: Nsec3HashAlg,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Nsec3Salt,
    pub next_owner: OwnerHash,
    pub types: RtypeBitmap,
}

impl Nsec3 {
    /// Returns whether the Opt-Out flag is set.
    #[must_use]
    pub fn opt_out(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// Replaces the next hashed owner name.
    pub fn set_next_owner(&mut self, next_owner: OwnerHash) {
        self.next_owner = next_owner;
    }

    /// Appends the canonical wire form of the data.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        target.push(self.hash_algorithm.to_int());
        target.push(self.flags);
        target.extend_from_slice(&self.iterations.to_be_bytes());
        self.salt.compose(target);
        self.next_owner.compose(target);
        self.types.compose(target);
    }
}

impl fmt::Display for Nsec3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}{}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            self.salt,
            self.next_owner,
            self.types
        )
    }
}

//------------ Nsec3param ----------------------------------------------------

/// NSEC3PARAM record data.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nsec3param {
    pub hash_algorithm: Nsec3HashAlg,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Nsec3Salt,
}

impl Nsec3param {
    /// Appends the wire form of the data.
    ///
    /// NSEC3PARAM contains no names, so canonical and plain form coincide.
    pub fn compose(&self, target: &mut Vec<u8>) {
        target.push(self.hash_algorithm.to_int());
        target.push(self.flags);
        target.extend_from_slice(&self.iterations.to_be_bytes());
        self.salt.compose(target);
    }
}

impl Default for Nsec3param {
    /// Returns the best-practice parameters of RFC 9276: SHA-1, zero
    /// additional iterations, no salt, no flags.
    fn default() -> Self {
        Nsec3param {
            hash_algorithm: Nsec3HashAlg::SHA1,
            flags: 0,
            iterations: 0,
            salt: Nsec3Salt::empty(),
        }
    }
}

impl fmt::Display for Nsec3param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hash_algorithm, self.flags, self.iterations, self.salt
        )
    }
}

//------------ Nsec3Salt -----------------------------------------------------

/// The salt of NSEC3 hashing.
///
/// At most 255 octets; displayed as hex digits or `-` when empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Nsec3Salt {
    octets: Bytes,
}

impl Nsec3Salt {
    /// Creates an empty salt.
    #[must_use]
    pub fn empty() -> Self {
        Default::default()
    }

    /// Creates a salt from octets.
    pub fn from_octets(octets: Bytes) -> Result<Self, LongSalt> {
        if octets.len() > 255 {
            return Err(LongSalt);
        }
        Ok(Nsec3Salt { octets })
    }

    /// Returns the salt octets.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.octets.as_ref()
    }

    /// Appends the length-prefixed wire form of the salt.
    pub fn compose(&self, target: &mut Vec<u8>) {
        target.push(self.octets.len() as u8);
        target.extend_from_slice(self.octets.as_ref());
    }
}

impl fmt::Display for Nsec3Salt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.octets.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&base16::encode_string(self.octets.as_ref()))
        }
    }
}

impl FromStr for Nsec3Salt {
    type Err = base16::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            return Ok(Nsec3Salt::empty());
        }
        let octets = base16::decode(s)?;
        Nsec3Salt::from_octets(octets.into())
            .map_err(|_| base16::DecodeError)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Nsec3Salt {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Nsec3Salt {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let s = <&str as serde::Deserialize>::deserialize(deserializer)?;
        Nsec3Salt::from_str(s).map_err(serde::de::Error::custom)
    }
}

//------------ OwnerHash -----------------------------------------------------

/// The raw hash of an NSEC3 owner name.
///
/// Displayed in base32hex without padding, the way it appears both in the
/// next-hashed-owner field and (lowercased) as the first label of an NSEC3
/// owner name.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct OwnerHash {
    octets: Bytes,
}

impl OwnerHash {
    /// Creates an owner hash from raw octets.
    pub fn from_octets(octets: Bytes) -> Result<Self, LongSalt> {
        if octets.len() > 255 {
            return Err(LongSalt);
        }
        Ok(OwnerHash { octets })
    }

    /// Returns the raw hash octets.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.octets.as_ref()
    }

    /// Returns the hash as a lowercase base32hex owner label.
    #[must_use]
    pub fn to_label(&self) -> String {
        base32::encode_string_hex(self.octets.as_ref()).to_ascii_lowercase()
    }

    /// Appends the length-prefixed wire form of the hash.
    pub fn compose(&self, target: &mut Vec<u8>) {
        target.push(self.octets.len() as u8);
        target.extend_from_slice(self.octets.as_ref());
    }
}

impl fmt::Display for OwnerHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&base32::encode_string_hex(self.octets.as_ref()))
    }
}

impl FromStr for OwnerHash {
    type Err = base32::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets = base32::decode_hex(s)?;
        OwnerHash::from_octets(octets.into())
            .map_err(|_| base32::DecodeError)
    }
}

//------------ nsec3_hash ----------------------------------------------------

/// Computes the NSEC3 hash of an owner name (RFC 5155, section 5).
///
/// ```text
/// IH(salt, x, 0) = H(x || salt)
/// IH(salt, x, k) = H(IH(salt, x, k-1) || salt), if k > 0
/// ```
///
/// The hash is computed over the canonical (lowercased) wire form of the
/// owner name. Only SHA-1 is defined.
pub fn nsec3_hash(
    owner: &Name,
    algorithm: Nsec3HashAlg,
    iterations: u16,
    salt: &Nsec3Salt,
) -> Result<OwnerHash, Nsec3HashError> {
    if algorithm != Nsec3HashAlg::SHA1 {
        return Err(Nsec3HashError::UnsupportedAlgorithm);
    }

    let mut canonical_owner = Vec::new();
    owner.compose_canonical(&mut canonical_owner);

    let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
    ctx.update(&canonical_owner);
    ctx.update(salt.as_slice());
    let mut h = ctx.finish();

    for _ in 0..iterations {
        let mut ctx =
            digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        ctx.update(h.as_ref());
        ctx.update(salt.as_slice());
        h = ctx.finish();
    }

    OwnerHash::from_octets(Bytes::copy_from_slice(h.as_ref()))
        .map_err(|_| Nsec3HashError::OwnerHashError)
}

//------------ Nsec3HashError ------------------------------------------------

/// An owner name could not be hashed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Nsec3HashError {
    /// The hash algorithm is not supported.
    UnsupportedAlgorithm,

    /// The hash did not fit an owner hash field.
    OwnerHashError,
}

impl fmt::Display for Nsec3HashError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Nsec3HashError::UnsupportedAlgorithm => {
                "unsupported NSEC3 hash algorithm"
            }
            Nsec3HashError::OwnerHashError => "invalid NSEC3 owner hash",
        })
    }
}

impl std::error::Error for Nsec3HashError {}

//------------ LongSalt ------------------------------------------------------

/// A salt or hash value was longer than 255 octets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LongSalt;

impl fmt::Display for LongSalt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("field exceeds 255 octets")
    }
}

impl std::error::Error for LongSalt {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn hash_rfc5155_example() {
        // From RFC 5155, appendix A: H(example) with 12 iterations and
        // salt aabbccdd is 0p9mhaveqvm6t7vbl5lop2u3t2rp3tom.
        let name = Name::from_str("example").unwrap();
        let salt = Nsec3Salt::from_str("aabbccdd").unwrap();
        let hash =
            nsec3_hash(&name, Nsec3HashAlg::SHA1, 12, &salt).unwrap();
        assert_eq!(hash.to_label(), "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom");
    }

    #[test]
    fn hash_is_case_insensitive() {
        let salt = Nsec3Salt::empty();
        let lower = Name::from_str("a.example").unwrap();
        let upper = Name::from_str("A.EXAMPLE").unwrap();
        assert_eq!(
            nsec3_hash(&lower, Nsec3HashAlg::SHA1, 0, &salt).unwrap(),
            nsec3_hash(&upper, Nsec3HashAlg::SHA1, 0, &salt).unwrap()
        );
    }

    #[test]
    fn unknown_algorithm() {
        let name = Name::from_str("example").unwrap();
        let salt = Nsec3Salt::empty();
        assert_eq!(
            nsec3_hash(&name, Nsec3HashAlg::from_int(2), 0, &salt),
            Err(Nsec3HashError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn salt_presentation() {
        assert_eq!(Nsec3Salt::empty().to_string(), "-");
        assert_eq!(Nsec3Salt::from_str("-").unwrap(), Nsec3Salt::empty());
        let salt = Nsec3Salt::from_str("AABBCCDD").unwrap();
        assert_eq!(salt.as_slice(), &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(salt.to_string(), "aabbccdd");
    }
}
