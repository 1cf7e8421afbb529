//! Signing keys and the contexts that use them.
//!
//! The key store itself — private key material, PKCS#11 slots, what have
//! you — is somebody else’s problem. The engine sees a [`KeyStore`] that
//! can describe its active keys and open a [`SignContext`], and asks the
//! context to sign canonical RRset octets with a key named by its locator
//! string. A context is exclusively owned by one signing pass and released
//! when dropped.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};

use crate::base::iana::SecAlg;

//------------ SignerKey -----------------------------------------------------

/// An active signing key as described by the key store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerKey {
    /// The locator by which the key store finds the private key.
    locator: String,

    /// The DNSSEC algorithm of the key.
    algorithm: SecAlg,

    /// The DNSKEY flags field.
    flags: u16,

    /// The key tag of the matching DNSKEY record.
    key_tag: u16,
}

impl SignerKey {
    /// Creates a new key description.
    #[must_use]
    pub fn new(
        locator: String,
        algorithm: SecAlg,
        flags: u16,
        key_tag: u16,
    ) -> Self {
        SignerKey {
            locator,
            algorithm,
            flags,
            key_tag,
        }
    }

    /// Returns the key locator.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Returns the algorithm of the key.
    #[must_use]
    pub fn algorithm(&self) -> SecAlg {
        self.algorithm
    }

    /// Returns the DNSKEY flags.
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns the key tag.
    #[must_use]
    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    /// Returns whether the ZONE flag is set.
    #[must_use]
    pub fn is_zone_signing_key(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    /// Returns whether the SEP flag is set.
    #[must_use]
    pub fn is_secure_entry_point(&self) -> bool {
        self.flags & 0x0001 != 0
    }
}

//------------ KeyStore ------------------------------------------------------

/// A store of signing keys.
///
/// The store may be shared and thread-safe; the contexts it creates are
/// not and belong to a single signing pass each.
pub trait KeyStore {
    /// The signing context produced by this store.
    type Context: SignContext;

    /// Opens a signing context.
    fn create_context(&self) -> Result<Self::Context, CryptoError>;

    /// Returns the currently active signing keys.
    fn keys(&self) -> &[SignerKey];
}

//------------ SignContext ---------------------------------------------------

/// An open signing context.
///
/// Dropping the context releases whatever resources it holds.
pub trait SignContext {
    /// Signs the given data with the key named by `locator`.
    fn sign(
        &mut self,
        data: &[u8],
        locator: &str,
    ) -> Result<Bytes, CryptoError>;
}

//------------ MemoryKeyStore ------------------------------------------------

/// A key store holding Ed25519 keys in memory.
///
/// Intended for tests and small tooling; real deployments reach their keys
/// through an HSM-backed implementation of [`KeyStore`].
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    keys: Vec<SignerKey>,
    pairs: HashMap<String, Ed25519KeyPair>,
}

impl MemoryKeyStore {
    /// Creates an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Generates a fresh Ed25519 key under the given locator.
    ///
    /// `flags` is the DNSKEY flags field: 256 for a ZSK, 257 for a KSK.
    pub fn generate(
        &mut self,
        locator: &str,
        flags: u16,
    ) -> Result<(), CryptoError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| CryptoError::ContextFailed)?;
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
            .map_err(|_| CryptoError::ContextFailed)?;
        let key_tag =
            key_tag(flags, SecAlg::ED25519, pair.public_key().as_ref());
        let inner = Arc::get_mut(&mut self.inner)
            .ok_or(CryptoError::ContextFailed)?;
        inner.keys.push(SignerKey::new(
            locator.into(),
            SecAlg::ED25519,
            flags,
            key_tag,
        ));
        inner.pairs.insert(locator.into(), pair);
        Ok(())
    }
}

impl KeyStore for MemoryKeyStore {
    type Context = MemoryContext;

    fn create_context(&self) -> Result<Self::Context, CryptoError> {
        Ok(MemoryContext {
            inner: self.inner.clone(),
        })
    }

    fn keys(&self) -> &[SignerKey] {
        &self.inner.keys
    }
}

//------------ MemoryContext -------------------------------------------------

/// A signing context over a [`MemoryKeyStore`].
pub struct MemoryContext {
    inner: Arc<Inner>,
}

impl SignContext for MemoryContext {
    fn sign(
        &mut self,
        data: &[u8],
        locator: &str,
    ) -> Result<Bytes, CryptoError> {
        let pair = self
            .inner
            .pairs
            .get(locator)
            .ok_or_else(|| CryptoError::UnknownKey(locator.into()))?;
        Ok(Bytes::copy_from_slice(pair.sign(data).as_ref()))
    }
}

//------------ key_tag -------------------------------------------------------

/// Computes the key tag over DNSKEY RDATA (RFC 4034, appendix B).
#[must_use]
pub fn key_tag(flags: u16, algorithm: SecAlg, public_key: &[u8]) -> u16 {
    let mut rdata = Vec::with_capacity(4 + public_key.len());
    rdata.extend_from_slice(&flags.to_be_bytes());
    rdata.push(3); // protocol
    rdata.push(algorithm.to_int());
    rdata.extend_from_slice(public_key);

    let mut ac: u32 = 0;
    for (i, &octet) in rdata.iter().enumerate() {
        if i & 1 == 0 {
            ac += u32::from(octet) << 8;
        } else {
            ac += u32::from(octet);
        }
    }
    ac += (ac >> 16) & 0xFFFF;
    ac as u16
}

//------------ CryptoError ---------------------------------------------------

/// A signing context could not be created or failed to sign.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CryptoError {
    /// The signing context could not be created.
    ContextFailed,

    /// The context does not know the key with the given locator.
    UnknownKey(String),

    /// A signing operation failed.
    SignFailed,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CryptoError::ContextFailed => {
                f.write_str("unable to create signing context")
            }
            CryptoError::UnknownKey(locator) => {
                write!(f, "unknown signing key '{locator}'")
            }
            CryptoError::SignFailed => f.write_str("signing failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags() {
        let zsk = SignerKey::new("zsk".into(), SecAlg::ED25519, 256, 1);
        let ksk = SignerKey::new("ksk".into(), SecAlg::ED25519, 257, 2);
        assert!(zsk.is_zone_signing_key());
        assert!(!zsk.is_secure_entry_point());
        assert!(ksk.is_zone_signing_key());
        assert!(ksk.is_secure_entry_point());
    }

    #[test]
    fn memory_store_signs() {
        let mut store = MemoryKeyStore::new();
        store.generate("test-zsk", 256).unwrap();
        let key = &store.keys()[0];
        assert_eq!(key.locator(), "test-zsk");

        let mut ctx = store.create_context().unwrap();
        let sig = ctx.sign(b"some data", "test-zsk").unwrap();
        assert_eq!(sig.len(), 64);

        // Same data, same key, same signature (Ed25519 is deterministic).
        let sig2 = ctx.sign(b"some data", "test-zsk").unwrap();
        assert_eq!(sig, sig2);

        assert!(matches!(
            ctx.sign(b"x", "no-such-key"),
            Err(CryptoError::UnknownKey(_))
        ));
    }
}
