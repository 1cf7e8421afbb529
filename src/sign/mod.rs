//! Signing keys and policy.
//!
//! The actual signing driver lives with the zone data in
//! [`crate::zone::ZoneData::sign`]; this module provides what the driver
//! needs from the outside world: the [`KeyStore`] and [`SignContext`]
//! traits through which signatures are produced (typically backed by an
//! HSM), a ring-backed [`MemoryKeyStore`] for tests and tooling, and the
//! [`SignConfig`] policy record.

pub use self::config::{Nsec3Config, SerialPolicy, SignConfig};
pub use self::key::{
    CryptoError, KeyStore, MemoryKeyStore, SignContext, SignerKey,
};

pub mod config;
pub mod key;
