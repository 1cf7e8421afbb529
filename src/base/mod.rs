//! Fundamental types for dealing with zone data.
//!
//! The types here form the vocabulary of the rest of the crate: domain
//! names with their canonical ordering, the IANA registries we need, RFC
//! 1982 serial numbers, and TTLs.

pub use self::cmp::CanonicalOrd;
pub use self::iana::{Class, Nsec3HashAlg, Rtype, SecAlg};
pub use self::name::{Name, NameBuilder, NameError};
pub use self::serial::Serial;
pub use self::ttl::Ttl;

pub mod cmp;
pub mod iana;
pub mod name;
pub mod serial;

mod ttl {
    use core::fmt;

    /// A time-to-live value.
    ///
    /// TTLs in DNS are 32 bit second counts. The type is a thin wrapper so
    /// that a TTL cannot be confused with any of the other `u32`s floating
    /// around zone data.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct Ttl(u32);

    impl Ttl {
        /// Creates a TTL from a number of seconds.
        #[must_use]
        pub const fn from_secs(secs: u32) -> Self {
            Ttl(secs)
        }

        /// Returns the TTL as a number of seconds.
        #[must_use]
        pub const fn as_secs(self) -> u32 {
            self.0
        }
    }

    impl From<u32> for Ttl {
        fn from(secs: u32) -> Self {
            Ttl(secs)
        }
    }

    impl fmt::Display for Ttl {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            self.0.fmt(f)
        }
    }
}
