//! Errors of the zone data engine.

use core::fmt;

use crate::base::name::Name;
use crate::sign::key::CryptoError;

//------------ ZoneError -----------------------------------------------------

/// An operation on zone data failed.
///
/// Every variant is safe to recover from by calling
/// [`ZoneData::rollback`][crate::zone::ZoneData::rollback].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ZoneError {
    /// A caller-supplied argument was absent or malformed.
    Arg(&'static str),

    /// A domain or denial node with the same name already exists.
    Conflict(Name),

    /// Two distinct owner names produced the same NSEC3 hash.
    HashCollision {
        /// The owner name already mapped to the hash.
        existing: Name,

        /// The owner name that collided with it.
        incoming: Name,
    },

    /// Structural validation found violations.
    Structural,

    /// The serial policy could not produce an increasing serial.
    Serial,

    /// The signing context failed.
    Crypto(CryptoError),

    /// A backup stream was malformed; the recovered state is unusable.
    BackupCorrupt,

    /// The operation was cancelled cooperatively.
    Canceled,

    /// An internal invariant was found broken.
    Assert(&'static str),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZoneError::Arg(what) => {
                write!(f, "invalid argument: {what}")
            }
            ZoneError::Conflict(name) => {
                write!(f, "duplicate entry for {name}")
            }
            ZoneError::HashCollision { existing, incoming } => {
                write!(
                    f,
                    "NSEC3 hash collision between {existing} and {incoming}"
                )
            }
            ZoneError::Structural => {
                f.write_str("zone data violates structural rules")
            }
            ZoneError::Serial => {
                f.write_str("unable to produce an increasing serial")
            }
            ZoneError::Crypto(err) => err.fmt(f),
            ZoneError::BackupCorrupt => f.write_str("backup corrupted"),
            ZoneError::Canceled => f.write_str("operation cancelled"),
            ZoneError::Assert(what) => {
                write!(f, "invariant violated: {what}")
            }
        }
    }
}

impl std::error::Error for ZoneError {}

impl From<CryptoError> for ZoneError {
    fn from(err: CryptoError) -> Self {
        ZoneError::Crypto(err)
    }
}
