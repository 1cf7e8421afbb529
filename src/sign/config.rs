//! The signing policy record.
//!
//! A [`SignConfig`] is handed to the engine by the external policy loader.
//! The engine only recognises the fields here; everything else about
//! policies — refresh scheduling, key rollover, audit — stays outside.

use core::fmt;
use core::str::FromStr;

use crate::rdata::nsec3::Nsec3param;

//------------ SerialPolicy --------------------------------------------------

/// How the SOA serial is advanced on each signing run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SerialPolicy {
    /// Use the current Unix time.
    UnixTime,

    /// Increment the previous serial.
    #[default]
    Counter,

    /// Use `YYYYMMDDnn` in UTC.
    DateCounter,

    /// Keep the serial of the inbound zone.
    Keep,
}

impl fmt::Display for SerialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            SerialPolicy::UnixTime => "unixtime",
            SerialPolicy::Counter => "counter",
            SerialPolicy::DateCounter => "datecounter",
            SerialPolicy::Keep => "keep",
        })
    }
}

impl FromStr for SerialPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unixtime" => SerialPolicy::UnixTime,
            "counter" => SerialPolicy::Counter,
            "datecounter" => SerialPolicy::DateCounter,
            "keep" => SerialPolicy::Keep,
            _ => return Err(UnknownPolicy),
        })
    }
}

//------------ Nsec3Config ---------------------------------------------------

/// NSEC3 parameters plus the Opt-Out choice.
///
/// Present in a [`SignConfig`] when the zone uses NSEC3; absent for NSEC.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nsec3Config {
    /// The hash parameters as they go into NSEC3 and NSEC3PARAM records.
    pub params: Nsec3param,

    /// Whether unsigned delegations are left out of the chain.
    pub opt_out: bool,
}

//------------ SignConfig ----------------------------------------------------

/// The signing policy for one zone.
///
/// All durations are in seconds.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignConfig {
    /// The SOA serial policy.
    pub serial_policy: SerialPolicy,

    /// How far into the past signature inception is backdated.
    pub sig_inception_offset: u32,

    /// The upper bound of the random spread added to expiration times.
    pub sig_jitter: u32,

    /// How long signatures over ordinary RRsets stay valid.
    pub sig_validity_default: u32,

    /// How long signatures over denial-of-existence RRsets stay valid.
    pub sig_validity_denial: u32,

    /// NSEC3 parameters, or `None` for an NSEC zone.
    pub nsec3: Option<Nsec3Config>,
}

impl Default for SignConfig {
    fn default() -> Self {
        SignConfig {
            serial_policy: SerialPolicy::default(),
            sig_inception_offset: 3600,
            sig_jitter: 43200,
            sig_validity_default: 30 * 86400,
            sig_validity_denial: 30 * 86400,
            nsec3: None,
        }
    }
}

//------------ UnknownPolicy -------------------------------------------------

/// A serial policy name was not recognised.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownPolicy;

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown serial policy")
    }
}

impl std::error::Error for UnknownPolicy {}

//============ Testing =======================================================
