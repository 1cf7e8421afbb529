//! The zone data engine.
//!
//! [`ZoneData`] owns everything the signer knows about one zone: the
//! ordered tree of authoritative domains, the denial-of-existence chain,
//! the NSEC3 twin tree, and the serial bookkeeping. Mutations arrive as
//! staged changes on the RRsets of [`Domain`]s and become visible only
//! through [`ZoneData::commit`] (or its driver, [`ZoneData::update`]);
//! [`ZoneData::rollback`] discards everything staged.
//!
//! A zone is driven by exactly one signer worker at a time. Nothing in
//! here locks; distinct zones run on distinct workers.

pub use self::data::{AdapterMode, ZoneData};
pub use self::denial::Denial;
pub use self::domain::{Domain, DomainStatus};
pub use self::error::ZoneError;
pub use self::rrset::{Rrset, SignedRrsig};
pub use self::tree::NameTree;

pub mod backup;
pub mod data;
pub mod denial;
pub mod domain;
pub mod error;
pub mod rrset;
pub mod tree;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//------------ Cancel --------------------------------------------------------

/// A cooperative cancellation flag.
///
/// Long-running phases check the flag between domains and bail out with
/// [`ZoneError::Canceled`]. After a cancelled phase the zone still holds
/// whatever was staged; callers must [`ZoneData::rollback`] before reusing
/// it.
///
/// [`ZoneData::rollback`]: data::ZoneData::rollback
#[derive(Clone, Debug, Default)]
pub struct Cancel {
    flag: Arc<AtomicBool>,
}

impl Cancel {
    /// Creates a fresh, un-cancelled flag.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
