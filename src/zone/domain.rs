//! Domain nodes.
//!
//! A [`Domain`] is one named node of the authoritative space: a mapping
//! from record type to [`Rrset`], a [`DomainStatus`] derived from its
//! content and surroundings, and the wiring into the rest of the zone —
//! parent name, subdomain counters, and the keys of its denial node and
//! NSEC3 twin. Back references are stored as names and looked up on use;
//! nothing in a domain owns another node.

use core::fmt;
use core::str::FromStr;

use std::collections::BTreeMap;

use tracing::warn;

use crate::base::iana::Rtype;
use crate::base::name::Name;
use crate::rdata::{Record, RecordData};

use super::error::ZoneError;
use super::rrset::Rrset;

//------------ DomainStatus --------------------------------------------------

/// What role a domain plays in the zone.
///
/// The status is a function of the domain’s content and of the names above
/// it; `ZoneData` recomputes it whenever either changes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DomainStatus {
    /// Not yet classified, or glue.
    #[default]
    None,

    /// Below a DNAME, or non-glue data below a zone cut.
    Occluded,

    /// The zone apex.
    Apex,

    /// Ordinary authoritative data.
    Auth,

    /// An unsigned delegation: NS present, no DS.
    Ns,

    /// A signed delegation: NS and DS present.
    Ds,

    /// An empty non-terminal above authoritative data.
    EntAuth,

    /// An empty non-terminal leading only to unsigned delegations.
    EntNs,

    /// An empty non-terminal leading only to glue.
    EntGlue,

    /// An NSEC3 twin in the hashed tree.
    Hash,
}

impl DomainStatus {
    /// Returns whether this is one of the empty-non-terminal statuses.
    #[must_use]
    pub fn is_ent(self) -> bool {
        matches!(
            self,
            DomainStatus::EntAuth
                | DomainStatus::EntNs
                | DomainStatus::EntGlue
        )
    }

    /// Returns whether a domain with this status counts as authoritative
    /// for the subdomain counters.
    #[must_use]
    pub fn is_auth_subdomain(self) -> bool {
        matches!(self, DomainStatus::Auth | DomainStatus::Ds)
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DomainStatus::None => "NONE",
            DomainStatus::Occluded => "OCCLUDED",
            DomainStatus::Apex => "APEX",
            DomainStatus::Auth => "AUTH",
            DomainStatus::Ns => "NS",
            DomainStatus::Ds => "DS",
            DomainStatus::EntAuth => "ENT_AUTH",
            DomainStatus::EntNs => "ENT_NS",
            DomainStatus::EntGlue => "ENT_GLUE",
            DomainStatus::Hash => "HASH",
        })
    }
}

impl FromStr for DomainStatus {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NONE" => DomainStatus::None,
            "OCCLUDED" => DomainStatus::Occluded,
            "APEX" => DomainStatus::Apex,
            "AUTH" => DomainStatus::Auth,
            "NS" => DomainStatus::Ns,
            "DS" => DomainStatus::Ds,
            "ENT_AUTH" => DomainStatus::EntAuth,
            "ENT_NS" => DomainStatus::EntNs,
            "ENT_GLUE" => DomainStatus::EntGlue,
            "HASH" => DomainStatus::Hash,
            _ => return Err(ZoneError::BackupCorrupt),
        })
    }
}

//------------ Domain --------------------------------------------------------

/// A named node of the authoritative space.
#[derive(Clone, Debug)]
pub struct Domain {
    /// The owner name.
    name: Name,

    /// The RRsets at this name, by type.
    rrsets: BTreeMap<Rtype, Rrset>,

    /// The role of the domain.
    pub status: DomainStatus,

    /// The name of the immediate ancestor, once entize wired it.
    pub parent: Option<Name>,

    /// The number of children below this domain.
    pub subdomain_count: usize,

    /// The number of non-glue children below this domain.
    pub subdomain_auth: usize,

    /// The owner of the NSEC3 twin, if the zone is NSEC3-signed.
    pub nsec3: Option<Name>,

    /// The owner of the denial node covering this domain.
    pub denial: Option<Name>,

    /// Whether the denial bitmap for this domain is stale.
    pub nsec_bitmap_changed: bool,

    /// Whether the denial next pointer for this domain is stale.
    pub nsec_nxt_changed: bool,
}

impl Domain {
    /// Creates a fresh domain with no content.
    #[must_use]
    pub fn new(name: Name) -> Self {
        Domain {
            name,
            rrsets: BTreeMap::new(),
            status: DomainStatus::None,
            parent: None,
            subdomain_count: 0,
            subdomain_auth: 0,
            nsec3: None,
            denial: None,
            nsec_bitmap_changed: false,
            nsec_nxt_changed: false,
        }
    }

    /// Returns the owner name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the RRset of the given type, if it has any records.
    #[must_use]
    pub fn rrset(&self, rtype: Rtype) -> Option<&Rrset> {
        self.rrsets.get(&rtype).filter(|rrset| !rrset.is_empty())
    }

    /// Returns an iterator over the non-empty RRsets.
    pub fn rrsets(&self) -> impl Iterator<Item = &Rrset> {
        self.rrsets.values().filter(|rrset| !rrset.is_empty())
    }

    /// Returns a mutating iterator over all RRsets.
    pub fn rrsets_mut(&mut self) -> impl Iterator<Item = &mut Rrset> {
        self.rrsets.values_mut()
    }

    /// Returns the number of RRsets with committed or staged records.
    #[must_use]
    pub fn rrset_count(&self) -> usize {
        self.rrsets().count()
    }

    /// Returns whether the given type is present with records.
    #[must_use]
    pub fn has_rrset(&self, rtype: Rtype) -> bool {
        self.rrset(rtype).is_some()
    }

    /// Returns the committed record types at this name, ascending.
    #[must_use]
    pub fn committed_types(&self) -> Vec<Rtype> {
        self.rrsets
            .values()
            .filter(|rrset| !rrset.records().is_empty())
            .map(Rrset::rtype)
            .collect()
    }

    /// Stages a record for addition.
    pub fn add_rr(&mut self, record: Record) {
        self.rrsets
            .entry(record.rtype())
            .or_insert_with(|| Rrset::new(record.rtype()))
            .add(record);
        self.nsec_bitmap_changed = true;
    }

    /// Stages a record for deletion.
    pub fn del_rr(&mut self, record: &Record) {
        match self.rrsets.get_mut(&record.rtype()) {
            Some(rrset) => {
                if !rrset.del(record) {
                    warn!(
                        "no {} record to delete at {}",
                        record.rtype(),
                        self.name
                    );
                }
                self.nsec_bitmap_changed = true;
            }
            None => warn!(
                "no {} RRset to delete from at {}",
                record.rtype(),
                self.name
            ),
        }
    }

    /// Installs a single-record RRset the engine synthesised itself.
    ///
    /// The record goes straight into the committed state, replacing
    /// whatever the type held before.
    pub fn set_synthesized_rrset(&mut self, record: Record) {
        let rrset = self
            .rrsets
            .entry(record.rtype())
            .or_insert_with(|| Rrset::new(record.rtype()));
        rrset.set_records(vec![record]);
    }

    /// Stages deletion of every committed record.
    pub fn del_rrs(&mut self) {
        for rrset in self.rrsets.values_mut() {
            rrset.del_all();
        }
        self.nsec_bitmap_changed = true;
    }

    /// Applies all staged changes and prunes emptied RRsets.
    ///
    /// Returns whether anything changed.
    pub fn commit(&mut self) -> Result<bool, ZoneError> {
        let mut changed = false;
        for rrset in self.rrsets.values_mut() {
            changed |= rrset.commit();
        }
        self.rrsets.retain(|_, rrset| !rrset.records().is_empty());
        Ok(changed)
    }

    /// Discards all staged changes.
    pub fn rollback(&mut self) {
        for rrset in self.rrsets.values_mut() {
            rrset.rollback();
        }
        self.rrsets.retain(|_, rrset| !rrset.is_empty());
    }

    /// Reconciles the signatures of every RRset; see [`Rrset::diff`].
    pub fn diff(&mut self, active_locators: &[&str]) {
        for rrset in self.rrsets.values_mut() {
            rrset.diff(active_locators);
        }
    }

    /// Checks that a present CNAME is alone at this name.
    ///
    /// RRSIG and the denial types may coexist with a CNAME; nothing else
    /// may (RFC 4035, section 2.5).
    pub fn examine_rrset_is_alone(&self, rtype: Rtype) -> Result<(), ()> {
        if !self.has_rrset(rtype) {
            return Ok(());
        }
        let conflicting = self.rrsets().any(|rrset| {
            let other = rrset.rtype();
            other != rtype
                && other != Rtype::RRSIG
                && other != Rtype::NSEC
                && other != Rtype::NSEC3
        });
        if conflicting {
            warn!("other data next to {} at {}", rtype, self.name);
            return Err(());
        }
        Ok(())
    }

    /// Checks that at most one record of the given type exists.
    pub fn examine_rrset_is_singleton(&self, rtype: Rtype) -> Result<(), ()> {
        if let Some(rrset) = self.rrset(rtype) {
            if rrset.staged_count() > 1 {
                warn!("multiple {} records at {}", rtype, self.name);
                return Err(());
            }
        }
        Ok(())
    }

    /// Checks that a delegation carries only delegation data.
    ///
    /// At a zone cut only NS, DS, their signatures, and glue addresses for
    /// nameservers named in the NS RDATA may be present.
    pub fn examine_valid_zonecut(&self) -> Result<(), ()> {
        if !self.has_rrset(Rtype::NS) {
            return Ok(());
        }
        for rrset in self.rrsets() {
            let rtype = rrset.rtype();
            if rtype == Rtype::NS || rtype == Rtype::DS || rtype == Rtype::RRSIG
            {
                continue;
            }
            if rtype.is_address() {
                if !self.ns_rdata_signals(&self.name) {
                    warn!(
                        "glue at {} not signalled by NS RDATA",
                        self.name
                    );
                    return Err(());
                }
            } else {
                warn!(
                    "non-delegation data {} at zone cut {}",
                    rtype, self.name
                );
                return Err(());
            }
        }
        Ok(())
    }

    /// Returns whether any NS record here names `target` as nameserver.
    ///
    /// Staged records count: glue classification runs before the commit.
    #[must_use]
    pub fn ns_rdata_signals(&self, target: &Name) -> bool {
        let Some(rrset) = self.rrset(Rtype::NS) else {
            return false;
        };
        rrset.iter_staged().any(|record| {
            matches!(record.data(), RecordData::Ns(ns) if ns.nsdname == *target)
        })
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::base::Ttl;
    use crate::rdata::{Cname, Generic, Ns};
    use bytes::Bytes;
    use core::str::FromStr as _;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn record(owner: &str, data: RecordData) -> Record {
        Record::new(name(owner), Class::IN, Ttl::from_secs(3600), data)
    }

    fn a_data() -> RecordData {
        RecordData::Generic(Generic {
            rtype: Rtype::A,
            rdata: Bytes::from_static(&[192, 0, 2, 1]),
        })
    }

    #[test]
    fn commit_prunes_empty_rrsets() {
        let mut domain = Domain::new(name("www.example."));
        let rr = record("www.example.", a_data());
        domain.add_rr(rr.clone());
        domain.commit().unwrap();
        assert_eq!(domain.rrset_count(), 1);

        domain.del_rr(&rr);
        domain.commit().unwrap();
        assert_eq!(domain.rrset_count(), 0);
    }

    #[test]
    fn cname_must_be_alone() {
        let mut domain = Domain::new(name("alias.example."));
        domain.add_rr(record(
            "alias.example.",
            RecordData::Cname(Cname {
                cname: name("www.example."),
            }),
        ));
        domain.commit().unwrap();
        assert!(domain.examine_rrset_is_alone(Rtype::CNAME).is_ok());

        domain.add_rr(record("alias.example.", a_data()));
        domain.commit().unwrap();
        assert!(domain.examine_rrset_is_alone(Rtype::CNAME).is_err());
    }

    #[test]
    fn cname_must_be_singleton() {
        let mut domain = Domain::new(name("alias.example."));
        domain.add_rr(record(
            "alias.example.",
            RecordData::Cname(Cname {
                cname: name("one.example."),
            }),
        ));
        domain.add_rr(record(
            "alias.example.",
            RecordData::Cname(Cname {
                cname: name("two.example."),
            }),
        ));
        domain.commit().unwrap();
        assert!(domain.examine_rrset_is_singleton(Rtype::CNAME).is_err());
    }

    #[test]
    fn zone_cut_rejects_foreign_data() {
        let mut domain = Domain::new(name("deleg.example."));
        domain.add_rr(record(
            "deleg.example.",
            RecordData::Ns(Ns {
                nsdname: name("ns.deleg.example."),
            }),
        ));
        domain.commit().unwrap();
        assert!(domain.examine_valid_zonecut().is_ok());

        domain.add_rr(record(
            "deleg.example.",
            RecordData::Generic(Generic {
                rtype: Rtype::TXT,
                rdata: Bytes::from_static(b"\x05hello"),
            }),
        ));
        domain.commit().unwrap();
        assert!(domain.examine_valid_zonecut().is_err());
    }
}
