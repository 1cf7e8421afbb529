//! RRsets with staged changes.
//!
//! An [`Rrset`] holds the committed records of one owner/class/type
//! triple, the additions and deletions staged against them, and the
//! signatures covering the committed records. Staged changes only become
//! visible through [`Rrset::commit`]; [`Rrset::rollback`] forgets them.

use tracing::warn;

use crate::base::cmp::CanonicalOrd;
use crate::base::iana::Rtype;
use crate::base::{Serial, Ttl};
use crate::rdata::{Record, RecordData};

//------------ SignedRrsig ---------------------------------------------------

/// One signature over an RRset, together with the key that made it.
///
/// The locator ties the signature to its key so that a key leaving the
/// active set invalidates exactly the signatures it produced.
#[derive(Clone, Debug)]
pub struct SignedRrsig {
    /// The RRSIG record.
    pub record: Record,

    /// The locator of the key that produced the signature.
    pub key_locator: String,
}

//------------ Rrset ---------------------------------------------------------

/// A set of records sharing owner, class, and type, plus staged changes.
#[derive(Clone, Debug, Default)]
pub struct Rrset {
    /// The record type of the set.
    rtype: Rtype,

    /// The committed records, in canonical order.
    records: Vec<Record>,

    /// Records staged for addition.
    pending_add: Vec<Record>,

    /// Records staged for deletion.
    pending_del: Vec<Record>,

    /// The signatures covering the committed records.
    rrsigs: Vec<SignedRrsig>,

    /// Whether the committed records changed since they were last signed.
    needs_signing: bool,
}

impl Rrset {
    /// Creates an empty RRset of the given type.
    #[must_use]
    pub fn new(rtype: Rtype) -> Self {
        Rrset {
            rtype,
            ..Default::default()
        }
    }

    /// Returns the record type of the set.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Returns the committed records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the committed records plus those staged for addition.
    ///
    /// This is the view structural checks work on before a commit.
    pub fn iter_staged(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().chain(self.pending_add.iter())
    }

    /// Returns the signatures over the committed records.
    #[must_use]
    pub fn rrsigs(&self) -> &[SignedRrsig] {
        &self.rrsigs
    }

    /// Returns the TTL of the set.
    ///
    /// That is the TTL of the first committed or staged record.
    #[must_use]
    pub fn ttl(&self) -> Option<Ttl> {
        self.records
            .first()
            .or_else(|| self.pending_add.first())
            .map(Record::ttl)
    }

    /// Returns whether the set has neither committed nor staged records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.pending_add.is_empty()
    }

    /// Returns whether any changes are staged.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_add.is_empty() || !self.pending_del.is_empty()
    }

    /// Returns the number of records the set will have after commit.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.records.len() + self.pending_add.len()
            - self.pending_del.len().min(self.records.len())
    }

    /// Returns whether the set currently lacks valid signatures.
    #[must_use]
    pub fn needs_signing(&self) -> bool {
        self.needs_signing
            || (self.rrsigs.is_empty() && !self.records.is_empty())
    }

    /// Stages a record for addition.
    ///
    /// Staging a record that is already present, committed or staged, is
    /// a no-op.
    pub fn add(&mut self, record: Record) {
        debug_assert_eq!(record.rtype(), self.rtype);
        if self.records.iter().any(|have| have.data() == record.data())
            || self
                .pending_add
                .iter()
                .any(|have| have.data() == record.data())
        {
            warn!("not staging duplicate {} record", self.rtype);
            return;
        }
        self.pending_add.push(record);
    }

    /// Stages a record for deletion.
    ///
    /// A record that was itself only staged for addition is simply
    /// un-staged. Returns whether the record was known at all.
    pub fn del(&mut self, record: &Record) -> bool {
        if let Some(pos) = self
            .pending_add
            .iter()
            .position(|have| have.data() == record.data())
        {
            self.pending_add.remove(pos);
            return true;
        }
        if self.records.iter().any(|have| have.data() == record.data()) {
            if !self
                .pending_del
                .iter()
                .any(|have| have.data() == record.data())
            {
                self.pending_del.push(record.clone());
            }
            return true;
        }
        false
    }

    /// Stages every committed record for deletion.
    pub fn del_all(&mut self) {
        self.pending_add.clear();
        self.pending_del = self.records.clone();
    }

    /// Applies staged changes to the committed records.
    ///
    /// Returns whether the committed records changed. A change drops all
    /// signatures and marks the set for re-signing.
    pub fn commit(&mut self) -> bool {
        if !self.has_pending() {
            return false;
        }
        for del in self.pending_del.drain(..) {
            self.records.retain(|have| have.data() != del.data());
        }
        self.records.append(&mut self.pending_add);
        self.records
            .sort_by(|a, b| a.data().canonical_cmp(b.data()));
        self.drop_signatures();
        true
    }

    /// Discards all staged changes.
    pub fn rollback(&mut self) {
        self.pending_add.clear();
        self.pending_del.clear();
    }

    /// Replaces the committed records outright.
    ///
    /// Used for RRsets the engine synthesises itself — denial records and
    /// NSEC3PARAM. Signatures are dropped if the records differ.
    pub fn set_records(&mut self, records: Vec<Record>) {
        if self.records == records {
            return;
        }
        self.records = records;
        self.records
            .sort_by(|a, b| a.data().canonical_cmp(b.data()));
        self.drop_signatures();
    }

    /// Rewrites the serial of a committed SOA record.
    ///
    /// Returns whether the serial changed; a change drops the
    /// signatures over the set.
    pub fn replace_soa_serial(&mut self, serial: Serial) -> bool {
        let mut changed = false;
        for record in &mut self.records {
            if let RecordData::Soa(soa) = record.data_mut() {
                if soa.serial != serial {
                    soa.serial = serial;
                    changed = true;
                }
            }
        }
        if changed {
            self.drop_signatures();
        }
        changed
    }

    /// Reconciles signatures against staged changes and the active keys.
    ///
    /// A set with staged changes loses all its signatures; an unchanged
    /// set loses those made by keys that are no longer active.
    pub fn diff(&mut self, active_locators: &[&str]) {
        if self.has_pending() {
            self.drop_signatures();
            return;
        }
        let before = self.rrsigs.len();
        self.rrsigs
            .retain(|sig| active_locators.contains(&sig.key_locator.as_str()));
        if self.rrsigs.len() != before {
            self.needs_signing = true;
        }
    }

    /// Attaches a freshly produced signature.
    pub fn add_rrsig(&mut self, record: Record, key_locator: String) {
        debug_assert_eq!(record.rtype(), Rtype::RRSIG);
        self.rrsigs.push(SignedRrsig {
            record,
            key_locator,
        });
    }

    /// Marks the set as fully signed.
    pub fn mark_signed(&mut self) {
        self.needs_signing = false;
    }

    /// Drops all signatures and marks the set for re-signing.
    pub fn drop_signatures(&mut self) {
        self.rrsigs.clear();
        self.needs_signing = true;
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::base::name::Name;
    use crate::rdata::{Generic, RecordData};
    use core::str::FromStr;

    fn a_record(addr: [u8; 4]) -> Record {
        Record::new(
            Name::from_str("www.example.").unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Generic(Generic {
                rtype: Rtype::A,
                rdata: bytes::Bytes::copy_from_slice(&addr),
            }),
        )
    }

    #[test]
    fn staged_changes_are_invisible_until_commit() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        assert!(rrset.records().is_empty());
        assert!(rrset.has_pending());

        assert!(rrset.commit());
        assert_eq!(rrset.records().len(), 1);
        assert!(!rrset.has_pending());
    }

    #[test]
    fn rollback_discards_staged_changes() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        rrset.commit();

        rrset.add(a_record([192, 0, 2, 2]));
        rrset.del(&a_record([192, 0, 2, 1]));
        rrset.rollback();
        assert!(!rrset.commit());
        assert_eq!(rrset.records(), &[a_record([192, 0, 2, 1])]);
    }

    #[test]
    fn del_of_staged_add_cancels_it() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        assert!(rrset.del(&a_record([192, 0, 2, 1])));
        assert!(!rrset.has_pending());
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        rrset.add(a_record([192, 0, 2, 1]));
        rrset.commit();
        assert_eq!(rrset.records().len(), 1);
    }

    #[test]
    fn commit_sorts_canonically() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 10]));
        rrset.add(a_record([192, 0, 2, 1]));
        rrset.commit();
        assert_eq!(
            rrset.records(),
            &[a_record([192, 0, 2, 1]), a_record([192, 0, 2, 10])]
        );
    }

    #[test]
    fn commit_is_idempotent() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        assert!(rrset.commit());
        let records = rrset.records().to_vec();
        assert!(!rrset.commit());
        assert_eq!(rrset.records(), &records[..]);
    }

    #[test]
    fn diff_drops_signatures_of_retired_keys() {
        let mut rrset = Rrset::new(Rtype::A);
        rrset.add(a_record([192, 0, 2, 1]));
        rrset.commit();
        let sig = Record::new(
            Name::from_str("www.example.").unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Generic(Generic {
                rtype: Rtype::RRSIG,
                rdata: bytes::Bytes::new(),
            }),
        );
        rrset.add_rrsig(sig.clone(), "old-key".into());
        rrset.add_rrsig(sig, "new-key".into());
        rrset.mark_signed();

        rrset.diff(&["new-key"]);
        assert_eq!(rrset.rrsigs().len(), 1);
        assert!(rrset.needs_signing());
    }
}
