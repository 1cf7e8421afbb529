//! The zone data store.
//!
//! [`ZoneData`] owns the three ordered trees — authoritative domains,
//! denial chain, NSEC3 twins — and drives the phases of a signer pass
//! over them. The usual sequence after staging changes is
//! `examine`, `entize`, `update`, `nsecify` or `nsecify3`, `sign`,
//! `write_zone`.

use core::cmp;
use core::str::FromStr;

use std::io;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::base::iana::{Class, Rtype};
use crate::base::name::{Name, NameBuilder};
use crate::base::{Serial, Ttl};
use crate::rdata::nsec3::{nsec3_hash, OwnerHash};
use crate::rdata::{ProtoRrsig, Record, RecordData, Timestamp};
use crate::sign::config::{Nsec3Config, SerialPolicy, SignConfig};
use crate::sign::key::{KeyStore, SignContext, SignerKey};

use super::denial::{mk_nsec, mk_nsec3, Denial};
use super::domain::{Domain, DomainStatus};
use super::error::ZoneError;
use super::rrset::Rrset;
use super::tree::NameTree;
use super::Cancel;

//------------ AdapterMode ---------------------------------------------------

/// Where the zone data came from.
///
/// Structural violations are fatal for data that arrived over the wire and
/// warnings for data read from a zone file, where the operator is around
/// to see them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdapterMode {
    /// The zone was read from a file.
    File,

    /// The zone arrived over the wire.
    Wire,
}

//------------ ZoneData ------------------------------------------------------

/// The in-memory data of one zone.
#[derive(Clone, Debug)]
pub struct ZoneData {
    /// The apex name of the zone.
    pub(super) apex: Name,

    /// The class of the zone.
    pub(super) class: Class,

    /// The authoritative space, by canonical name.
    pub(super) domains: NameTree<Domain>,

    /// The denial chain, by owner of the denial records.
    pub(super) denials: NameTree<Denial>,

    /// The NSEC3 twins, by hashed owner name. Empty for NSEC zones.
    pub(super) nsec3_domains: NameTree<Domain>,

    /// The fallback TTL for synthesised records.
    pub(super) default_ttl: Ttl,

    /// The last SOA serial seen on input.
    pub(super) inbound_serial: Serial,

    /// The current working SOA serial.
    pub(super) internal_serial: Serial,

    /// The last SOA serial written out.
    pub(super) outbound_serial: Serial,

    /// Whether a serial has ever been assigned.
    pub(super) initialized: bool,
}

impl ZoneData {
    /// Creates empty zone data for the given apex.
    #[must_use]
    pub fn new(apex: Name, class: Class) -> Self {
        ZoneData {
            apex,
            class,
            domains: NameTree::new(),
            denials: NameTree::new(),
            nsec3_domains: NameTree::new(),
            default_ttl: Ttl::from_secs(3600),
            inbound_serial: Serial(0),
            internal_serial: Serial(0),
            outbound_serial: Serial(0),
            initialized: false,
        }
    }

    /// Returns the apex name.
    #[must_use]
    pub fn apex(&self) -> &Name {
        &self.apex
    }

    /// Returns the class of the zone.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the tree of authoritative domains.
    #[must_use]
    pub fn domains(&self) -> &NameTree<Domain> {
        &self.domains
    }

    /// Returns the denial chain.
    #[must_use]
    pub fn denials(&self) -> &NameTree<Denial> {
        &self.denials
    }

    /// Returns the tree of NSEC3 twins.
    #[must_use]
    pub fn nsec3_domains(&self) -> &NameTree<Domain> {
        &self.nsec3_domains
    }

    /// Returns the current working serial.
    #[must_use]
    pub fn internal_serial(&self) -> Serial {
        self.internal_serial
    }

    /// Returns the last serial written out.
    #[must_use]
    pub fn outbound_serial(&self) -> Serial {
        self.outbound_serial
    }

    /// Sets the fallback TTL for synthesised records.
    pub fn set_default_ttl(&mut self, ttl: Ttl) {
        self.default_ttl = ttl;
    }

    /// Records the SOA serial seen on input.
    pub fn set_inbound_serial(&mut self, serial: u32) {
        self.inbound_serial = Serial(serial);
    }

    /// Looks up a domain by name.
    #[must_use]
    pub fn lookup_domain(&self, name: &Name) -> Option<&Domain> {
        self.domains.get(name)
    }

    /// Looks up a denial node by owner.
    #[must_use]
    pub fn lookup_denial(&self, owner: &Name) -> Option<&Denial> {
        self.denials.get(owner)
    }

    //--- Staging changes

    /// Stages a record for addition.
    ///
    /// The domain is created if this is the first record at its name;
    /// `at_apex` marks a freshly created domain as the apex.
    pub fn add_rr(
        &mut self,
        record: Record,
        at_apex: bool,
    ) -> Result<(), ZoneError> {
        if record.class() != self.class {
            return Err(ZoneError::Arg("record class does not match zone"));
        }
        let name = record.owner().clone();
        if !self.domains.contains(&name) {
            let mut domain = Domain::new(name.clone());
            if at_apex {
                domain.status = DomainStatus::Apex;
            }
            self.add_domain(domain)?;
        }
        self.domains
            .get_mut(&name)
            .ok_or(ZoneError::Assert("domain vanished during add"))?
            .add_rr(record);
        Ok(())
    }

    /// Stages a record for deletion.
    ///
    /// Deleting from a name that does not exist is a warning, not an
    /// error.
    pub fn del_rr(&mut self, record: &Record) -> Result<(), ZoneError> {
        match self.domains.get_mut(record.owner()) {
            Some(domain) => {
                domain.del_rr(record);
                Ok(())
            }
            None => {
                warn!(
                    "nothing to delete: no domain {}",
                    record.owner()
                );
                Ok(())
            }
        }
    }

    /// Stages deletion of every committed record in the zone.
    pub fn del_rrs(&mut self) {
        for (_, domain) in self.domains.iter_mut() {
            domain.del_rrs();
        }
    }

    //--- Transactions

    /// Reconciles signatures with staged changes and the active key set.
    pub fn diff(&mut self, keys: &[SignerKey]) {
        let locators: Vec<&str> =
            keys.iter().map(SignerKey::locator).collect();
        for (_, domain) in self.domains.iter_mut() {
            domain.diff(&locators);
        }
        for (_, denial) in self.denials.iter_mut() {
            denial.rrset.diff(&locators);
        }
    }

    /// Applies all staged changes.
    ///
    /// Domains are committed in reverse canonical order. A domain left
    /// with no RRsets is deleted if it is a leaf with no denial node;
    /// deleting deepest-first lets emptied ancestors follow in the same
    /// pass. On failure the caller must [`rollback`][Self::rollback].
    pub fn commit(&mut self) -> Result<(), ZoneError> {
        let mut keys = self.domains.collect_keys();
        keys.reverse();
        for name in keys {
            {
                let Some(domain) = self.domains.get_mut(&name) else {
                    continue;
                };
                domain.commit()?;
            }
            let domain = self.domains.get(&name).unwrap();
            if domain.rrset_count() == 0 && domain.denial.is_none() {
                let is_leaf = match self.domains.next_after(&name) {
                    Some(next) => !next.is_strictly_below(&name),
                    None => true,
                };
                if is_leaf {
                    self.del_domain(&name);
                }
            }
        }
        Ok(())
    }

    /// Discards all staged changes, leaving structure intact.
    pub fn rollback(&mut self) {
        for (_, domain) in self.domains.iter_mut() {
            domain.rollback();
        }
    }

    /// Updates the serial and commits, the usual transaction driver.
    ///
    /// On any failure the staged changes are rolled back before the error
    /// is returned.
    pub fn update(&mut self, config: &SignConfig) -> Result<(), ZoneError> {
        if let Err(err) = self.update_serial(config) {
            self.rollback();
            return Err(err);
        }
        if let Err(err) = self.commit() {
            self.rollback();
            return Err(err);
        }
        self.replace_soa_serial();
        Ok(())
    }

    //--- Structure

    /// Closes the domain tree under empty non-terminals.
    ///
    /// Afterwards every domain other than the apex has its immediate
    /// ancestor present and wired, and statuses reflect the new
    /// surroundings.
    pub fn entize(&mut self) -> Result<(), ZoneError> {
        if self.domains.is_empty() {
            return Ok(());
        }
        for name in self.domains.collect_keys() {
            if !self.domains.contains(&name) {
                continue;
            }
            self.domain_entize(&name)?;
            let prev_status =
                self.domains.get(&name).map(|domain| domain.status);
            self.update_status(&name);
            let status = self.domains.get(&name).map(|domain| domain.status);
            if status == Some(DomainStatus::Occluded)
                && prev_status != Some(DomainStatus::Occluded)
            {
                self.revise_ent_ancestors(&name, DomainStatus::EntGlue);
            }
        }
        Ok(())
    }

    /// Wires one domain to its ancestors, creating them as needed.
    fn domain_entize(&mut self, name: &Name) -> Result<(), ZoneError> {
        let (has_parent, ent_to_unsigned) = {
            let domain = self
                .domains
                .get(name)
                .ok_or(ZoneError::Assert("entize of unknown domain"))?;
            (
                domain.parent.is_some(),
                domain.has_rrset(Rtype::NS)
                    && !domain.has_rrset(Rtype::DS),
            )
        };
        if has_parent {
            return Ok(());
        }

        let mut child = name.clone();
        while child.is_strictly_below(&self.apex) {
            let parent_name = child
                .parent()
                .ok_or(ZoneError::Assert("name below apex has no parent"))?;
            if self.domains.contains(&parent_name) {
                let parent = self.domains.get_mut(&parent_name).unwrap();
                parent.subdomain_count += 1;
                if !ent_to_unsigned {
                    parent.subdomain_auth += 1;
                }
                if parent.rrset_count() == 0
                    && parent.status != DomainStatus::EntAuth
                    && parent.status != DomainStatus::Apex
                {
                    parent.status = if ent_to_unsigned {
                        DomainStatus::EntNs
                    } else {
                        DomainStatus::EntAuth
                    };
                }
                self.domains.get_mut(&child).unwrap().parent =
                    Some(parent_name);
                break;
            }
            let mut parent = Domain::new(parent_name.clone());
            parent.status = if ent_to_unsigned {
                DomainStatus::EntNs
            } else {
                DomainStatus::EntAuth
            };
            parent.subdomain_count = 1;
            if !ent_to_unsigned {
                parent.subdomain_auth = 1;
            }
            self.add_domain(parent)?;
            self.domains.get_mut(&child).unwrap().parent =
                Some(parent_name.clone());
            child = parent_name;
        }
        Ok(())
    }

    /// Recomputes the status of one domain from content and surroundings.
    pub fn update_status(&mut self, name: &Name) {
        let Some(domain) = self.domains.get(name) else {
            return;
        };
        if *name == self.apex {
            self.domains.get_mut(name).unwrap().status =
                DomainStatus::Apex;
            return;
        }
        if !name.is_strictly_below(&self.apex) {
            self.domains.get_mut(name).unwrap().status =
                DomainStatus::None;
            return;
        }

        // Glue and occlusion are decided by the names above this one.
        let address_only = domain
            .rrsets()
            .all(|rrset| rrset.rtype().is_address());
        let mut override_status = None;
        let mut ancestor = name.parent();
        while let Some(ancestor_name) = ancestor {
            if !ancestor_name.is_strictly_below(&self.apex) {
                break;
            }
            if let Some(ancestor_domain) = self.domains.get(&ancestor_name)
            {
                if ancestor_domain.has_rrset(Rtype::DNAME) {
                    override_status = Some(DomainStatus::Occluded);
                    break;
                }
                if ancestor_domain.has_rrset(Rtype::NS) {
                    override_status = Some(
                        if address_only
                            && ancestor_domain.ns_rdata_signals(name)
                        {
                            // Signalled glue.
                            DomainStatus::None
                        } else {
                            DomainStatus::Occluded
                        },
                    );
                    break;
                }
            }
            ancestor = ancestor_name.parent();
        }

        let domain = self.domains.get_mut(name).unwrap();
        if let Some(status) = override_status {
            domain.status = status;
            return;
        }
        if domain.rrset_count() == 0 {
            if !domain.status.is_ent() {
                domain.status = DomainStatus::None;
            }
            return;
        }
        domain.status = if domain.has_rrset(Rtype::NS) {
            if domain.has_rrset(Rtype::DS) {
                DomainStatus::Ds
            } else {
                DomainStatus::Ns
            }
        } else {
            DomainStatus::Auth
        };
    }

    /// Rewrites the ENT statuses above a domain.
    fn revise_ent_ancestors(&mut self, name: &Name, status: DomainStatus) {
        let mut parent = self
            .domains
            .get(name)
            .and_then(|domain| domain.parent.clone());
        while let Some(parent_name) = parent {
            let Some(domain) = self.domains.get_mut(&parent_name) else {
                break;
            };
            if !domain.status.is_ent() {
                break;
            }
            domain.status = status;
            parent = domain.parent.clone();
        }
    }

    //--- Validation

    /// Checks the structural rules over all domains.
    ///
    /// CNAME/DNAME and zone-cut violations are fatal for wire input and
    /// warnings for file input. The occlusion walk only runs for file
    /// input and only ever warns.
    pub fn examine(&self, mode: AdapterMode) -> Result<(), ZoneError> {
        let mut violations = 0usize;
        for (name, domain) in self.domains.iter() {
            let mut bad =
                domain.examine_rrset_is_alone(Rtype::CNAME).is_err();
            bad |= domain
                .examine_rrset_is_singleton(Rtype::CNAME)
                .is_err();
            bad |= domain
                .examine_rrset_is_singleton(Rtype::DNAME)
                .is_err();
            if *name != self.apex {
                bad |= domain.examine_valid_zonecut().is_err();
            }
            if bad {
                violations += 1;
            }
            if mode == AdapterMode::File {
                self.examine_occluded(name, domain);
            }
        }
        if violations > 0 && mode == AdapterMode::Wire {
            return Err(ZoneError::Structural);
        }
        Ok(())
    }

    /// Warns about data hidden below DNAMEs and zone cuts.
    fn examine_occluded(&self, name: &Name, domain: &Domain) {
        if *name == self.apex {
            return;
        }
        let address_only = domain
            .rrsets()
            .all(|rrset| rrset.rtype().is_address());
        let mut ancestor = name.parent();
        while let Some(ancestor_name) = ancestor {
            if !ancestor_name.is_strictly_below(&self.apex) {
                break;
            }
            if let Some(ancestor_domain) = self.domains.get(&ancestor_name)
            {
                if ancestor_domain.has_rrset(Rtype::DNAME) {
                    warn!(
                        "occluded data at {} (below {} DNAME)",
                        name, ancestor_name
                    );
                    return;
                }
                if ancestor_domain.has_rrset(Rtype::NS) {
                    if !address_only {
                        warn!(
                            "occluded (non-glue) data at {} (below {} NS)",
                            name, ancestor_name
                        );
                    } else if !ancestor_domain.ns_rdata_signals(name) {
                        warn!(
                            "occluded data at {} (below {} NS)",
                            name, ancestor_name
                        );
                    }
                    return;
                }
            }
            ancestor = ancestor_name.parent();
        }
    }

    //--- The denial chain

    /// Drops the denial chain.
    pub fn wipe_nsec(&mut self) {
        self.denials.clear();
        for (_, domain) in self.domains.iter_mut() {
            domain.denial = None;
            domain.nsec_bitmap_changed = true;
            domain.nsec_nxt_changed = true;
        }
    }

    /// Drops the denial chain and the NSEC3 twin tree.
    pub fn wipe_nsec3(&mut self) {
        self.wipe_nsec();
        self.nsec3_domains.clear();
        for (_, domain) in self.domains.iter_mut() {
            domain.nsec3 = None;
        }
    }

    /// Returns whether a domain takes part in the NSEC chain.
    ///
    /// Empty non-terminals above authoritative data are part of the
    /// chain; glue, occluded data, and ENTs above glue only are not.
    fn nsec_eligible(domain: &Domain) -> bool {
        !matches!(
            domain.status,
            DomainStatus::None
                | DomainStatus::Occluded
                | DomainStatus::EntGlue
                | DomainStatus::Hash
        )
    }

    /// Returns whether a domain takes part in the NSEC3 chain.
    fn nsec3_eligible(domain: &Domain, opt_out: bool) -> bool {
        match domain.status {
            DomainStatus::None
            | DomainStatus::Occluded
            | DomainStatus::EntGlue
            | DomainStatus::Hash => false,
            DomainStatus::Ns | DomainStatus::EntNs if opt_out => {
                trace!("opt-out: {}", domain.name());
                false
            }
            _ => true,
        }
    }

    /// Rebuilds the NSEC chain from the committed tree.
    ///
    /// The chain is the canonical-order ring over all eligible domains;
    /// the last NSEC points back at the apex.
    pub fn nsecify(&mut self) -> Result<(), ZoneError> {
        self.wipe_nsec();
        if self.domains.is_empty() {
            return Ok(());
        }
        if !self
            .domains
            .get(&self.apex)
            .is_some_and(Self::nsec_eligible)
        {
            return Err(ZoneError::Assert("apex undefined"));
        }

        let ttl = self.denial_ttl();
        let class = self.class;
        let eligible: Vec<Name> = self
            .domains
            .iter()
            .filter(|(_, domain)| Self::nsec_eligible(domain))
            .map(|(name, _)| name.clone())
            .collect();

        for (i, name) in eligible.iter().enumerate() {
            let next = eligible[(i + 1) % eligible.len()].clone();
            let record = mk_nsec(
                self.domains.get(name).unwrap(),
                next,
                class,
                ttl,
            );
            let mut node =
                Denial::new(name.clone(), name.clone(), Rtype::NSEC);
            node.rrset.set_records(vec![record]);
            self.denials
                .insert(name.clone(), node)
                .map_err(|_| ZoneError::Conflict(name.clone()))?;
            let domain = self.domains.get_mut(name).unwrap();
            domain.denial = Some(name.clone());
            domain.nsec_bitmap_changed = false;
            domain.nsec_nxt_changed = false;
        }
        Ok(())
    }

    /// Rebuilds the NSEC3 chain from the committed tree.
    ///
    /// Twin domains are created under the hashed owner names, the
    /// NSEC3PARAM RRset is installed at the apex, and the ring of NSEC3
    /// records is laid over the twins in hash order. A hash collision
    /// between two distinct owner names aborts the build.
    pub fn nsecify3(
        &mut self,
        config: &Nsec3Config,
        cancel: &Cancel,
    ) -> Result<(), ZoneError> {
        let params = config.params.clone();
        let mut flags = params.flags;
        if config.opt_out {
            flags |= 0b0000_0001;
        }
        if !self.domains.contains(&self.apex) {
            return Err(ZoneError::Assert("apex undefined"));
        }

        self.wipe_nsec3();
        let ttl = self.denial_ttl();
        let class = self.class;

        // The parameters are zone data like everything else; the apex
        // bitmap picks the type up from here.
        let apex = self.apex.clone();
        let param_record = Record::new(
            apex.clone(),
            class,
            ttl,
            RecordData::Nsec3param(params.clone()),
        );
        self.domains
            .get_mut(&apex)
            .unwrap()
            .set_synthesized_rrset(param_record);

        // First pass: a twin under the hashed owner for every eligible
        // domain.
        for name in self.domains.collect_keys() {
            if cancel.is_canceled() {
                return Err(ZoneError::Canceled);
            }
            let Some(domain) = self.domains.get(&name) else {
                continue;
            };
            if !Self::nsec3_eligible(domain, config.opt_out) {
                trace!("nsecify3: skip {}", name);
                continue;
            }
            let hash = nsec3_hash(
                &name,
                params.hash_algorithm,
                params.iterations,
                &params.salt,
            )
            .map_err(|_| {
                ZoneError::Arg("unsupported NSEC3 parameters")
            })?;
            let mut builder = NameBuilder::new();
            builder
                .append_label(hash.to_label().as_bytes())
                .map_err(|_| ZoneError::Assert("hash label too long"))?;
            let owner = builder
                .append_origin(&self.apex)
                .map_err(|_| ZoneError::Assert("hashed owner too long"))?;

            if let Some(existing) = self.nsec3_domains.get(&owner) {
                let existing = existing
                    .nsec3
                    .clone()
                    .unwrap_or_else(Name::root);
                return Err(ZoneError::HashCollision {
                    existing,
                    incoming: name,
                });
            }
            let mut twin = Domain::new(owner.clone());
            twin.status = DomainStatus::Hash;
            twin.nsec3 = Some(name.clone());
            self.nsec3_domains
                .insert(owner.clone(), twin)
                .map_err(|_| ZoneError::Conflict(owner.clone()))?;
            trace!("nsecify3: twin {} for {}", owner, name);
            let domain = self.domains.get_mut(&name).unwrap();
            domain.nsec3 = Some(owner.clone());
            domain.denial = Some(owner);
        }

        // Second pass: the ring. Each twin’s next hashed owner is the
        // hash of its successor, taken from that twin’s first label; the
        // last twin wraps to the first.
        let twins = self.nsec3_domains.collect_keys();
        for (i, owner) in twins.iter().enumerate() {
            if cancel.is_canceled() {
                return Err(ZoneError::Canceled);
            }
            let next = &twins[(i + 1) % twins.len()];
            let label = next
                .iter_labels()
                .next()
                .ok_or(ZoneError::Assert("twin without labels"))?;
            let label = core::str::from_utf8(label)
                .map_err(|_| ZoneError::Assert("twin label not ASCII"))?;
            let next_hash = OwnerHash::from_str(label)
                .map_err(|_| ZoneError::Assert("twin label not a hash"))?;
            let original = self
                .nsec3_domains
                .get(owner)
                .and_then(|twin| twin.nsec3.clone())
                .ok_or(ZoneError::Assert("twin without back reference"))?;
            let record = {
                let domain = self
                    .domains
                    .get(&original)
                    .ok_or(ZoneError::Assert("twin of unknown domain"))?;
                mk_nsec3(
                    owner, domain, &params, flags, next_hash, class, ttl,
                )
            };
            let mut node =
                Denial::new(owner.clone(), original, Rtype::NSEC3);
            node.rrset.set_records(vec![record]);
            self.denials
                .insert(owner.clone(), node)
                .map_err(|_| ZoneError::Conflict(owner.clone()))?;
        }
        Ok(())
    }

    /// Returns the TTL for denial records: SOA MINIMUM, or the zone
    /// default when there is no SOA to ask.
    fn denial_ttl(&self) -> Ttl {
        self.domains
            .get(&self.apex)
            .and_then(|domain| domain.rrset(Rtype::SOA))
            .and_then(|rrset| rrset.records().first())
            .and_then(|record| match record.data() {
                RecordData::Soa(soa) => Some(soa.minimum),
                _ => None,
            })
            .unwrap_or(self.default_ttl)
    }

    //--- Serial maintenance

    /// Advances the working serial according to policy.
    fn update_serial(
        &mut self,
        config: &SignConfig,
    ) -> Result<(), ZoneError> {
        let prev = self.internal_serial;
        debug!(
            "update serial: inbound={} internal={} outbound={} policy={}",
            self.inbound_serial,
            self.internal_serial,
            self.outbound_serial,
            config.serial_policy
        );

        let mut base = match config.serial_policy {
            SerialPolicy::UnixTime => Serial(cmp::max(
                self.inbound_serial.into_int(),
                Serial::now().into_int(),
            )),
            SerialPolicy::Counter => {
                let base = cmp::max(
                    self.inbound_serial.into_int(),
                    prev.into_int(),
                );
                if !self.initialized {
                    self.internal_serial = Serial(base).add(1);
                    self.initialized = true;
                    return Ok(());
                }
                Serial(base)
            }
            SerialPolicy::DateCounter => {
                let date: u32 = Utc::now()
                    .format("%Y%m%d")
                    .to_string()
                    .parse()
                    .unwrap_or(0);
                Serial(cmp::max(
                    self.inbound_serial.into_int(),
                    date.saturating_mul(100),
                ))
            }
            SerialPolicy::Keep => {
                let soa = self.inbound_serial;
                if self.initialized && !soa.serial_gt(prev) {
                    warn!(
                        "cannot keep serial {} from input: \
                         working serial is {}",
                        soa, prev
                    );
                    return Err(ZoneError::Serial);
                }
                self.internal_serial = soa;
                self.initialized = true;
                return Ok(());
            }
        };

        if !base.serial_gt(prev) {
            base = prev.add(1);
        }
        let update = cmp::min(
            base.into_int().wrapping_sub(prev.into_int()),
            0x7FFF_FFFF,
        );
        self.internal_serial = prev.add(update);
        self.initialized = true;
        debug!(
            "update serial: previous={} update={} new={}",
            prev, update, self.internal_serial
        );
        Ok(())
    }

    /// Writes the working serial into the apex SOA record.
    fn replace_soa_serial(&mut self) {
        let serial = self.internal_serial;
        let apex = self.apex.clone();
        if let Some(domain) = self.domains.get_mut(&apex) {
            for rrset in domain.rrsets_mut() {
                if rrset.rtype() == Rtype::SOA {
                    rrset.replace_soa_serial(serial);
                }
            }
        }
    }

    //--- Signing

    /// Produces RRSIGs for everything that needs them.
    ///
    /// If the working serial does not exceed the last emitted one, the
    /// serial is advanced first; a serial policy failure aborts before
    /// any signing happens. The signing context is released on every exit
    /// path.
    pub fn sign<S: KeyStore>(
        &mut self,
        store: &S,
        config: &SignConfig,
        cancel: &Cancel,
    ) -> Result<(), ZoneError> {
        if !self.internal_serial.serial_gt(self.outbound_serial) {
            self.update_serial(config)?;
            self.replace_soa_serial();
        }

        let keys = store.keys();
        let zone_keys: Vec<&SignerKey> = keys
            .iter()
            .filter(|key| key.is_zone_signing_key())
            .collect();
        if zone_keys.is_empty() {
            return Err(ZoneError::Arg("no zone signing keys"));
        }
        let (ksks, zsks): (Vec<&SignerKey>, Vec<&SignerKey>) = zone_keys
            .iter()
            .copied()
            .partition(|key| key.is_secure_entry_point());
        let zsks = if zsks.is_empty() { zone_keys.clone() } else { zsks };
        let dnskey_keys = if ksks.is_empty() { zsks.clone() } else { ksks };

        let mut ctx = store.create_context()?;
        let now = Timestamp::now();
        let inception =
            now.offset_by(-i64::from(config.sig_inception_offset));
        let apex = self.apex.clone();
        let class = self.class;
        let mut rng = rand::thread_rng();
        debug!(
            "rrsig timers: offset={} jitter={} validity={}/{}",
            config.sig_inception_offset,
            config.sig_jitter,
            config.sig_validity_default,
            config.sig_validity_denial
        );

        for name in self.domains.collect_keys() {
            if cancel.is_canceled() {
                return Err(ZoneError::Canceled);
            }
            let Some(domain) = self.domains.get_mut(&name) else {
                continue;
            };
            let status = domain.status;
            if !matches!(
                status,
                DomainStatus::Apex
                    | DomainStatus::Auth
                    | DomainStatus::Ns
                    | DomainStatus::Ds
            ) {
                continue;
            }
            let at_cut =
                matches!(status, DomainStatus::Ns | DomainStatus::Ds);
            for rrset in domain.rrsets_mut() {
                if rrset.records().is_empty() {
                    continue;
                }
                // At a zone cut only the DS set is ours to sign; NS and
                // glue belong to the child.
                if at_cut && rrset.rtype() != Rtype::DS {
                    continue;
                }
                if !rrset.needs_signing() {
                    continue;
                }
                let keys = if rrset.rtype() == Rtype::DNSKEY {
                    &dnskey_keys
                } else {
                    &zsks
                };
                sign_rrset(
                    rrset,
                    &name,
                    &apex,
                    class,
                    keys,
                    &mut ctx,
                    inception,
                    now,
                    config.sig_validity_default,
                    config.sig_jitter,
                    &mut rng,
                )?;
            }
        }

        for owner in self.denials.collect_keys() {
            if cancel.is_canceled() {
                return Err(ZoneError::Canceled);
            }
            let Some(denial) = self.denials.get_mut(&owner) else {
                continue;
            };
            if denial.rrset.records().is_empty()
                || !denial.rrset.needs_signing()
            {
                continue;
            }
            sign_rrset(
                &mut denial.rrset,
                &owner,
                &apex,
                class,
                &zsks,
                &mut ctx,
                inception,
                now,
                config.sig_validity_denial,
                config.sig_jitter,
                &mut rng,
            )?;
            denial.bitmap_changed = false;
            denial.nxt_changed = false;
        }
        Ok(())
    }

    //--- Output

    /// Writes the committed zone in presentation form, canonical order.
    ///
    /// RRsets are followed by their signatures, domains by their denial
    /// records. On success the emitted serial becomes the outbound
    /// serial.
    pub fn write_zone<W: io::Write>(
        &mut self,
        target: &mut W,
    ) -> io::Result<()> {
        if self.domains.is_empty() {
            writeln!(target, "; empty zone")?;
            return Ok(());
        }
        for (name, domain) in self.domains.iter() {
            // The SOA leads the zone.
            if *name == self.apex {
                if let Some(rrset) = domain.rrset(Rtype::SOA) {
                    Self::write_rrset(target, rrset)?;
                }
            }
            for rrset in domain.rrsets() {
                if *name == self.apex && rrset.rtype() == Rtype::SOA {
                    continue;
                }
                Self::write_rrset(target, rrset)?;
            }
            if let Some(denial_owner) = &domain.denial {
                if let Some(denial) = self.denials.get(denial_owner) {
                    Self::write_rrset(target, &denial.rrset)?;
                }
            }
        }
        self.outbound_serial = self.internal_serial;
        Ok(())
    }

    fn write_rrset<W: io::Write>(
        target: &mut W,
        rrset: &Rrset,
    ) -> io::Result<()> {
        for record in rrset.records() {
            writeln!(target, "{record}")?;
        }
        for rrsig in rrset.rrsigs() {
            writeln!(target, "{}", rrsig.record)?;
        }
        Ok(())
    }

    //--- Internal tree maintenance

    /// Adds a domain, marking the ring neighbours stale.
    pub(super) fn add_domain(
        &mut self,
        mut domain: Domain,
    ) -> Result<(), ZoneError> {
        let name = domain.name().clone();
        domain.nsec_bitmap_changed = true;
        domain.nsec_nxt_changed = true;
        if self.domains.insert(name.clone(), domain).is_err() {
            return Err(ZoneError::Conflict(name));
        }
        trace!("+DD {name}");
        if let Some(prev) = self.domains.previous_circular(&name).cloned()
        {
            if prev != name {
                if let Some(prev) = self.domains.get_mut(&prev) {
                    prev.nsec_nxt_changed = true;
                }
            }
        }
        Ok(())
    }

    /// Deletes a domain with all its fixups.
    ///
    /// The predecessor is marked stale, the parent’s subdomain counters
    /// drop, and the domain’s denial node and NSEC3 twin go with it.
    pub(super) fn del_domain(&mut self, name: &Name) {
        let Some(domain) = self.domains.remove(name) else {
            warn!("unable to delete domain {}: not found", name);
            return;
        };
        trace!("-DD {name}");
        if let Some(prev) = self.domains.previous_circular(name).cloned() {
            if let Some(prev) = self.domains.get_mut(&prev) {
                prev.nsec_nxt_changed = true;
            }
        }
        if let Some(twin) = &domain.nsec3 {
            self.del_denial(twin);
            self.nsec3_domains.remove(twin);
        }
        if let Some(denial) = &domain.denial {
            self.del_denial(denial);
        }
        if let Some(parent_name) = &domain.parent {
            if let Some(parent) = self.domains.get_mut(parent_name) {
                parent.subdomain_count =
                    parent.subdomain_count.saturating_sub(1);
                if domain.status.is_auth_subdomain() {
                    parent.subdomain_auth =
                        parent.subdomain_auth.saturating_sub(1);
                }
            }
        }
    }

    /// Deletes a denial node, marking its predecessor stale.
    fn del_denial(&mut self, owner: &Name) {
        if self.denials.remove(owner).is_none() {
            return;
        }
        if let Some(prev) = self.denials.previous_circular(owner).cloned()
        {
            if let Some(prev) = self.denials.get_mut(&prev) {
                prev.nxt_changed = true;
            }
        }
    }
}

//------------ sign_rrset ----------------------------------------------------

/// Signs one RRset with each of the given keys.
#[allow(clippy::too_many_arguments)]
fn sign_rrset<C: SignContext, R: Rng>(
    rrset: &mut Rrset,
    owner: &Name,
    apex: &Name,
    class: Class,
    keys: &[&SignerKey],
    ctx: &mut C,
    inception: Timestamp,
    now: Timestamp,
    validity: u32,
    jitter: u32,
    rng: &mut R,
) -> Result<(), ZoneError> {
    let ttl = rrset.ttl().unwrap_or_default();
    rrset.drop_signatures();
    for key in keys {
        let spread = if jitter > 0 {
            rng.gen_range(0..=jitter)
        } else {
            0
        };
        let expiration =
            now.offset_by(i64::from(validity) + i64::from(spread));
        let proto = ProtoRrsig {
            type_covered: rrset.rtype(),
            algorithm: key.algorithm(),
            labels: owner.rrsig_label_count(),
            original_ttl: ttl,
            expiration,
            inception,
            key_tag: key.key_tag(),
            signer_name: apex.clone(),
        };
        let mut buf = Vec::new();
        proto.compose_canonical(&mut buf);
        for record in rrset.records() {
            record.compose_canonical(&mut buf);
        }
        let signature = ctx.sign(&buf, key.locator())?;
        let rrsig = proto.into_rrsig(signature);
        rrset.add_rrsig(
            Record::new(
                owner.clone(),
                class,
                ttl,
                RecordData::Rrsig(rrsig),
            ),
            key.locator().to_string(),
        );
    }
    rrset.mark_signed();
    Ok(())
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Nsec3HashAlg;
    use crate::rdata::{Generic, Ns, Soa};
    use bytes::Bytes;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn soa_data(serial: u32) -> RecordData {
        RecordData::Soa(Soa {
            mname: name("ns.example."),
            rname: name("host.example."),
            serial: serial.into(),
            refresh: Ttl::from_secs(10800),
            retry: Ttl::from_secs(3600),
            expire: Ttl::from_secs(604800),
            minimum: Ttl::from_secs(300),
        })
    }

    fn ns_data(target: &str) -> RecordData {
        RecordData::Ns(Ns {
            nsdname: name(target),
        })
    }

    fn a_data(last: u8) -> RecordData {
        RecordData::Generic(Generic {
            rtype: Rtype::A,
            rdata: Bytes::copy_from_slice(&[192, 0, 2, last]),
        })
    }

    fn rr(owner: &str, data: RecordData) -> Record {
        Record::new(name(owner), Class::IN, Ttl::from_secs(3600), data)
    }

    /// An apex with SOA and NS, committed.
    fn apex_zone() -> ZoneData {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        zone.add_rr(rr("example.", soa_data(1)), true).unwrap();
        zone.add_rr(rr("example.", ns_data("ns.other.")), true)
            .unwrap();
        zone
    }

    fn config(policy: SerialPolicy) -> SignConfig {
        SignConfig {
            serial_policy: policy,
            ..Default::default()
        }
    }

    //--- Serial policies

    #[test]
    fn counter_initial_is_inbound_plus_one() {
        let mut zone = apex_zone();
        zone.set_inbound_serial(41);
        zone.update_serial(&config(SerialPolicy::Counter)).unwrap();
        assert_eq!(zone.internal_serial(), Serial(42));
    }

    #[test]
    fn counter_increments_past_previous() {
        let mut zone = apex_zone();
        zone.set_inbound_serial(41);
        zone.update_serial(&config(SerialPolicy::Counter)).unwrap();
        zone.update_serial(&config(SerialPolicy::Counter)).unwrap();
        assert_eq!(zone.internal_serial(), Serial(43));
    }

    #[test]
    fn keep_takes_inbound_verbatim() {
        let mut zone = apex_zone();
        zone.set_inbound_serial(7);
        zone.update_serial(&config(SerialPolicy::Keep)).unwrap();
        assert_eq!(zone.internal_serial(), Serial(7));
    }

    #[test]
    fn keep_fails_on_non_increasing_inbound() {
        let mut zone = apex_zone();
        zone.set_inbound_serial(7);
        zone.update_serial(&config(SerialPolicy::Keep)).unwrap();
        zone.set_inbound_serial(5);
        assert_eq!(
            zone.update_serial(&config(SerialPolicy::Keep)),
            Err(ZoneError::Serial)
        );
    }

    #[test]
    fn unixtime_is_at_least_now() {
        let mut zone = apex_zone();
        let before = Serial::now();
        zone.update_serial(&config(SerialPolicy::UnixTime)).unwrap();
        assert!(
            zone.internal_serial() == before
                || zone.internal_serial().serial_gt(before)
        );
    }

    #[test]
    fn datecounter_has_date_shape() {
        let mut zone = apex_zone();
        zone.update_serial(&config(SerialPolicy::DateCounter))
            .unwrap();
        let serial = zone.internal_serial().into_int();
        assert_eq!(serial % 100, 0);
        assert!(serial / 100 > 20200101);
    }

    #[test]
    fn serial_always_advances() {
        for policy in [
            SerialPolicy::UnixTime,
            SerialPolicy::Counter,
            SerialPolicy::DateCounter,
        ] {
            let mut zone = apex_zone();
            zone.set_inbound_serial(3);
            zone.update_serial(&config(policy)).unwrap();
            let mut prev = zone.internal_serial();
            for _ in 0..3 {
                zone.update_serial(&config(policy)).unwrap();
                assert!(
                    zone.internal_serial().serial_gt(prev),
                    "{policy} did not advance"
                );
                prev = zone.internal_serial();
            }
        }
    }

    #[test]
    fn update_rewrites_soa_serial() {
        let mut zone = apex_zone();
        zone.set_inbound_serial(1);
        zone.update(&config(SerialPolicy::Counter)).unwrap();
        let apex = zone.lookup_domain(&name("example.")).unwrap();
        let soa = apex.rrset(Rtype::SOA).unwrap();
        let RecordData::Soa(soa) = soa.records()[0].data() else {
            panic!("no SOA");
        };
        assert_eq!(soa.serial, zone.internal_serial());
    }

    //--- Entize and statuses

    #[test]
    fn entize_closes_the_tree() {
        let mut zone = apex_zone();
        zone.add_rr(rr("a.b.c.example.", a_data(1)), false).unwrap();
        zone.entize().unwrap();

        // The intermediate names exist as empty non-terminals.
        for ent in ["b.c.example.", "c.example."] {
            let domain = zone.lookup_domain(&name(ent)).unwrap();
            assert_eq!(domain.status, DomainStatus::EntAuth, "{ent}");
            assert_eq!(domain.subdomain_count, 1, "{ent}");
            assert_eq!(domain.subdomain_auth, 1, "{ent}");
        }
        // Parents are wired to the immediate ancestor.
        assert_eq!(
            zone.lookup_domain(&name("a.b.c.example."))
                .unwrap()
                .parent,
            Some(name("b.c.example."))
        );
        assert_eq!(
            zone.lookup_domain(&name("c.example.")).unwrap().parent,
            Some(name("example."))
        );
    }

    #[test]
    fn entize_is_idempotent() {
        let mut zone = apex_zone();
        zone.add_rr(rr("a.b.example.", a_data(1)), false).unwrap();
        zone.entize().unwrap();
        zone.entize().unwrap();
        let ent = zone.lookup_domain(&name("b.example.")).unwrap();
        assert_eq!(ent.subdomain_count, 1);
        assert_eq!(
            zone.lookup_domain(&name("example."))
                .unwrap()
                .subdomain_count,
            1
        );
    }

    #[test]
    fn delegation_statuses() {
        let mut zone = apex_zone();
        zone.add_rr(rr("deleg.example.", ns_data("ns.deleg.example.")), false)
            .unwrap();
        zone.add_rr(rr("ns.deleg.example.", a_data(1)), false)
            .unwrap();
        zone.add_rr(rr("signed.example.", ns_data("ns.other.")), false)
            .unwrap();
        zone.add_rr(
            rr(
                "signed.example.",
                RecordData::Generic(Generic {
                    rtype: Rtype::DS,
                    rdata: Bytes::from_static(&[0, 1, 2, 3]),
                }),
            ),
            false,
        )
        .unwrap();
        zone.entize().unwrap();

        assert_eq!(
            zone.lookup_domain(&name("example.")).unwrap().status,
            DomainStatus::Apex
        );
        assert_eq!(
            zone.lookup_domain(&name("deleg.example.")).unwrap().status,
            DomainStatus::Ns
        );
        assert_eq!(
            zone.lookup_domain(&name("signed.example.")).unwrap().status,
            DomainStatus::Ds
        );
        // Signalled glue below the cut.
        assert_eq!(
            zone.lookup_domain(&name("ns.deleg.example."))
                .unwrap()
                .status,
            DomainStatus::None
        );
    }

    #[test]
    fn data_below_dname_is_occluded() {
        let mut zone = apex_zone();
        zone.add_rr(
            rr(
                "sub.example.",
                RecordData::Dname(crate::rdata::Dname {
                    target: name("other."),
                }),
            ),
            false,
        )
        .unwrap();
        zone.add_rr(rr("www.sub.example.", a_data(1)), false)
            .unwrap();
        zone.entize().unwrap();
        assert_eq!(
            zone.lookup_domain(&name("www.sub.example."))
                .unwrap()
                .status,
            DomainStatus::Occluded
        );
    }

    #[test]
    fn ents_above_occluded_become_glue() {
        let mut zone = apex_zone();
        zone.add_rr(rr("deleg.example.", ns_data("ns.other.")), false)
            .unwrap();
        zone.add_rr(rr("x.a.deleg.example.", a_data(1)), false)
            .unwrap();
        zone.entize().unwrap();
        assert_eq!(
            zone.lookup_domain(&name("x.a.deleg.example."))
                .unwrap()
                .status,
            DomainStatus::Occluded
        );
        assert_eq!(
            zone.lookup_domain(&name("a.deleg.example."))
                .unwrap()
                .status,
            DomainStatus::EntGlue
        );
    }

    //--- Transactions

    #[test]
    fn rollback_then_commit_leaves_empty_tree() {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        for i in 0..100u8 {
            zone.add_rr(
                rr(&format!("host{i}.example."), a_data(i)),
                false,
            )
            .unwrap();
        }
        zone.rollback();
        zone.commit().unwrap();
        assert!(zone.domains().is_empty());
    }

    #[test]
    fn rollback_restores_committed_state() {
        let mut zone = apex_zone();
        zone.add_rr(rr("www.example.", a_data(1)), false).unwrap();
        zone.commit().unwrap();

        zone.add_rr(rr("www.example.", a_data(2)), false).unwrap();
        zone.del_rr(&rr("www.example.", a_data(1))).unwrap();
        zone.rollback();
        zone.commit().unwrap();

        let domain = zone.lookup_domain(&name("www.example.")).unwrap();
        let rrset = domain.rrset(Rtype::A).unwrap();
        assert_eq!(rrset.records(), &[rr("www.example.", a_data(1))]);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut zone = apex_zone();
        zone.add_rr(rr("www.example.", a_data(1)), false).unwrap();
        zone.commit().unwrap();
        let before: Vec<_> = zone.domains().collect_keys();
        zone.commit().unwrap();
        assert_eq!(zone.domains().collect_keys(), before);
    }

    #[test]
    fn commit_prunes_emptied_branch() {
        let mut zone = apex_zone();
        zone.add_rr(rr("a.b.example.", a_data(1)), false).unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();
        assert!(zone.lookup_domain(&name("b.example.")).is_some());

        zone.del_rr(&rr("a.b.example.", a_data(1))).unwrap();
        zone.commit().unwrap();
        assert!(zone.lookup_domain(&name("a.b.example.")).is_none());
        assert!(zone.lookup_domain(&name("b.example.")).is_none());
        assert!(zone.lookup_domain(&name("example.")).is_some());
    }

    #[test]
    fn duplicate_domain_is_conflict() {
        let mut zone = apex_zone();
        assert!(matches!(
            zone.add_domain(Domain::new(name("example."))),
            Err(ZoneError::Conflict(_))
        ));
    }

    //--- The NSEC chain

    #[test]
    fn minimal_zone_nsec_points_at_itself() {
        let mut zone = apex_zone();
        zone.commit().unwrap();
        zone.nsecify().unwrap();

        assert_eq!(zone.domains().len(), 1);
        assert_eq!(zone.denials().len(), 1);
        let denial = zone.lookup_denial(&name("example.")).unwrap();
        let RecordData::Nsec(nsec) = denial.rrset.records()[0].data()
        else {
            panic!("no NSEC");
        };
        assert_eq!(nsec.next_name, name("example."));
        assert_eq!(
            nsec.types.iter().collect::<Vec<_>>(),
            [Rtype::NS, Rtype::SOA, Rtype::RRSIG, Rtype::NSEC]
        );
    }

    #[test]
    fn nsec_chain_covers_ents_and_skips_glue() {
        let mut zone = apex_zone();
        zone.add_rr(rr("a.b.c.example.", a_data(1)), false).unwrap();
        zone.add_rr(rr("deleg.example.", ns_data("ns.deleg.example.")), false)
            .unwrap();
        zone.add_rr(rr("ns.deleg.example.", a_data(2)), false)
            .unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();
        zone.nsecify().unwrap();

        // Chain: example. -> c.example. -> b.c.example.
        // -> a.b.c.example. -> deleg.example. -> (wrap). The glue at
        // ns.deleg.example. stays out.
        let ring = [
            "example.",
            "c.example.",
            "b.c.example.",
            "a.b.c.example.",
            "deleg.example.",
        ];
        assert_eq!(zone.denials().len(), ring.len());
        for (i, owner) in ring.iter().enumerate() {
            let denial = zone.lookup_denial(&name(owner)).unwrap();
            let RecordData::Nsec(nsec) = denial.rrset.records()[0].data()
            else {
                panic!("no NSEC at {owner}");
            };
            assert_eq!(
                nsec.next_name,
                name(ring[(i + 1) % ring.len()]),
                "next of {owner}"
            );
        }
        // The ENT NSECs announce nothing but the denial machinery.
        let ent = zone.lookup_denial(&name("b.c.example.")).unwrap();
        let RecordData::Nsec(nsec) = ent.rrset.records()[0].data() else {
            panic!("no NSEC");
        };
        assert_eq!(
            nsec.types.iter().collect::<Vec<_>>(),
            [Rtype::RRSIG, Rtype::NSEC]
        );
    }

    #[test]
    fn nsec_ttl_follows_soa_minimum() {
        let mut zone = apex_zone();
        zone.commit().unwrap();
        zone.nsecify().unwrap();
        let denial = zone.lookup_denial(&name("example.")).unwrap();
        assert_eq!(
            denial.rrset.records()[0].ttl(),
            Ttl::from_secs(300)
        );
    }

    //--- The NSEC3 chain

    #[test]
    fn nsec3_twins_hash_to_sha1_of_wire_name() {
        let mut zone = apex_zone();
        zone.add_rr(rr("a.b.c.example.", a_data(1)), false).unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();
        zone.nsecify3(&Nsec3Config::default(), &Cancel::new())
            .unwrap();

        // Apex, two ENTs, and the leaf.
        assert_eq!(zone.nsec3_domains().len(), 4);
        assert_eq!(zone.denials().len(), 4);

        for original in
            ["example.", "c.example.", "b.c.example.", "a.b.c.example."]
        {
            let original = name(original);
            let domain = zone.lookup_domain(&original).unwrap();
            let twin_owner = domain.nsec3.clone().expect("no twin");
            // The twin owner is base32hex(SHA-1(wire name)) under the
            // apex.
            let hash = nsec3_hash(
                &original,
                Nsec3HashAlg::SHA1,
                0,
                &crate::rdata::Nsec3Salt::empty(),
            )
            .unwrap();
            let expected = format!("{}.example.", hash.to_label());
            assert_eq!(twin_owner, name(&expected));
            assert!(zone.nsec3_domains().contains(&twin_owner));
        }
    }

    #[test]
    fn nsec3_ring_is_closed() {
        let mut zone = apex_zone();
        zone.add_rr(rr("www.example.", a_data(1)), false).unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();
        zone.nsecify3(&Nsec3Config::default(), &Cancel::new())
            .unwrap();

        let owners = zone.denials().collect_keys();
        let mut seen = 0;
        for owner in &owners {
            let denial = zone.lookup_denial(owner).unwrap();
            let RecordData::Nsec3(nsec3) =
                denial.rrset.records()[0].data()
            else {
                panic!("no NSEC3");
            };
            let next = name(&format!(
                "{}.example.",
                nsec3.next_owner.to_label()
            ));
            assert!(owners.contains(&next));
            seen += 1;
        }
        assert_eq!(seen, owners.len());
    }

    #[test]
    fn opt_out_skips_unsigned_delegations() {
        let mut zone = apex_zone();
        zone.add_rr(rr("deleg.example.", ns_data("ns.deleg.example.")), false)
            .unwrap();
        zone.add_rr(rr("ns.deleg.example.", a_data(1)), false)
            .unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();

        zone.nsecify3(&Nsec3Config::default(), &Cancel::new())
            .unwrap();
        assert_eq!(zone.denials().len(), 2);

        let opt_out = Nsec3Config {
            opt_out: true,
            ..Default::default()
        };
        zone.nsecify3(&opt_out, &Cancel::new()).unwrap();
        assert_eq!(zone.denials().len(), 1);
        let denial = zone
            .denials()
            .first()
            .map(|(_, denial)| denial)
            .unwrap();
        let RecordData::Nsec3(nsec3) = denial.rrset.records()[0].data()
        else {
            panic!("no NSEC3");
        };
        assert!(nsec3.opt_out());
    }

    #[test]
    fn nsec3param_is_installed_at_apex() {
        let mut zone = apex_zone();
        zone.commit().unwrap();
        zone.nsecify3(&Nsec3Config::default(), &Cancel::new())
            .unwrap();
        let apex = zone.lookup_domain(&name("example.")).unwrap();
        assert!(apex.has_rrset(Rtype::NSEC3PARAM));
        // And the apex twin's bitmap lists it.
        let twin_owner = apex.nsec3.clone().unwrap();
        let denial = zone.lookup_denial(&twin_owner).unwrap();
        let RecordData::Nsec3(nsec3) = denial.rrset.records()[0].data()
        else {
            panic!("no NSEC3");
        };
        assert!(nsec3.types.contains(Rtype::NSEC3PARAM));
        assert!(!nsec3.types.contains(Rtype::NSEC3));
    }

    #[test]
    fn nsecify3_honours_cancellation() {
        let mut zone = apex_zone();
        zone.commit().unwrap();
        let cancel = Cancel::new();
        cancel.cancel();
        assert_eq!(
            zone.nsecify3(&Nsec3Config::default(), &cancel),
            Err(ZoneError::Canceled)
        );
    }

    //--- Examine

    #[test]
    fn examine_rejects_cname_siblings_on_wire() {
        let mut zone = apex_zone();
        zone.add_rr(
            rr(
                "alias.example.",
                RecordData::Cname(crate::rdata::Cname {
                    cname: name("www.example."),
                }),
            ),
            false,
        )
        .unwrap();
        zone.add_rr(rr("alias.example.", a_data(1)), false).unwrap();

        assert_eq!(
            zone.examine(AdapterMode::Wire),
            Err(ZoneError::Structural)
        );
        // File mode only warns.
        assert_eq!(zone.examine(AdapterMode::File), Ok(()));
    }
}
