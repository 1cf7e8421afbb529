//! Denial-of-existence nodes.
//!
//! A [`Denial`] is one node of the authenticated denial chain: the NSEC or
//! NSEC3 RRset at one owner name, a back reference to the domain it
//! covers, and the staleness flags the chain bookkeeping uses. The chain
//! itself — which domains are eligible, who is whose successor — is the
//! business of `ZoneData`; this module builds the records.

use crate::base::iana::{Class, Rtype};
use crate::base::name::Name;
use crate::base::Ttl;
use crate::rdata::nsec3::{Nsec3, Nsec3param, OwnerHash};
use crate::rdata::{Nsec, Record, RecordData, RtypeBitmap};

use super::domain::{Domain, DomainStatus};
use super::rrset::Rrset;

//------------ Denial --------------------------------------------------------

/// A node in the denial-of-existence chain.
#[derive(Clone, Debug)]
pub struct Denial {
    /// The owner of the denial records.
    ///
    /// For NSEC this is the domain name itself; for NSEC3 it is the
    /// hashed owner under the apex.
    owner: Name,

    /// The NSEC or NSEC3 RRset.
    pub rrset: Rrset,

    /// The name of the domain this node covers.
    pub domain: Name,

    /// Whether the type bitmap is stale.
    pub bitmap_changed: bool,

    /// Whether the next-owner pointer is stale.
    pub nxt_changed: bool,
}

impl Denial {
    /// Creates a denial node without records yet.
    #[must_use]
    pub fn new(owner: Name, domain: Name, rtype: Rtype) -> Self {
        Denial {
            owner,
            rrset: Rrset::new(rtype),
            domain,
            bitmap_changed: true,
            nxt_changed: true,
        }
    }

    /// Returns the owner of the denial records.
    #[must_use]
    pub fn owner(&self) -> &Name {
        &self.owner
    }
}

//------------ Record construction -------------------------------------------

/// Builds the NSEC record for a domain.
///
/// The bitmap lists the committed types at the domain plus NSEC itself and
/// RRSIG (RFC 4035, section 2.3).
#[must_use]
pub fn mk_nsec(
    domain: &Domain,
    next_name: Name,
    class: Class,
    ttl: Ttl,
) -> Record {
    let mut bitmap = RtypeBitmap::builder();
    bitmap.add(Rtype::NSEC);
    bitmap.add(Rtype::RRSIG);
    for rtype in domain.committed_types() {
        if !rtype.is_pseudo() {
            bitmap.add(rtype);
        }
    }
    Record::new(
        domain.name().clone(),
        class,
        ttl,
        RecordData::Nsec(Nsec {
            next_name,
            types: bitmap.finalize(),
        }),
    )
}

/// Builds the NSEC3 record for the twin of a domain.
///
/// The bitmap lists the committed types at the *original* domain plus
/// RRSIG where the name is signed. NSEC3 itself is never listed (RFC
/// 5155, section 7.1). Empty non-terminals get an empty bitmap. The
/// next-owner field is filled with the hash of the next twin by the
/// caller’s second pass.
#[must_use]
pub fn mk_nsec3(
    twin_owner: &Name,
    domain: &Domain,
    params: &Nsec3param,
    flags: u8,
    next_owner: OwnerHash,
    class: Class,
    ttl: Ttl,
) -> Record {
    let mut bitmap = RtypeBitmap::builder();
    if !domain.status.is_ent() {
        // An unsigned delegation carries no signatures of its own.
        if domain.status != DomainStatus::Ns {
            bitmap.add(Rtype::RRSIG);
        }
        for rtype in domain.committed_types() {
            if !rtype.is_pseudo() {
                bitmap.add(rtype);
            }
        }
    }
    Record::new(
        twin_owner.clone(),
        class,
        ttl,
        RecordData::Nsec3(Nsec3 {
            hash_algorithm: params.hash_algorithm,
            flags,
            iterations: params.iterations,
            salt: params.salt.clone(),
            next_owner,
            types: bitmap.finalize(),
        }),
    )
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Class;
    use crate::rdata::{Generic, Soa};
    use bytes::Bytes;
    use core::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn soa_domain(owner: &str) -> Domain {
        let mut domain = Domain::new(name(owner));
        domain.add_rr(Record::new(
            name(owner),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Soa(Soa {
                mname: name("ns.example."),
                rname: name("host.example."),
                serial: 1.into(),
                refresh: Ttl::from_secs(10800),
                retry: Ttl::from_secs(3600),
                expire: Ttl::from_secs(604800),
                minimum: Ttl::from_secs(3600),
            }),
        ));
        domain.commit().unwrap();
        domain
    }

    #[test]
    fn nsec_bitmap_includes_itself_and_rrsig() {
        let domain = soa_domain("example.");
        let record =
            mk_nsec(&domain, name("a.example."), Class::IN, Ttl::from_secs(3600));
        let RecordData::Nsec(nsec) = record.data() else {
            panic!("not an NSEC record");
        };
        assert_eq!(nsec.next_name, name("a.example."));
        assert_eq!(
            nsec.types.iter().collect::<Vec<_>>(),
            [Rtype::SOA, Rtype::RRSIG, Rtype::NSEC]
        );
    }

    #[test]
    fn nsec3_bitmap_never_lists_nsec3() {
        let domain = soa_domain("example.");
        let record = mk_nsec3(
            &name("hash.example."),
            &domain,
            &Nsec3param::default(),
            0,
            OwnerHash::from_octets(Bytes::from_static(&[0; 20])).unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
        );
        let RecordData::Nsec3(nsec3) = record.data() else {
            panic!("not an NSEC3 record");
        };
        assert!(!nsec3.types.contains(Rtype::NSEC3));
        assert!(nsec3.types.contains(Rtype::SOA));
        assert!(nsec3.types.contains(Rtype::RRSIG));
    }

    #[test]
    fn ent_twin_has_empty_bitmap() {
        let mut domain = Domain::new(name("ent.example."));
        domain.status = DomainStatus::EntAuth;
        let record = mk_nsec3(
            &name("hash.example."),
            &domain,
            &Nsec3param::default(),
            1,
            OwnerHash::from_octets(Bytes::from_static(&[0; 20])).unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
        );
        let RecordData::Nsec3(nsec3) = record.data() else {
            panic!("not an NSEC3 record");
        };
        assert!(nsec3.types.is_empty());
        assert!(nsec3.opt_out());
    }

    #[test]
    fn unsigned_delegation_bitmap_has_no_rrsig() {
        let mut domain = Domain::new(name("deleg.example."));
        domain.status = DomainStatus::Ns;
        domain.add_rr(Record::new(
            name("deleg.example."),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Generic(Generic {
                rtype: Rtype::NS,
                rdata: Bytes::from_static(b"\x02ns\x07example\x00"),
            }),
        ));
        domain.commit().unwrap();
        let record = mk_nsec3(
            &name("hash.example."),
            &domain,
            &Nsec3param::default(),
            0,
            OwnerHash::from_octets(Bytes::from_static(&[0; 20])).unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
        );
        let RecordData::Nsec3(nsec3) = record.data() else {
            panic!("not an NSEC3 record");
        };
        assert!(nsec3.types.contains(Rtype::NS));
        assert!(!nsec3.types.contains(Rtype::RRSIG));
    }
}
