//! Backing up zone data between runs.
//!
//! The backup is a line-oriented ASCII stream bracketed by a magic line.
//! Domains appear in canonical traversal order as `;DNAME` lines, NSEC3
//! twins as `;DNAME3` lines attached to the preceding domain, and denial
//! records as `;NSEC`/`;NSEC3` lines in presentation form. Anything
//! outside that grammar marks the backup corrupted, in which case the
//! caller must start over from the source zone rather than trust partial
//! state.

use std::io;

use crate::base::iana::{Class, Nsec3HashAlg, Rtype};
use crate::base::name::Name;
use crate::base::Ttl;
use crate::rdata::nsec3::{Nsec3, Nsec3Salt, OwnerHash};
use crate::rdata::{Nsec, Record, RecordData, RtypeBitmap};

use super::data::ZoneData;
use super::denial::Denial;
use super::domain::{Domain, DomainStatus};
use super::error::ZoneError;

/// The first and last line of a backup stream.
pub const FILE_MAGIC: &str = ";;ZONEDATA;1";

impl ZoneData {
    /// Writes the backup stream for this zone.
    pub fn write_backup<W: io::Write>(
        &self,
        target: &mut W,
    ) -> io::Result<()> {
        writeln!(target, "{FILE_MAGIC}")?;
        for (name, domain) in self.domains.iter() {
            writeln!(target, ";DNAME {} {}", name, domain.status)?;
            if let Some(twin_owner) = &domain.nsec3 {
                if let Some(twin) = self.nsec3_domains.get(twin_owner) {
                    writeln!(
                        target,
                        ";DNAME3 {} {}",
                        twin_owner, twin.status
                    )?;
                }
            }
            if let Some(denial_owner) = &domain.denial {
                if let Some(denial) = self.denials.get(denial_owner) {
                    for record in denial.rrset.records() {
                        if record.rtype() == Rtype::NSEC {
                            writeln!(target, ";NSEC {record}")?;
                        } else if record.rtype() == Rtype::NSEC3 {
                            writeln!(target, ";NSEC3 {record}")?;
                        }
                    }
                }
            }
        }
        writeln!(target, "{FILE_MAGIC}")?;
        Ok(())
    }

    /// Recovers zone data from a backup stream.
    ///
    /// On [`ZoneError::BackupCorrupt`] the zone holds partial state and
    /// must be discarded; the caller falls back to re-reading the source
    /// zone.
    pub fn recover_backup<R: io::BufRead>(
        &mut self,
        reader: R,
    ) -> Result<(), ZoneError> {
        let mut lines = reader.lines();
        match lines.next() {
            Some(Ok(line)) if line.trim_end() == FILE_MAGIC => {}
            _ => return Err(ZoneError::BackupCorrupt),
        }
        let mut current: Option<Name> = None;
        for line in lines {
            let line = line.map_err(|_| ZoneError::BackupCorrupt)?;
            let line = line.trim_end();
            if line == FILE_MAGIC {
                return Ok(());
            }
            if let Some(rest) = line.strip_prefix(";DNAME3 ") {
                self.recover_twin(rest, &current)?;
            } else if let Some(rest) = line.strip_prefix(";DNAME ") {
                current = Some(self.recover_domain(rest)?);
            } else if let Some(rest) = line.strip_prefix(";NSEC3 ") {
                self.recover_nsec3(rest, &current)?;
            } else if let Some(rest) = line.strip_prefix(";NSEC ") {
                self.recover_nsec(rest, &current)?;
            } else {
                return Err(ZoneError::BackupCorrupt);
            }
        }
        // The stream ended without the closing magic.
        Err(ZoneError::BackupCorrupt)
    }

    /// Recovers one `;DNAME` line.
    fn recover_domain(&mut self, rest: &str) -> Result<Name, ZoneError> {
        let mut parts = rest.split_whitespace();
        let name: Name = parts
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or(ZoneError::BackupCorrupt)?;
        let status: DomainStatus = parts
            .next()
            .ok_or(ZoneError::BackupCorrupt)?
            .parse()?;
        if parts.next().is_some() {
            return Err(ZoneError::BackupCorrupt);
        }
        let mut domain = Domain::new(name.clone());
        domain.status = status;
        if status != DomainStatus::Apex {
            // Canonical order guarantees the parent came first.
            let parent_name =
                name.parent().ok_or(ZoneError::BackupCorrupt)?;
            let parent = self
                .domains
                .get_mut(&parent_name)
                .ok_or(ZoneError::BackupCorrupt)?;
            parent.subdomain_count += 1;
            if status.is_auth_subdomain() {
                parent.subdomain_auth += 1;
            }
            domain.parent = Some(parent_name);
        }
        self.domains
            .insert(name.clone(), domain)
            .map_err(|_| ZoneError::BackupCorrupt)?;
        Ok(name)
    }

    /// Recovers one `;DNAME3` line, attaching the twin to the preceding
    /// domain.
    fn recover_twin(
        &mut self,
        rest: &str,
        current: &Option<Name>,
    ) -> Result<(), ZoneError> {
        let current =
            current.as_ref().ok_or(ZoneError::BackupCorrupt)?;
        let mut parts = rest.split_whitespace();
        let name: Name = parts
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or(ZoneError::BackupCorrupt)?;
        let status: DomainStatus = parts
            .next()
            .ok_or(ZoneError::BackupCorrupt)?
            .parse()?;
        if status != DomainStatus::Hash || parts.next().is_some() {
            return Err(ZoneError::BackupCorrupt);
        }
        let mut twin = Domain::new(name.clone());
        twin.status = DomainStatus::Hash;
        twin.nsec3 = Some(current.clone());
        self.nsec3_domains
            .insert(name.clone(), twin)
            .map_err(|_| ZoneError::BackupCorrupt)?;
        let domain = self
            .domains
            .get_mut(current)
            .ok_or(ZoneError::BackupCorrupt)?;
        domain.nsec3 = Some(name.clone());
        domain.denial = Some(name);
        Ok(())
    }

    /// Recovers one `;NSEC` line for the preceding domain.
    fn recover_nsec(
        &mut self,
        rest: &str,
        current: &Option<Name>,
    ) -> Result<(), ZoneError> {
        let current =
            current.as_ref().ok_or(ZoneError::BackupCorrupt)?;
        let record = parse_rr(rest)?;
        if record.rtype() != Rtype::NSEC || record.owner() != current {
            return Err(ZoneError::BackupCorrupt);
        }
        let mut node =
            Denial::new(current.clone(), current.clone(), Rtype::NSEC);
        node.rrset.set_records(vec![record]);
        self.denials
            .insert(current.clone(), node)
            .map_err(|_| ZoneError::BackupCorrupt)?;
        self.domains
            .get_mut(current)
            .ok_or(ZoneError::BackupCorrupt)?
            .denial = Some(current.clone());
        Ok(())
    }

    /// Recovers one `;NSEC3` line for the preceding domain’s twin.
    fn recover_nsec3(
        &mut self,
        rest: &str,
        current: &Option<Name>,
    ) -> Result<(), ZoneError> {
        let current =
            current.as_ref().ok_or(ZoneError::BackupCorrupt)?;
        let twin_owner = self
            .domains
            .get(current)
            .and_then(|domain| domain.nsec3.clone())
            .ok_or(ZoneError::BackupCorrupt)?;
        let record = parse_rr(rest)?;
        if record.rtype() != Rtype::NSEC3
            || record.owner() != &twin_owner
        {
            return Err(ZoneError::BackupCorrupt);
        }
        let mut node = Denial::new(
            twin_owner.clone(),
            current.clone(),
            Rtype::NSEC3,
        );
        node.rrset.set_records(vec![record]);
        self.denials
            .insert(twin_owner, node)
            .map_err(|_| ZoneError::BackupCorrupt)?;
        Ok(())
    }
}

/// Parses an NSEC or NSEC3 record from its presentation form.
fn parse_rr(text: &str) -> Result<Record, ZoneError> {
    let mut parts = text.split_whitespace();
    let owner: Name = next_parsed(&mut parts)?;
    let ttl: u32 = next_parsed(&mut parts)?;
    let class: Class = next_parsed(&mut parts)?;
    let rtype: Rtype = next_parsed(&mut parts)?;
    let data = if rtype == Rtype::NSEC {
        let next_name: Name = next_parsed(&mut parts)?;
        RecordData::Nsec(Nsec {
            next_name,
            types: parse_bitmap(parts)?,
        })
    } else if rtype == Rtype::NSEC3 {
        let hash_algorithm =
            Nsec3HashAlg::from_int(next_parsed::<u8, _>(&mut parts)?);
        let flags: u8 = next_parsed(&mut parts)?;
        let iterations: u16 = next_parsed(&mut parts)?;
        let salt: Nsec3Salt = next_parsed(&mut parts)?;
        let next_owner: OwnerHash = next_parsed(&mut parts)?;
        RecordData::Nsec3(Nsec3 {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next_owner,
            types: parse_bitmap(parts)?,
        })
    } else {
        return Err(ZoneError::BackupCorrupt);
    };
    Ok(Record::new(owner, class, Ttl::from_secs(ttl), data))
}

/// Parses the next whitespace token into any `FromStr` type.
fn next_parsed<'a, T, I>(parts: &mut I) -> Result<T, ZoneError>
where
    T: core::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    parts
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or(ZoneError::BackupCorrupt)
}

/// Parses the trailing type mnemonics into a bitmap.
fn parse_bitmap<'a>(
    parts: impl Iterator<Item = &'a str>,
) -> Result<RtypeBitmap, ZoneError> {
    let mut bitmap = RtypeBitmap::builder();
    for token in parts {
        bitmap.add(
            token
                .parse::<Rtype>()
                .map_err(|_| ZoneError::BackupCorrupt)?,
        );
    }
    Ok(bitmap.finalize())
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::sign::config::Nsec3Config;
    use crate::zone::Cancel;
    use core::str::FromStr;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn small_zone() -> ZoneData {
        use crate::rdata::{Generic, Soa};
        let mut zone = ZoneData::new(name("example."), Class::IN);
        zone.add_rr(
            Record::new(
                name("example."),
                Class::IN,
                Ttl::from_secs(3600),
                RecordData::Soa(Soa {
                    mname: name("ns.example."),
                    rname: name("host.example."),
                    serial: 1.into(),
                    refresh: Ttl::from_secs(10800),
                    retry: Ttl::from_secs(3600),
                    expire: Ttl::from_secs(604800),
                    minimum: Ttl::from_secs(300),
                }),
            ),
            true,
        )
        .unwrap();
        zone.add_rr(
            Record::new(
                name("a.b.example."),
                Class::IN,
                Ttl::from_secs(3600),
                RecordData::Generic(Generic {
                    rtype: Rtype::A,
                    rdata: bytes::Bytes::from_static(&[192, 0, 2, 1]),
                }),
            ),
            false,
        )
        .unwrap();
        zone.entize().unwrap();
        zone.commit().unwrap();
        zone
    }

    #[test]
    fn nsec_round_trip() {
        let mut zone = small_zone();
        zone.nsecify().unwrap();

        let mut stream = Vec::new();
        zone.write_backup(&mut stream).unwrap();

        let mut recovered =
            ZoneData::new(name("example."), Class::IN);
        recovered.recover_backup(&stream[..]).unwrap();

        let mut stream_again = Vec::new();
        recovered.write_backup(&mut stream_again).unwrap();
        assert_eq!(stream, stream_again);
        assert_eq!(recovered.domains().len(), zone.domains().len());
        assert_eq!(recovered.denials().len(), zone.denials().len());
    }

    #[test]
    fn nsec3_round_trip() {
        let mut zone = small_zone();
        zone.nsecify3(&Nsec3Config::default(), &Cancel::new())
            .unwrap();

        let mut stream = Vec::new();
        zone.write_backup(&mut stream).unwrap();

        let mut recovered =
            ZoneData::new(name("example."), Class::IN);
        recovered.recover_backup(&stream[..]).unwrap();

        let mut stream_again = Vec::new();
        recovered.write_backup(&mut stream_again).unwrap();
        assert_eq!(stream, stream_again);
        assert_eq!(
            recovered.nsec3_domains().len(),
            zone.nsec3_domains().len()
        );
    }

    #[test]
    fn missing_magic_is_corrupt() {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        assert_eq!(
            zone.recover_backup(&b";DNAME example. APEX\n"[..]),
            Err(ZoneError::BackupCorrupt)
        );
    }

    #[test]
    fn unknown_token_is_corrupt() {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        let stream = format!(
            "{FILE_MAGIC}\n;DNAME example. APEX\n;BOGUS x\n{FILE_MAGIC}\n"
        );
        assert_eq!(
            zone.recover_backup(stream.as_bytes()),
            Err(ZoneError::BackupCorrupt)
        );
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        let stream = format!("{FILE_MAGIC}\n;DNAME example. APEX\n");
        assert_eq!(
            zone.recover_backup(stream.as_bytes()),
            Err(ZoneError::BackupCorrupt)
        );
    }

    #[test]
    fn orphan_twin_is_corrupt() {
        let mut zone = ZoneData::new(name("example."), Class::IN);
        let stream =
            format!("{FILE_MAGIC}\n;DNAME3 abc.example. HASH\n{FILE_MAGIC}\n");
        assert_eq!(
            zone.recover_backup(stream.as_bytes()),
            Err(ZoneError::BackupCorrupt)
        );
    }
}
