//! An in-memory zone data engine for a DNSSEC signer.
//!
//! This crate holds the data of a single DNS zone between reading it from
//! some source and writing out a fully signed version: an ordered store of
//! domains keyed by canonical name, the empty-non-terminal closure over
//! that store, structural validity checks, NSEC and NSEC3 denial-of-
//! existence chains, SOA serial maintenance, and the commit/rollback
//! transaction over staged resource record changes.
//!
//! The centre of the crate is [`zone::ZoneData`]. Adapters stage changes
//! through [`add_rr`] and [`del_rr`], then drive the pipeline:
//! [`examine`], [`entize`], [`update`], [`nsecify`] or [`nsecify3`], and
//! finally [`sign`] against a [`sign::KeyStore`].
//!
//! What this crate does *not* do: transport, recursion, validation of
//! received data, key generation, or policy loading. Keys are reached
//! through the traits in [`sign`]; record parsing and serialisation beyond
//! the presentation forms needed for backups are the business of the
//! adapters.
//!
//! [`add_rr`]: zone::ZoneData::add_rr
//! [`del_rr`]: zone::ZoneData::del_rr
//! [`examine`]: zone::ZoneData::examine
//! [`entize`]: zone::ZoneData::entize
//! [`update`]: zone::ZoneData::update
//! [`nsecify`]: zone::ZoneData::nsecify
//! [`nsecify3`]: zone::ZoneData::nsecify3
//! [`sign`]: zone::ZoneData::sign

pub mod base;
pub mod rdata;
pub mod sign;
pub mod utils;
pub mod zone;
