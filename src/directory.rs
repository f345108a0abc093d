// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rack directory
//!
//! Static mapping between rack identifiers (`A`..`J`) and their network
//! addresses. The directory is built once at startup from configuration and
//! is read-only afterwards; there is no runtime registration.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one sensor rack controller.
///
/// The fleet is addressed by single letters `A` through `J`. The identifier
/// appears verbatim as the second field of every logged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RackId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
}

impl RackId {
    /// All rack identifiers in canonical order.
    pub const ALL: [RackId; 10] = [
        RackId::A,
        RackId::B,
        RackId::C,
        RackId::D,
        RackId::E,
        RackId::F,
        RackId::G,
        RackId::H,
        RackId::I,
        RackId::J,
    ];

    /// The identifier as its single-letter string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RackId::A => "A",
            RackId::B => "B",
            RackId::C => "C",
            RackId::D => "D",
            RackId::E => "E",
            RackId::F => "F",
            RackId::G => "G",
            RackId::H => "H",
            RackId::I => "I",
            RackId::J => "J",
        }
    }
}

impl fmt::Display for RackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RackId {
    type Err = UnknownRack;

    /// Parse a rack identifier. Input is case-insensitive (`b` and `B` both
    /// name rack B).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RackId::A),
            "B" => Ok(RackId::B),
            "C" => Ok(RackId::C),
            "D" => Ok(RackId::D),
            "E" => Ok(RackId::E),
            "F" => Ok(RackId::F),
            "G" => Ok(RackId::G),
            "H" => Ok(RackId::H),
            "I" => Ok(RackId::I),
            "J" => Ok(RackId::J),
            _ => Err(UnknownRack(s.to_string())),
        }
    }
}

/// Lookup failure: the key names no rack in the directory.
///
/// Once argument validation has run this should not occur for a selector the
/// validator accepted; if it does, the validator and the directory disagree
/// on the rack enumeration and the process should stop before polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} does not name a rack in the directory - valid racks are A - J or 'all'")]
pub struct UnknownRack(pub String);

/// Which racks a run polls: a single rack or the whole directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RackSelector {
    /// Every rack in the directory, in directory order.
    All,
    /// One specific rack.
    Single(RackId),
}

impl RackSelector {
    /// Resolve the selector against a directory into the active rack set.
    ///
    /// The result preserves directory insertion order. Selecting a rack that
    /// is absent from the directory fails with [`UnknownRack`]; this is a
    /// startup configuration defect, not a per-round condition.
    pub fn resolve(&self, directory: &RackDirectory) -> Result<Vec<RackId>, UnknownRack> {
        match self {
            RackSelector::All => Ok(directory.rack_ids().collect()),
            RackSelector::Single(rack_id) => {
                directory.address_of(*rack_id)?;
                Ok(vec![*rack_id])
            }
        }
    }
}

impl fmt::Display for RackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RackSelector::All => f.write_str("all"),
            RackSelector::Single(rack_id) => write!(f, "{}", rack_id),
        }
    }
}

impl FromStr for RackSelector {
    type Err = UnknownRack;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(RackSelector::All)
        } else {
            Ok(RackSelector::Single(s.parse()?))
        }
    }
}

/// One-to-one mapping between rack ids and network endpoints.
///
/// Entries keep their insertion order, which fixes the deterministic order
/// the scheduler walks the fleet in. Both directions of the lookup are
/// served from the same entry list; with at most ten racks a linear scan is
/// the simplest correct structure.
#[derive(Debug, Clone)]
pub struct RackDirectory {
    entries: Vec<(RackId, SocketAddr)>,
}

impl RackDirectory {
    /// Build a directory from `(id, address)` entries.
    ///
    /// Fails if an id or an address appears more than once; the mapping must
    /// be bijective for the reverse lookup to be meaningful.
    pub fn new(entries: Vec<(RackId, SocketAddr)>) -> Result<Self, DirectoryError> {
        for (index, (rack_id, address)) in entries.iter().enumerate() {
            for (other_id, other_address) in &entries[..index] {
                if rack_id == other_id {
                    return Err(DirectoryError::DuplicateRack(*rack_id));
                }
                if address == other_address {
                    return Err(DirectoryError::DuplicateAddress(*address));
                }
            }
        }
        Ok(Self { entries })
    }

    /// The network address of a rack.
    pub fn address_of(&self, rack_id: RackId) -> Result<SocketAddr, UnknownRack> {
        self.entries
            .iter()
            .find(|(id, _)| *id == rack_id)
            .map(|(_, address)| *address)
            .ok_or_else(|| UnknownRack(rack_id.to_string()))
    }

    /// The rack answering at a network address.
    pub fn rack_id_of(&self, address: SocketAddr) -> Result<RackId, UnknownRack> {
        self.entries
            .iter()
            .find(|(_, a)| *a == address)
            .map(|(id, _)| *id)
            .ok_or_else(|| UnknownRack(address.to_string()))
    }

    /// All rack ids in insertion order.
    pub fn rack_ids(&self) -> impl Iterator<Item = RackId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Number of racks in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory holds no racks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors building a [`RackDirectory`].
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("rack {0} appears more than once in the rack directory")]
    DuplicateRack(RackId),
    #[error("address {0} is assigned to more than one rack")]
    DuplicateAddress(SocketAddr),
}
