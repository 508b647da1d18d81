//! Host port bookkeeping.
//!
//! Every intent that exposes a WAN port claims the `(port, protocol)` pair here
//! first. Claims are cumulative for the life of the allocator and are never
//! released, so the same pair can only ever back one rule.
//!
//! ## Ranges
//!
//! [`PortAllocator::allocate_range`] claims ports in ascending order and stops at
//! the first conflict. Ports claimed before the conflict stay claimed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::Protocol;

/// Errors returned when claiming host ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Protocol name other than `tcp` or `udp`.
    #[error("unrecognized protocol: {0}")]
    InvalidProtocol(String),
    /// The pair is already claimed by an earlier rule.
    #[error("port {port} with protocol {protocol} has already been allocated")]
    PortConflict { port: u16, protocol: Protocol },
    /// Range whose start lies above its end.
    #[error("invalid port range {start}:{end}: start is greater than end")]
    InvalidRange { start: u16, end: u16 },
    /// Port outside 1..=65535.
    #[error("invalid port {0}: ports start at 1")]
    InvalidPort(u16),
}

/// One claimed `(port, protocol)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub port: u16,
    pub protocol: Protocol,
}

/// Table of claimed host ports keyed by port number.
#[derive(Debug, Clone, Default)]
pub struct PortAllocator {
    claimed: BTreeMap<u16, BTreeSet<Protocol>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `port` for `protocol`.
    ///
    /// # Errors
    ///
    /// - [`AllocationError::InvalidProtocol`] for anything but `tcp`/`udp`
    /// - [`AllocationError::InvalidPort`] for port 0
    /// - [`AllocationError::PortConflict`] if the pair is already claimed
    ///
    /// Nothing is recorded when an error is returned. On success the parsed
    /// protocol is returned.
    pub fn allocate(&mut self, port: u16, protocol: &str) -> Result<Protocol, AllocationError> {
        let protocol: Protocol = protocol.parse()?;
        self.claim(port, protocol)?;
        Ok(protocol)
    }

    /// Claim every port in `[min_port, max_port]` for `protocol`, ascending.
    ///
    /// Protocol and bounds are validated before anything is claimed. A conflict
    /// part-way through returns [`AllocationError::PortConflict`] and leaves the
    /// ports below the conflicting one claimed.
    pub fn allocate_range(
        &mut self,
        min_port: u16,
        max_port: u16,
        protocol: &str,
    ) -> Result<Protocol, AllocationError> {
        let protocol: Protocol = protocol.parse()?;
        if min_port > max_port {
            return Err(AllocationError::InvalidRange {
                start: min_port,
                end: max_port,
            });
        }

        for port in min_port..=max_port {
            if let Err(err) = self.claim(port, protocol) {
                if port > min_port {
                    warn!(
                        start = min_port,
                        end = max_port,
                        %protocol,
                        left_claimed = port - min_port,
                        "range allocation aborted part-way; earlier ports stay allocated"
                    );
                }
                return Err(err);
            }
        }
        Ok(protocol)
    }

    /// Whether `(port, protocol)` has been claimed.
    pub fn is_allocated(&self, port: u16, protocol: Protocol) -> bool {
        self.claimed
            .get(&port)
            .is_some_and(|set| set.contains(&protocol))
    }

    /// All claimed pairs ordered by port, then protocol.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.claimed
            .iter()
            .flat_map(|(port, protocols)| {
                protocols.iter().map(|protocol| Allocation {
                    port: *port,
                    protocol: *protocol,
                })
            })
            .collect()
    }

    /// Number of claimed pairs.
    pub fn len(&self) -> usize {
        self.claimed.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    fn claim(&mut self, port: u16, protocol: Protocol) -> Result<(), AllocationError> {
        if port == 0 {
            return Err(AllocationError::InvalidPort(port));
        }
        let protocols = self.claimed.entry(port).or_default();
        if !protocols.insert(protocol) {
            return Err(AllocationError::PortConflict { port, protocol });
        }
        debug!(port, %protocol, "allocated host port");
        Ok(())
    }
}
