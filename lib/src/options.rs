//! Shared option types that replace boolean flag parameters in the Rust API.

use crate::errors::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controls whether single-statement adds go through the write buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum CacheMode {
    /// Coalesce adds and flush them in batches.
    #[default]
    Enabled,
    /// Send every add to the remote store immediately.
    Disabled,
}

impl CacheMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, CacheMode::Enabled)
    }
}

impl From<bool> for CacheMode {
    fn from(value: bool) -> Self {
        if value {
            CacheMode::Enabled
        } else {
            CacheMode::Disabled
        }
    }
}

impl From<CacheMode> for bool {
    fn from(value: CacheMode) -> Self {
        value.is_enabled()
    }
}

/// Transaction isolation levels a caller may ask for.
///
/// The remote store only offers snapshot isolation; any other level is rejected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    #[default]
    Snapshot,
    SnapshotRead,
    Serializable,
}

impl IsolationLevel {
    pub const SUPPORTED: IsolationLevel = IsolationLevel::Snapshot;

    /// Fails fast for anything other than the single supported level.
    pub fn ensure_supported(self) -> Result<()> {
        if self == Self::SUPPORTED {
            Ok(())
        } else {
            Err(DriverError::IllegalState(format!(
                "isolation level {self} is not supported; only {} is available",
                Self::SUPPORTED
            )))
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "READ_UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::Snapshot => "SNAPSHOT",
            IsolationLevel::SnapshotRead => "SNAPSHOT_READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(name)
    }
}

/// Capability granted to a role on the graphs a write touches.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Capability {
    Read,
    Update,
    Execute,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Execute => "execute",
        }
    }
}
