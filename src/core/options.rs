//! Pack file behaviour options
//!
//! Options can be built in code or read from a TOML document:
//!
//! ```toml
//! uncache_policy = "keep-dirty"
//! offset_allocation = "append-after-max"
//! zero_length_is_absent = true
//! sync_on_save = true
//! ```

use crate::error::{PackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What `uncache` does with an entry holding unsaved content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncachePolicy {
    /// Refuse to uncache a dirty entry
    #[default]
    KeepDirty,
    /// Drop the cached bytes anyway; the pending edit is lost
    DiscardDirty,
}

/// How offsets are chosen for entries added between saves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetAllocation {
    /// Place after the furthest known content end, unless some entry is
    /// already unallocated
    #[default]
    AppendAfterMax,
    /// Leave every new entry unallocated until the next save
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackOptions {
    pub uncache_policy: UncachePolicy,

    pub offset_allocation: OffsetAllocation,

    /// Treat table rows with zero length as absent in `exists`
    pub zero_length_is_absent: bool,

    /// fsync the rewritten file before moving it into place
    pub sync_on_save: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            uncache_policy: UncachePolicy::KeepDirty,
            offset_allocation: OffsetAllocation::AppendAfterMax,
            zero_length_is_absent: true,
            sync_on_save: true,
        }
    }
}

impl PackOptions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PackError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PackError::Config(e.to_string()))
    }
}
