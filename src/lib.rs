//! # SharpPack - Single-File Container Format
//!
//! `sharppack` bundles many named byte blobs into one file and lets you read,
//! add, replace, rename and remove them individually. Changes live in memory
//! until [`PackFile::save`] rewrites the file.
//!
//! - **Flat names**: entries are keyed by opaque, case-sensitive strings
//! - **Read-through cache**: content is read from disk on demand or pinned in memory
//! - **Rewrite on save**: the whole file is re-serialized into a temp file and
//!   renamed into place, so the original is never half-written
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sharppack::{PackFile, Result};
//!
//! # fn main() -> Result<()> {
//! let mut pack = PackFile::open("assets.pck");
//! pack.add("textures/grass.png", b"...png bytes...");
//! pack.save()?;
//!
//! let mut pack = PackFile::open_and_load("assets.pck")?;
//! let data = pack.read_all("textures/grass.png", false)?;
//! assert!(data.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust,no_run
//! use sharppack::{PackFileBuilder, UncachePolicy};
//!
//! # fn main() -> sharppack::Result<()> {
//! let mut pack = PackFileBuilder::new()
//!     .path("assets.pck")
//!     .uncache_policy(UncachePolicy::DiscardDirty)
//!     .sync_on_save(false)
//!     .load()?;
//!
//! pack.update("config.json", b"{}");
//! pack.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## File Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ "SHARPPACKER" | u16 version | i32 count |   │
//! │ u32 flags                                   │
//! ├─────────────────────────────────────────────┤
//! │ count x { varint name_len, name,            │
//! │           i32 length, i32 offset }          │
//! ├─────────────────────────────────────────────┤
//! │ content region (entry bytes, table order)   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    catalog, content, error, header, io, options, pack, record, save,
};

pub use crate::core::{
    content::EntryStream,
    error::{PackError, Result},
    header::{MAGIC, VERSION},
    options::{OffsetAllocation, PackOptions, UncachePolicy},
    pack::{EntryInfo, PackFile, PackStats},
    save::SaveOutcome,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builder for configuring a [`PackFile`]
///
/// # Examples
///
/// ```rust,no_run
/// use sharppack::{OffsetAllocation, PackFileBuilder};
///
/// # fn main() -> sharppack::Result<()> {
/// let pack = PackFileBuilder::new()
///     .path("bundle.pck")
///     .offset_allocation(OffsetAllocation::Deferred)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackFileBuilder {
    path: Option<PathBuf>,
    options: PackOptions,
}

impl PackFileBuilder {
    /// Create a new PackFileBuilder with default options
    pub fn new() -> Self {
        PackFileBuilder {
            path: None,
            options: PackOptions::default(),
        }
    }

    /// Set the backing file path (required)
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace all options at once
    pub fn options(mut self, options: PackOptions) -> Self {
        self.options = options;
        self
    }

    /// Read options from a TOML file
    pub fn options_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.options = PackOptions::from_file(path)?;
        Ok(self)
    }

    pub fn uncache_policy(mut self, policy: UncachePolicy) -> Self {
        self.options.uncache_policy = policy;
        self
    }

    pub fn offset_allocation(mut self, allocation: OffsetAllocation) -> Self {
        self.options.offset_allocation = allocation;
        self
    }

    pub fn zero_length_is_absent(mut self, enabled: bool) -> Self {
        self.options.zero_length_is_absent = enabled;
        self
    }

    pub fn sync_on_save(mut self, enabled: bool) -> Self {
        self.options.sync_on_save = enabled;
        self
    }

    /// Build the PackFile without reading the backing file
    pub fn build(self) -> Result<PackFile> {
        let path = self
            .path
            .ok_or_else(|| PackError::Config("path must be set".to_string()))?;

        debug!("Building pack file for {:?} with {:?}", path, self.options);
        Ok(PackFile::with_options(path, self.options))
    }

    /// Build the PackFile and load it from disk
    pub fn load(self) -> Result<PackFile> {
        let mut pack = self.build()?;
        info!("Loading pack file {:?}", pack.path());
        pack.load()?;
        Ok(pack)
    }
}
