//! Core implementation of the pack format
//!
//! - [`header`] and [`record`] - wire layout of the header and entry table
//! - [`io`] - little-endian, varint and positioned-read primitives
//! - [`catalog`] - entry table, name index, offset allocation
//! - [`content`] - cache-or-disk content access
//! - [`save`] - rewrite-on-save
//! - [`pack`] - the `PackFile` aggregate

pub mod catalog;
pub mod content;
pub mod error;
pub mod header;
pub mod io;
pub mod options;
pub mod pack;
pub mod record;
pub mod save;

pub use pack::PackFile;
