//! Zip archive access for extension installation.
//!
//! [`ReadArchive`] walks the entries of an archive forward-only and streams
//! their data block by block. [`WriteArchive`] materialises those entries
//! under a destination directory it refuses to leave.

mod reader;
mod writer;

pub use reader::{
    BlockSink, EntryHandle, EntryKind, MAX_ENTRY_COUNT, MAX_EXTRACTED_SIZE, ReadArchive,
};
pub use writer::{WriteArchive, validate_entry_path};
