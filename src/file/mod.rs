//! Image data sources and low-level readers.
//!
//! A PE image is always accessed through a [`crate::file::Backend`]: either a read-only memory
//! mapping of a file on disk ([`crate::file::Physical`]) or an owned buffer
//! ([`crate::file::Memory`]). The backend owns the bytes; every structure the crate
//! derives from an image borrows from it and lives no longer than it.
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for the two data sources
//! - [`crate::file::Physical`] - Memory-mapped file backend
//! - [`crate::file::Memory`] - In-memory buffer backend

mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::Result;

/// Backend trait for image data sources.
///
/// The trait abstracts over where the image bytes come from, so the section catalog and the
/// symbol resolver work the same on a mapped file and on a buffer built in memory.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the data buffer is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared bounds check used by both backends.
pub(crate) fn checked_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let Some(offset_end) = offset.checked_add(len) else {
        return Err(crate::Error::OutOfBounds);
    };

    if offset_end > data.len() {
        return Err(crate::Error::OutOfBounds);
    }

    Ok(&data[offset..offset_end])
}
