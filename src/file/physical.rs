//! Memory-mapped file backend.
//!
//! [`crate::file::Physical`] maps a whole file read-only into the address space and
//! owns that mapping for as long as the backend lives. Dropping the backend releases the
//! mapping exactly once; the file handle it was created from may be closed immediately after
//! construction, the mapping keeps the pages alive on its own.

use super::{checked_slice, Backend};
use crate::{
    Error::{FileError, MappingError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses a read-only memory mapping of an image on disk.
///
/// # Examples
///
/// ```rust,ignore
/// use dwarf_pe::file::{Physical, Backend};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("app.exe"))?;
/// assert_eq!(physical.data_slice(0, 2)?, b"MZ");
/// # Ok::<(), dwarf_pe::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the file at `path`.
    ///
    /// # Arguments
    /// * `path` - Path to the image on disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::MappingError`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;

        Self::from_std_file(&file)
    }

    /// Creates a new physical file backend from an opened file handle.
    ///
    /// The handle must be open for reading. It is only borrowed: the mapping stays valid
    /// after the caller closes it.
    ///
    /// # Arguments
    /// * `file` - An opened file handle
    ///
    /// # Errors
    /// Returns [`crate::Error::MappingError`] if memory mapping fails.
    pub fn from_std_file(file: &fs::File) -> Result<Physical> {
        // SAFETY: the mapping is read-only and never handed out mutably; concurrent
        // modification of the file by another process is outside our control.
        let mmap = unsafe { Mmap::map(file) }.map_err(MappingError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        checked_slice(&self.data, offset, len)
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
