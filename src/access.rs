//! The object access protocol consumed by DWARF readers.
//!
//! A DWARF reader does not care what container format it is reading from; it needs a fixed
//! set of five operations: the number of sections, a description of each, the byte order, the
//! address size and the raw bytes of a section. [`ObjectAccess`] is that protocol.
//!
//! Section indices follow the ELF convention: index `0` is always an empty placeholder with no
//! name and no data, and real sections are numbered from `1`. Formats whose native numbering
//! starts at `1` (like PE/COFF) therefore report one more section than they store.

use std::borrow::Cow;

use log::warn;

use crate::Result;

/// Byte order of the multi-byte values inside the object's sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Description of one section as seen through [`ObjectAccess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo<'a> {
    /// Section name, empty for the placeholder section
    pub name: Cow<'a, str>,
    /// Number of bytes available from [`ObjectAccess::load_section`]
    pub size: u64,
    /// Load address; always `0` for sections read from a file
    pub addr: u64,
    /// Index of an associated section; unused, always `0`
    pub link: u64,
    /// Size of fixed-size entries; unused, always `0`
    pub entry_size: u64,
}

impl SectionInfo<'_> {
    /// The placeholder reported for section index `0`.
    #[must_use]
    pub fn empty() -> SectionInfo<'static> {
        SectionInfo {
            name: Cow::Borrowed(""),
            size: 0,
            addr: 0,
            link: 0,
            entry_size: 0,
        }
    }

    /// Detach the description from the object it was read from.
    #[must_use]
    pub fn into_owned(self) -> SectionInfo<'static> {
        SectionInfo {
            name: Cow::Owned(self.name.into_owned()),
            size: self.size,
            addr: self.addr,
            link: self.link,
            entry_size: self.entry_size,
        }
    }
}

/// The five operations a DWARF reader needs from an object file.
pub trait ObjectAccess {
    /// Number of sections, including the placeholder at index `0`. Always at least `1`.
    fn section_count(&self) -> usize;

    /// Describe the section at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoEntry`] if `index` is not below [`Self::section_count`], or
    /// [`crate::Error::Malformed`] if the section name cannot be resolved.
    fn section_info(&self, index: usize) -> Result<SectionInfo<'_>>;

    /// Byte order of the object.
    fn byte_order(&self) -> ByteOrder;

    /// Size of a target address in bytes, or `0` if the object's bitness is not recognized.
    ///
    /// A reader must refuse to work with an object reporting `0`.
    fn address_size(&self) -> u8;

    /// The raw bytes of the section at `index`, exactly `section_info(index).size` long.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoEntry`] for the placeholder section and out-of-range indices,
    /// or [`crate::Error::Malformed`] if the section data lies outside the image.
    fn load_section(&self, index: usize) -> Result<&[u8]>;

    /// Find the first non-empty section called `name`.
    ///
    /// Returns the section index together with its description. A section that cannot be
    /// described (an unresolvable long name, say) is skipped with a warning, so one damaged
    /// record does not hide the sections after it.
    ///
    /// # Errors
    /// The provided implementation does not fail; implementors overriding it may.
    fn find_section(&self, name: &str) -> Result<Option<(usize, SectionInfo<'_>)>> {
        for index in 1..self.section_count() {
            let info = match self.section_info(index) {
                Ok(info) => info,
                Err(error) => {
                    warn!(
                        "Skipping section {} while looking for '{}': {}",
                        index, name, error
                    );
                    continue;
                }
            };
            if info.size == 0 {
                continue;
            }

            if info.name == name {
                return Ok(Some((index, info)));
            }
        }

        Ok(None)
    }

    /// The bytes of the first non-empty section called `name`, if there is one.
    ///
    /// # Errors
    /// Propagates errors from [`Self::find_section`] and from [`Self::load_section`] for the
    /// section that was found.
    fn section_by_name(&self, name: &str) -> Result<Option<&[u8]>> {
        match self.find_section(name)? {
            Some((index, _)) => self.load_section(index).map(Some),
            None => Ok(None),
        }
    }
}
