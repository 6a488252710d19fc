//! PE/COFF images exposed through the object access protocol.
//!
//! [`PeObject`] owns the bytes of one image (a memory mapping or a buffer), locates its
//! headers once at load time and then answers [`ObjectAccess`] queries from that layout. It
//! also gives the symbol resolver access to the raw section table and COFF symbol table.
//!
//! # Section numbering
//!
//! | Exposed index | Meaning |
//! |---|---|
//! | `0` | empty placeholder, no name, no data |
//! | `n >= 1` | native section `n - 1` |
//!
//! # Examples
//!
//! ```rust,no_run
//! use dwarf_pe::{ObjectAccess, PeObject};
//! use std::path::Path;
//!
//! let object = PeObject::from_file(Path::new("app.exe"))?;
//! for index in 1..object.section_count() {
//!     let info = object.section_info(index)?;
//!     println!("{:>3} {:<16} {:>8} bytes", index, info.name, info.size);
//! }
//! # Ok::<(), dwarf_pe::Error>(())
//! ```

use std::{fs, path::Path};

use goblin::{
    pe::{section_table::SectionTable, symbol::SymbolTable},
    strtab::Strtab,
};
use log::warn;

use crate::{
    access::{ByteOrder, ObjectAccess, SectionInfo},
    file::{Backend, Memory, Physical},
    pe::{
        headers::{Layout, OptionalMagic},
        section::{data_size, parse_section, section_name},
    },
    Error::{Empty, NoEntry},
    Result,
};

/// A loaded PE/COFF image.
///
/// The image bytes are owned by the object and released when it is dropped. Everything
/// derived from them (the layout, the section headers, the views returned by
/// [`ObjectAccess::load_section`]) is immutable and borrows from the object.
pub struct PeObject {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// Offsets of the headers and tables.
    layout: Layout,
    /// The native section table, long names resolved.
    sections: Vec<SectionTable>,
}

impl PeObject {
    /// Loads an image from the given path by mapping it into memory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened,
    /// [`crate::Error::MappingError`] if it cannot be mapped, and the errors of
    /// [`PeObject::from_mem`] if the contents are not a usable image.
    pub fn from_file(path: &Path) -> Result<PeObject> {
        Self::load(Physical::new(path)?)
    }

    /// Loads an image from a file that is already open for reading.
    ///
    /// The handle is only used to create the mapping; it may be closed once this returns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MappingError`] if the file cannot be mapped, and the errors of
    /// [`PeObject::from_mem`] if the contents are not a usable image.
    pub fn from_std_file(file: &fs::File) -> Result<PeObject> {
        Self::load(Physical::from_std_file(file)?)
    }

    /// Loads an image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] for an empty buffer and [`crate::Error::Malformed`] if
    /// the headers or tables lie outside the buffer.
    pub fn from_mem(data: Vec<u8>) -> Result<PeObject> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<PeObject> {
        if data.is_empty() {
            return Err(Empty);
        }

        let layout = Layout::locate(data.data())?;

        let mut offset = layout.section_table;
        let mut sections = Vec::with_capacity(usize::from(layout.coff.number_of_sections));
        for _ in 0..layout.coff.number_of_sections {
            sections.push(parse_section(
                data.data(),
                &mut offset,
                layout.string_table,
            )?);
        }

        Ok(PeObject {
            data: Box::new(data),
            layout,
            sections,
        })
    }

    /// Returns the complete image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offsets of the headers and tables of this image.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Kind of optional header (PE32, PE32+ or unrecognized).
    #[must_use]
    pub fn optional_magic(&self) -> OptionalMagic {
        self.layout.magic
    }

    /// Preferred load address of the image.
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.layout.image_base
    }

    /// The native section table, in file order (native index `0` first).
    #[must_use]
    pub fn native_sections(&self) -> &[SectionTable] {
        &self.sections
    }

    /// The native section with the given zero-based index.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the image has fewer sections.
    pub fn native_section(&self, native_index: usize) -> Result<&SectionTable> {
        self.sections.get(native_index).ok_or_else(|| {
            malformed_error!(
                "Section {} referenced, but the image has {} sections",
                native_index + 1,
                self.sections.len()
            )
        })
    }

    /// The COFF string table, if the image has a symbol table and the string table is
    /// readable.
    #[must_use]
    pub fn string_table(&self) -> Option<Strtab<'_>> {
        match self.layout.coff.strings(self.data()) {
            Ok(strings) => strings,
            Err(error) => {
                warn!("Ignoring unreadable COFF string table: {}", error);
                None
            }
        }
    }

    /// The COFF symbol table, if the image has one.
    #[must_use]
    pub fn symbol_table(&self) -> Option<SymbolTable<'_>> {
        self.layout.coff.symbols(self.data()).ok().flatten()
    }

    /// Describe every real section (indices `1..section_count()`), in order.
    pub fn sections(&self) -> impl Iterator<Item = Result<SectionInfo<'_>>> + '_ {
        (1..self.section_count()).map(move |index| self.section_info(index))
    }

    fn exposed_section(&self, index: usize) -> Result<&SectionTable> {
        match index.checked_sub(1).and_then(|native| self.sections.get(native)) {
            Some(section) => Ok(section),
            None => Err(NoEntry(index)),
        }
    }
}

impl ObjectAccess for PeObject {
    fn section_count(&self) -> usize {
        self.sections.len() + 1
    }

    fn section_info(&self, index: usize) -> Result<SectionInfo<'_>> {
        if index == 0 {
            return Ok(SectionInfo::empty());
        }

        let section = self.exposed_section(index)?;

        Ok(SectionInfo {
            name: section_name(section)?,
            size: u64::from(data_size(section)),
            addr: 0,
            link: 0,
            entry_size: 0,
        })
    }

    fn byte_order(&self) -> ByteOrder {
        ByteOrder::Little
    }

    fn address_size(&self) -> u8 {
        self.layout.magic.address_size()
    }

    fn load_section(&self, index: usize) -> Result<&[u8]> {
        let section = self.exposed_section(index)?;
        let size = data_size(section);

        self.data
            .data_slice(section.pointer_to_raw_data as usize, size as usize)
            .map_err(|_| {
                malformed_error!(
                    "Data of section {} ({} bytes at 0x{:X}) exceeds the image",
                    index,
                    size,
                    section.pointer_to_raw_data
                )
            })
    }
}

impl std::fmt::Debug for PeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeObject")
            .field("len", &self.len())
            .field("layout", &self.layout)
            .field("sections", &self.sections.len())
            .finish()
    }
}
