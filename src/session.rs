//! Debug sessions over PE/COFF images.
//!
//! A [`DebugSession`] is the unit of ownership handed to callers: it holds the image that ends
//! up being exposed (the original one, or the debug file its `.gnu_debuglink` section points
//! to) together with a `gimli` DWARF reader borrowing that image's sections.
//!
//! # Initialization order
//!
//! 1. map the image and locate its headers ([`PeObject`])
//! 2. follow `.gnu_debuglink`, which runs the complete initialization against the debug file
//!    and, on success, replaces the session built so far
//! 3. reject images of unknown bitness
//! 4. load the DWARF sections by name; missing sections read as empty
//!
//! # Examples
//!
//! ```rust,no_run
//! use dwarf_pe::DebugSession;
//! use std::path::Path;
//!
//! let session = DebugSession::open(Path::new("app.exe"))?;
//! if let Some(symbol) = session.resolve(0x0040_1234)? {
//!     println!("{}+0x{:x}", symbol.name, symbol.displacement);
//! }
//! session.finish()?;
//! # Ok::<(), dwarf_pe::Error>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use gimli::{
    AttributeValue, DebuggingInformationEntry, Dwarf, EndianSlice, LittleEndian, SectionId, Unit,
};
use log::{debug, info};
use ouroboros::self_referencing;

use crate::{
    access::ObjectAccess,
    config::LoadOptions,
    debuglink,
    object::PeObject,
    symbols::{self, copy_symbol_name, SymbolMatch},
    Error::NotSupported,
    Result,
};

/// Section reader used for all DWARF data of a session.
pub type DwarfSlice<'a> = EndianSlice<'a, LittleEndian>;

/// How many `DW_AT_abstract_origin` / `DW_AT_specification` links are followed to find a name.
const MAX_NAME_INDIRECTIONS: usize = 2;

#[self_referencing]
/// An initialized image with its DWARF reader.
///
/// The image mapping and everything read from it are released together, by
/// [`DebugSession::finish`] or when the session is dropped.
pub struct DebugSession {
    /// Path of the exposed image
    path: PathBuf,

    /// The exposed image
    object: PeObject,

    #[borrows(object)]
    #[not_covariant]
    /// DWARF reader over the sections of `object`
    dwarf: Dwarf<DwarfSlice<'this>>,
}

impl DebugSession {
    /// Opens the image at `path` and initializes a session with [`LoadOptions::default`].
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, and the errors of
    /// [`DebugSession::initialize`] otherwise.
    pub fn open(path: &Path) -> Result<DebugSession> {
        let file = fs::File::open(path)?;
        Self::initialize(&file, path)
    }

    /// Initializes a session from an open file, using [`LoadOptions::default`].
    ///
    /// `path` must name the same file; it is used to locate a separate debug file.
    ///
    /// # Errors
    /// Returns [`crate::Error::MappingError`] if the file cannot be mapped,
    /// [`crate::Error::Malformed`] if its headers are damaged, [`crate::Error::NotSupported`]
    /// if it is neither PE32 nor PE32+, and [`crate::Error::Dwarf`] if the DWARF reader
    /// cannot be set up. A failing debug file never causes an error.
    pub fn initialize(file: &fs::File, path: &Path) -> Result<DebugSession> {
        Self::initialize_with(file, path, LoadOptions::default())
    }

    /// Initializes a session from an open file with explicit options.
    ///
    /// # Errors
    /// See [`DebugSession::initialize`].
    pub fn initialize_with(
        file: &fs::File,
        path: &Path,
        options: LoadOptions,
    ) -> Result<DebugSession> {
        let mut visited = vec![debuglink::visited_key(path)];
        Self::initialize_at(file, path, &options, &mut visited)
    }

    fn initialize_at(
        file: &fs::File,
        path: &Path,
        options: &LoadOptions,
        visited: &mut Vec<PathBuf>,
    ) -> Result<DebugSession> {
        let object = PeObject::from_std_file(file)?;

        let redirected = debuglink::follow(&object, path, options, visited, |file, path, visited| {
            Self::initialize_at(file, path, options, visited)
        });
        if let Some(session) = redirected {
            debug!(
                "{} superseded by {}",
                path.display(),
                session.path().display()
            );
            return Ok(session);
        }

        Self::assemble(path, object)
    }

    fn assemble(path: &Path, object: PeObject) -> Result<DebugSession> {
        if object.address_size() == 0 {
            return Err(NotSupported);
        }

        let session =
            DebugSession::try_new(path.to_path_buf(), object, |object| load_dwarf(object))?;
        info!("{} is OK", path.display());

        Ok(session)
    }

    /// Path of the exposed image; the debug file's path after a successful redirection.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.with_path(|path| path.as_path())
    }

    /// The exposed image.
    #[must_use]
    pub fn object(&self) -> &PeObject {
        self.with_object(|object| object)
    }

    /// Run `f` with the DWARF reader of this session.
    pub fn with_debug_info<R>(&self, f: impl for<'a> FnOnce(&Dwarf<DwarfSlice<'a>>) -> R) -> R {
        self.with_dwarf(|dwarf| f(dwarf))
    }

    /// Find the COFF function symbol closest below `address`.
    ///
    /// # Errors
    /// See [`symbols::find_symbol`].
    pub fn find_symbol(&self, address: u64) -> Result<Option<SymbolMatch>> {
        symbols::find_symbol(self.object(), address)
    }

    /// Find the COFF function symbol closest below `address` and copy its name into `buffer`.
    ///
    /// Returns `(true, displacement)` on a match, with the name truncated to the buffer and
    /// zero-padded when shorter, and `(false, u64::MAX)` if no symbol qualifies. The buffer is
    /// left untouched when nothing is found.
    ///
    /// # Errors
    /// See [`symbols::find_symbol`].
    pub fn find_symbol_into(&self, address: u64, buffer: &mut [u8]) -> Result<(bool, u64)> {
        match self.find_symbol(address)? {
            Some(found) => {
                copy_symbol_name(&found.name, buffer);
                Ok((true, found.displacement))
            }
            None => Ok((false, u64::MAX)),
        }
    }

    /// Name the function containing `address`.
    ///
    /// The DWARF subprograms are consulted first; the innermost one (the one whose matching
    /// range starts closest below `address`) wins, with the displacement measured from the
    /// start of that range. Without a DWARF match the COFF symbol table is searched.
    ///
    /// # Errors
    /// Returns [`crate::Error::Dwarf`] if the DWARF data is corrupt, and the errors of
    /// [`symbols::find_symbol`].
    pub fn resolve(&self, address: u64) -> Result<Option<SymbolMatch>> {
        if let Some(found) = self.with_dwarf(|dwarf| find_subprogram(dwarf, address))? {
            return Ok(Some(found));
        }

        self.find_symbol(address)
    }

    /// Tear the session down, releasing the DWARF reader and then the image mapping.
    ///
    /// Consuming `self` makes a second teardown impossible. Dropping a session has the same
    /// effect without the log record.
    ///
    /// # Errors
    /// Currently infallible; the `Result` leaves room for backends with fallible release.
    pub fn finish(self) -> Result<()> {
        let heads = self.into_heads();
        debug!("Releasing {}", heads.path.display());
        drop(heads.object);

        Ok(())
    }
}

impl std::fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("path", &self.path())
            .field("object", self.object())
            .finish_non_exhaustive()
    }
}

fn load_dwarf<'a>(object: &'a PeObject) -> Result<Dwarf<DwarfSlice<'a>>> {
    Dwarf::load(|id: SectionId| -> Result<DwarfSlice<'a>> {
        let data = object.section_by_name(id.name())?.unwrap_or_default();
        Ok(EndianSlice::new(data, LittleEndian))
    })
}

fn find_subprogram(dwarf: &Dwarf<DwarfSlice<'_>>, address: u64) -> Result<Option<SymbolMatch>> {
    let mut best: Option<SymbolMatch> = None;

    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;
        let mut entries = unit.entries();

        while let Some((_, entry)) = entries.next_dfs()? {
            if entry.tag() != gimli::DW_TAG_subprogram {
                continue;
            }

            let mut ranges = dwarf.die_ranges(&unit, entry)?;
            while let Some(range) = ranges.next()? {
                if address < range.begin || address >= range.end {
                    continue;
                }

                let displacement = address - range.begin;
                if best
                    .as_ref()
                    .is_some_and(|found| found.displacement <= displacement)
                {
                    continue;
                }

                if let Some(name) = subprogram_name(dwarf, &unit, entry, MAX_NAME_INDIRECTIONS)? {
                    best = Some(SymbolMatch { name, displacement });
                }
            }
        }
    }

    Ok(best)
}

fn subprogram_name(
    dwarf: &Dwarf<DwarfSlice<'_>>,
    unit: &Unit<DwarfSlice<'_>>,
    entry: &DebuggingInformationEntry<'_, '_, DwarfSlice<'_>>,
    indirections: usize,
) -> Result<Option<String>> {
    for attribute in [gimli::DW_AT_name, gimli::DW_AT_linkage_name] {
        if let Some(value) = entry.attr_value(attribute)? {
            let name = dwarf.attr_string(unit, value)?;
            return Ok(Some(name.to_string_lossy().into_owned()));
        }
    }

    if indirections == 0 {
        return Ok(None);
    }

    for attribute in [gimli::DW_AT_abstract_origin, gimli::DW_AT_specification] {
        if let Some(AttributeValue::UnitRef(offset)) = entry.attr_value(attribute)? {
            let origin = unit.entry(offset)?;
            return subprogram_name(dwarf, unit, &origin, indirections - 1);
        }
    }

    Ok(None)
}
