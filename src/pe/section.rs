//! Native section headers.
//!
//! Records are decoded with goblin's [`SectionTable`], which also resolves `/<decimal>` and
//! `//<base64>` long names against the COFF string table. On top of that sits the catalog's
//! view of a record: the number of bytes it exposes and a name lookup that reports an
//! unresolvable long name as an error instead of the raw `/<offset>` field.

use std::borrow::Cow;

use goblin::pe::section_table::{SectionTable, SIZEOF_SECTION_TABLE};
use log::debug;

use crate::{pe::trim_nul, Result};

/// Decode the section record at `offset` and advance `offset` past it.
///
/// `string_table` is the file offset of the COFF string table, if the image has one. Without
/// it long names are left unresolved.
///
/// A record whose name field is not a valid string table reference (such as `/abc`) is still
/// returned with its raw name, so the rest of the table stays usable. [`section_name`] reports
/// it when the name is asked for.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the record extends past the end of `data`.
pub fn parse_section(
    data: &[u8],
    offset: &mut usize,
    string_table: Option<usize>,
) -> Result<SectionTable> {
    let start = *offset;
    let record = start
        .checked_add(SIZEOF_SECTION_TABLE)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| malformed_error!("Section record at 0x{:X} exceeds the image", start))?;
    *offset = start + SIZEOF_SECTION_TABLE;

    let mut cursor = start;
    let parsed = match string_table {
        Some(string_table) => SectionTable::parse(data, &mut cursor, string_table),
        // a lookup past the record fails, leaving long names unresolved
        None => SectionTable::parse(record, &mut 0, SIZEOF_SECTION_TABLE),
    };

    match parsed {
        Ok(section) => Ok(section),
        Err(error) => {
            debug!("Section name at 0x{:X} is not decodable: {}", start, error);

            let mut blank = [0_u8; SIZEOF_SECTION_TABLE];
            blank.copy_from_slice(record);
            blank[..8].fill(0);

            let mut section = SectionTable::parse(&blank, &mut 0, SIZEOF_SECTION_TABLE)?;
            section.name.copy_from_slice(&record[..8]);
            Ok(section)
        }
    }
}

/// Number of bytes of the section that are backed by file data.
///
/// The virtual size can exceed the raw size (zero-filled tail) and the raw size can exceed
/// the virtual size (file alignment padding), so the smaller of the two is used.
#[must_use]
pub fn data_size(section: &SectionTable) -> u32 {
    section.virtual_size.min(section.size_of_raw_data)
}

/// The name of a section.
///
/// Inline names are trimmed at the first NUL; long names are the string table entry goblin
/// resolved while parsing.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the name refers to the string table and the entry
/// could not be resolved, or the reference itself is not a number.
pub fn section_name(section: &SectionTable) -> Result<Cow<'_, str>> {
    match section.name_offset() {
        Ok(Some(offset)) if section.real_name.is_none() => Err(malformed_error!(
            "Section name '{}' refers to string table offset {}, which cannot be resolved",
            String::from_utf8_lossy(trim_nul(&section.name)),
            offset
        )),
        Ok(_) => Ok(match section.name() {
            Ok(name) => Cow::Borrowed(name),
            Err(_) => String::from_utf8_lossy(trim_nul(&section.name)),
        }),
        Err(error) => Err(malformed_error!(
            "Section name '{}' is not a valid string table reference: {}",
            String::from_utf8_lossy(trim_nul(&section.name)),
            error
        )),
    }
}
