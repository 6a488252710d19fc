//! Nearest-symbol lookup over the COFF symbol table.
//!
//! MinGW toolchains leave a legacy COFF symbol table in the images they link. When no DWARF
//! information covers an address, that table still tells which function it falls into: the
//! function symbol with the highest address not above it.
//!
//! Names are normalized by bitness. 32-bit images decorate C symbols with a leading `_`, which
//! is removed; 64-bit images do not, and their names are reported unchanged. Symbols whose
//! (normalized) name starts with `.` are section and compiler-internal symbols and are never
//! reported.

use goblin::pe::symbol::Symbol;
use log::{trace, warn};

use crate::{
    object::PeObject,
    pe::{
        headers::OptionalMagic,
        symbol::{is_function, symbol_name},
    },
    Error::NotSupported,
    Result,
};

/// The function symbol found for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatch {
    /// Normalized symbol name
    pub name: String,
    /// Distance from the start of the symbol to the queried address
    pub displacement: u64,
}

/// Find the function symbol closest below `address`.
///
/// Every primary record is examined in file order; auxiliary records are skipped. Among the
/// qualifying functions the one with the smallest displacement wins, the first one in file
/// order on a tie. An exact hit ends the scan.
///
/// A record that refers to a section the image does not have, or whose name cannot be read,
/// is skipped with a warning and the scan goes on.
///
/// Returns `Ok(None)` if no function symbol lies at or below `address`, including when the
/// image has no symbol table.
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] if the image is neither PE32 nor PE32+.
pub fn find_symbol(object: &PeObject, address: u64) -> Result<Option<SymbolMatch>> {
    let strip_underscore = match object.optional_magic() {
        OptionalMagic::Pe32 => true,
        OptionalMagic::Pe32Plus => false,
        OptionalMagic::Unknown(_) => return Err(NotSupported),
    };

    let Some(symbols) = object.symbol_table() else {
        return Ok(None);
    };
    let strings = object.string_table().unwrap_or_default();

    let mut best: Option<SymbolMatch> = None;
    for (index, _, symbol) in symbols.iter() {
        let symbol_address = match symbol_address(object, &symbol) {
            Ok(symbol_address) => symbol_address,
            Err(error) => {
                warn!("Skipping symbol {}: {}", index, error);
                continue;
            }
        };

        let mut name = match symbol_name(&symbol, &strings) {
            Ok(name) => name,
            Err(error) => {
                warn!("Skipping symbol {}: {}", index, error);
                continue;
            }
        };
        if strip_underscore {
            if let Some(stripped) = name.strip_prefix('_') {
                name = stripped;
            }
        }

        trace!(
            "symbol {} '{}' at 0x{:X} (type 0x{:X})",
            index,
            name,
            symbol_address,
            symbol.typ
        );

        if symbol_address > address || !is_function(&symbol) || name.starts_with('.') {
            continue;
        }

        let displacement = address - symbol_address;
        if best
            .as_ref()
            .is_some_and(|found| found.displacement <= displacement)
        {
            continue;
        }

        best = Some(SymbolMatch {
            name: name.to_string(),
            displacement,
        });
        if displacement == 0 {
            break;
        }
    }

    Ok(best)
}

/// Absolute address of a symbol: section-relative values are rebased onto the image base and
/// the section's virtual address, absolute and special symbols are taken as they are.
fn symbol_address(object: &PeObject, symbol: &Symbol) -> Result<u64> {
    if symbol.section_number <= 0 {
        return Ok(u64::from(symbol.value));
    }

    // section_number is positive here
    let native_index = (symbol.section_number - 1) as usize;
    let section = object.native_section(native_index)?;

    Ok(u64::from(symbol.value)
        .wrapping_add(object.image_base())
        .wrapping_add(u64::from(section.virtual_address)))
}

/// Copy a symbol name into a caller-provided buffer.
///
/// At most `buffer.len()` bytes are copied, so a short buffer receives a truncated name without
/// a terminator. Any room left after the name is zero-filled. Returns the number of name bytes
/// copied.
pub fn copy_symbol_name(name: &str, buffer: &mut [u8]) -> usize {
    let copied = name.len().min(buffer.len());
    buffer[..copied].copy_from_slice(&name.as_bytes()[..copied]);
    buffer[copied..].fill(0);
    copied
}
