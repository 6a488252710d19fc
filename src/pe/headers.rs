//! Header location for PE/COFF images.
//!
//! [`Layout::locate`] follows the fixed offset chain of the PE/COFF format once, at load time,
//! and records where each table lives:
//!
//! ```text
//! image[0x3C]                      -> e_lfanew (NT header offset)
//! nt + 4                           -> COFF file header (20 bytes)
//! nt + 24                          -> optional header (magic, image base, ...)
//! nt + 24 + size_of_optional_hdr   -> section table (40 bytes per section)
//! pointer_to_symbol_table          -> COFF symbol table (18 bytes per record)
//! symbols + 18 * number_of_symbols -> COFF string table
//! ```
//!
//! Each step is range-checked against the image length; a truncated or corrupt image yields
//! [`crate::Error::Malformed`] instead of an out-of-bounds access. The COFF file header itself
//! is decoded with goblin's [`CoffHeader`] once its range is known to be inside the image.
//!
//! # Reference
//! - Microsoft PE/COFF Specification, sections 3 and 4

use goblin::pe::{
    header::{CoffHeader, PE_MAGIC, PE_POINTER_OFFSET, SIZEOF_COFF_HEADER, SIZEOF_PE_MAGIC},
    optional_header::{MAGIC_32, MAGIC_64},
    section_table::SIZEOF_SECTION_TABLE,
    symbol::COFF_SYMBOL_SIZE,
};

use crate::Result;

/// Kind of optional header, taken from its magic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalMagic {
    /// `IMAGE_NT_OPTIONAL_HDR32_MAGIC`, a 32-bit image
    Pe32,
    /// `IMAGE_NT_OPTIONAL_HDR64_MAGIC`, a 64-bit image
    Pe32Plus,
    /// Anything else, including a missing optional header
    Unknown(u16),
}

impl OptionalMagic {
    /// Classify a raw optional header magic value.
    #[must_use]
    pub fn from_raw(magic: u16) -> Self {
        match magic {
            MAGIC_32 => OptionalMagic::Pe32,
            MAGIC_64 => OptionalMagic::Pe32Plus,
            other => OptionalMagic::Unknown(other),
        }
    }

    /// Size of a target address in bytes; `0` for an unrecognized magic.
    #[must_use]
    pub fn address_size(self) -> u8 {
        match self {
            OptionalMagic::Pe32 => 4,
            OptionalMagic::Pe32Plus => 8,
            OptionalMagic::Unknown(_) => 0,
        }
    }
}

/// File offsets of the structures a PE image is read through.
///
/// All offsets are relative to the start of the image and have been checked to lie inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Offset of the NT headers (`e_lfanew`)
    pub nt_header: usize,
    /// The COFF file header, as decoded by goblin
    pub coff: CoffHeader,
    /// Kind of optional header
    pub magic: OptionalMagic,
    /// Preferred load address; `0` when the magic is not recognized
    pub image_base: u64,
    /// Offset of the first section header
    pub section_table: usize,
    /// Offset of the first symbol record, if the image has a symbol table
    pub symbol_table: Option<usize>,
    /// Offset of the string table, if the image has a symbol table
    pub string_table: Option<usize>,
}

impl Layout {
    /// Locate the NT headers, section table, symbol table and string table of an image.
    ///
    /// # Arguments
    /// * `data` - The complete image
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the PE signature is missing or any of the tables
    /// extends beyond the end of `data`.
    pub fn locate(data: &[u8]) -> Result<Layout> {
        let nt_header = bytes_at::<4>(data, PE_POINTER_OFFSET as usize)
            .map(u32::from_le_bytes)
            .ok_or_else(|| malformed_error!("Image is too small to hold a DOS header"))?
            as usize;

        let signature = bytes_at::<SIZEOF_PE_MAGIC>(data, nt_header)
            .map(u32::from_le_bytes)
            .ok_or_else(|| malformed_error!("NT header offset 0x{:X} is out of range", nt_header))?;
        if signature != PE_MAGIC {
            return Err(malformed_error!(
                "Invalid PE signature 0x{:08X} at 0x{:X}",
                signature,
                nt_header
            ));
        }

        let mut offset = nt_header + SIZEOF_PE_MAGIC;
        check_range(data, offset, SIZEOF_COFF_HEADER, "COFF file header")?;
        let coff = CoffHeader::parse(data, &mut offset)?;

        let optional_header = offset;
        let optional_len = usize::from(coff.size_of_optional_header);
        check_range(data, optional_header, optional_len, "optional header")?;
        let (magic, image_base) =
            read_optional(&data[optional_header..optional_header + optional_len])?;

        let section_table = optional_header + optional_len;
        let section_bytes = usize::from(coff.number_of_sections) * SIZEOF_SECTION_TABLE;
        check_range(data, section_table, section_bytes, "section table")?;

        let (symbol_table, string_table) = if coff.pointer_to_symbol_table == 0 {
            (None, None)
        } else {
            let symbols = coff.pointer_to_symbol_table as usize;
            let symbol_bytes = (coff.number_of_symbol_table as usize)
                .checked_mul(COFF_SYMBOL_SIZE)
                .ok_or_else(|| {
                    malformed_error!("Symbol count {} overflows", coff.number_of_symbol_table)
                })?;
            check_range(data, symbols, symbol_bytes, "symbol table")?;

            (Some(symbols), Some(symbols + symbol_bytes))
        };

        Ok(Layout {
            nt_header,
            coff,
            magic,
            image_base,
            section_table,
            symbol_table,
            string_table,
        })
    }
}

fn read_optional(optional: &[u8]) -> Result<(OptionalMagic, u64)> {
    let Some(raw) = bytes_at::<2>(optional, 0) else {
        return Ok((OptionalMagic::Unknown(0), 0));
    };
    let magic = OptionalMagic::from_raw(u16::from_le_bytes(raw));

    // PE32 carries base_of_data before a 4-byte image base, PE32+ an 8-byte image base
    let image_base = match magic {
        OptionalMagic::Pe32 => {
            bytes_at::<4>(optional, 28).map(|raw| u64::from(u32::from_le_bytes(raw)))
        }
        OptionalMagic::Pe32Plus => bytes_at::<8>(optional, 24).map(u64::from_le_bytes),
        OptionalMagic::Unknown(_) => Some(0),
    }
    .ok_or_else(|| {
        malformed_error!(
            "Optional header of {} bytes is too small to hold an image base",
            optional.len()
        )
    })?;

    Ok((magic, image_base))
}

/// The `N` bytes at `offset`, if they lie inside `data`.
fn bytes_at<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

fn check_range(data: &[u8], offset: usize, len: usize, what: &str) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(malformed_error!(
            "The {} at 0x{:X} ({} bytes) exceeds the image size of {} bytes",
            what,
            offset,
            len,
            data.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ImageBuilder;

    #[test]
    fn coff_header() {
        let image = ImageBuilder::pe32()
            .section(".text", 0x1000, &[0xC3; 16])
            .section(".data", 0x2000, &[0x00; 8])
            .function("_main", 1, 0)
            .symbol("_table", 2, 0, 0, 1)
            .build();

        let layout = Layout::locate(&image).unwrap();

        assert_eq!(layout.nt_header, crate::test::NT_HEADER_OFFSET);
        assert_eq!(layout.coff.machine, 0x014C);
        assert_eq!(layout.coff.number_of_sections, 2);
        assert_eq!(layout.coff.number_of_symbol_table, 3);
        assert_eq!(layout.coff.size_of_optional_header, 224);
        assert_eq!(layout.coff.characteristics, 0x0102);
    }

    #[test]
    fn magic() {
        assert_eq!(OptionalMagic::from_raw(0x10B), OptionalMagic::Pe32);
        assert_eq!(OptionalMagic::from_raw(0x20B), OptionalMagic::Pe32Plus);
        assert_eq!(OptionalMagic::from_raw(0x107), OptionalMagic::Unknown(0x107));
        assert_eq!(OptionalMagic::Pe32.address_size(), 4);
        assert_eq!(OptionalMagic::Pe32Plus.address_size(), 8);
        assert_eq!(OptionalMagic::Unknown(0).address_size(), 0);
    }

    #[test]
    fn locate_pe32() {
        let image = ImageBuilder::pe32()
            .image_base(0x0040_0000)
            .section(".text", 0x1000, &[0xC3; 16])
            .section(".data", 0x2000, &[0x00; 8])
            .function("_main", 1, 0)
            .build();

        let layout = Layout::locate(&image).unwrap();

        assert_eq!(layout.magic, OptionalMagic::Pe32);
        assert_eq!(layout.image_base, 0x0040_0000);
        assert_eq!(layout.coff.number_of_sections, 2);
        assert_eq!(
            layout.section_table,
            layout.nt_header + 4 + 20 + usize::from(layout.coff.size_of_optional_header)
        );
        let symbols = layout.symbol_table.unwrap();
        assert_eq!(symbols, layout.coff.pointer_to_symbol_table as usize);
        assert_eq!(layout.string_table.unwrap(), symbols + 18);
    }

    #[test]
    fn locate_pe32_plus() {
        let image = ImageBuilder::pe64()
            .image_base(0x1_4000_0000)
            .section(".text", 0x1000, &[0xC3; 16])
            .build();

        let layout = Layout::locate(&image).unwrap();

        assert_eq!(layout.magic, OptionalMagic::Pe32Plus);
        assert_eq!(layout.image_base, 0x1_4000_0000);
    }

    #[test]
    fn locate_stripped() {
        let image = ImageBuilder::pe32()
            .section(".text", 0x1000, &[0xC3; 16])
            .stripped()
            .build();

        let layout = Layout::locate(&image).unwrap();

        assert_eq!(layout.symbol_table, None);
        assert_eq!(layout.string_table, None);
    }

    #[test]
    fn locate_unknown_magic() {
        let image = ImageBuilder::pe32()
            .magic(0x107)
            .section(".text", 0x1000, &[0xC3; 16])
            .build();

        let layout = Layout::locate(&image).unwrap();

        assert_eq!(layout.magic, OptionalMagic::Unknown(0x107));
        assert_eq!(layout.image_base, 0);
    }

    #[test]
    fn locate_truncated() {
        let image = ImageBuilder::pe32()
            .section(".text", 0x1000, &[0xC3; 16])
            .function("_main", 1, 0)
            .build();
        let layout = Layout::locate(&image).unwrap();

        // Cut into the symbol table
        let truncated = &image[..layout.symbol_table.unwrap() + 10];
        assert!(matches!(
            Layout::locate(truncated),
            Err(crate::Error::Malformed { .. })
        ));

        // Cut into the section table
        let truncated = &image[..layout.section_table + 20];
        assert!(matches!(
            Layout::locate(truncated),
            Err(crate::Error::Malformed { .. })
        ));

        // Cut into the COFF file header
        let truncated = &image[..layout.nt_header + 4 + 12];
        assert!(matches!(
            Layout::locate(truncated),
            Err(crate::Error::Malformed { .. })
        ));

        // Too small for e_lfanew
        assert!(matches!(
            Layout::locate(&image[..0x3C]),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn locate_bad_signature() {
        let mut image = ImageBuilder::pe32()
            .section(".text", 0x1000, &[0xC3; 16])
            .build();
        let layout = Layout::locate(&image).unwrap();
        image[layout.nt_header] = b'X';

        assert!(matches!(
            Layout::locate(&image),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn locate_bad_lfanew() {
        let mut image = ImageBuilder::pe32()
            .section(".text", 0x1000, &[0xC3; 16])
            .build();
        image[0x3C..0x40].copy_from_slice(&0xFFFF_FF00_u32.to_le_bytes());

        assert!(matches!(
            Layout::locate(&image),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
