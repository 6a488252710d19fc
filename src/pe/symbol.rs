//! COFF symbol records.
//!
//! goblin decodes the legacy COFF symbol table: [`goblin::pe::symbol::SymbolTable::iter`]
//! yields the primary 18-byte records and steps over the auxiliary records that follow them.
//! This module answers the two questions the symbol resolver asks of a record: is it a
//! function, and what is its name.

use goblin::{
    pe::symbol::{Symbol, IMAGE_SYM_DTYPE_FUNCTION},
    strtab::Strtab,
};

use crate::Result;

/// Mask of the first derived-type slot, once the base type has been shifted out.
const DTYPE_MASK: u16 = 0x3;

/// Size of the length field that starts the string table.
const SIZEOF_STRTAB_LENGTH: u32 = 4;

/// Whether the derived type marks this symbol as a function.
#[must_use]
pub fn is_function(symbol: &Symbol) -> bool {
    (symbol.derived_type() & DTYPE_MASK) == IMAGE_SYM_DTYPE_FUNCTION
}

/// Resolve the name of a symbol, inline or from the string table.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a long name points outside `strings` (or into its
/// length field), or the name is not valid UTF-8.
pub fn symbol_name<'a>(symbol: &'a Symbol, strings: &'a Strtab<'_>) -> Result<&'a str> {
    if let [0, _, _, _, a, b, c, d] = symbol.name {
        let offset = u32::from_le_bytes([a, b, c, d]);
        if offset < SIZEOF_STRTAB_LENGTH {
            return Err(malformed_error!(
                "Symbol name at string table offset {} overlaps the length field",
                offset
            ));
        }
    }

    symbol
        .name(strings)
        .map_err(|error| malformed_error!("Symbol name cannot be decoded: {}", error))
}

#[cfg(test)]
mod tests {
    use goblin::pe::symbol::SymbolTable;

    use super::*;

    fn record(name: &[u8; 8], value: u32, typ: u16, aux: u8) -> [u8; 18] {
        let mut bytes = [0_u8; 18];
        bytes[..8].copy_from_slice(name);
        bytes[8..12].copy_from_slice(&value.to_le_bytes());
        bytes[12..14].copy_from_slice(&1_i16.to_le_bytes());
        bytes[14..16].copy_from_slice(&typ.to_le_bytes());
        bytes[16] = 2;
        bytes[17] = aux;
        bytes
    }

    fn symbol(bytes: &[u8; 18]) -> Symbol {
        Symbol::parse(bytes, 0).unwrap().1
    }

    fn long_name(offset: u32) -> [u8; 8] {
        let mut name = [0_u8; 8];
        name[4..].copy_from_slice(&offset.to_le_bytes());
        name
    }

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let symbol_bytes = [
            b'_', b'm', b'a', b'i', b'n', 0x00, 0x00, 0x00, // name = "_main"
            0x10, 0x00, 0x00, 0x00, // value = 0x10
            0x01, 0x00,             // section_number = 1
            0x20, 0x00,             // type = function
            0x02,                   // storage_class = external
            0x01,                   // number_of_aux_symbols = 1
        ];

        let symbol = symbol(&symbol_bytes);

        assert_eq!(symbol.value, 0x10);
        assert_eq!(symbol.section_number, 1);
        assert_eq!(symbol.number_of_aux_symbols, 1);
        assert!(is_function(&symbol));
        assert_eq!(symbol_name(&symbol, &Strtab::default()).unwrap(), "_main");
    }

    #[test]
    fn function_bit() {
        let mut symbol = symbol(&record(b"f\0\0\0\0\0\0\0", 0, 0x20, 0));
        assert!(is_function(&symbol));

        // function returning int still has the function derived type
        symbol.typ = 0x24;
        assert!(is_function(&symbol));

        // function returning a pointer: only the first derived slot counts
        symbol.typ = 0x60;
        assert!(is_function(&symbol));

        // pointer and array derived types are not functions
        symbol.typ = 0x10;
        assert!(!is_function(&symbol));
        symbol.typ = 0x30;
        assert!(!is_function(&symbol));
        symbol.typ = 0x00;
        assert!(!is_function(&symbol));
    }

    #[test]
    fn long_names() {
        let mut table = Vec::new();
        table.extend_from_slice(&36_u32.to_le_bytes());
        table.extend_from_slice(b"_very_long_function_name\0_other\0");
        let strings = Strtab::parse(&table, 4, table.len() - 4, 0).unwrap();

        let first = symbol(&record(&long_name(4), 0, 0x20, 0));
        let second = symbol(&record(&long_name(29), 0, 0x20, 0));

        assert_eq!(
            symbol_name(&first, &strings).unwrap(),
            "_very_long_function_name"
        );
        assert_eq!(symbol_name(&second, &strings).unwrap(), "_other");
    }

    #[test]
    fn bad_long_names() {
        let mut table = Vec::new();
        table.extend_from_slice(&10_u32.to_le_bytes());
        table.extend_from_slice(b"_main\0");
        let strings = Strtab::parse(&table, 4, table.len() - 4, 0).unwrap();

        for offset in [0, 3, 400] {
            let symbol = symbol(&record(&long_name(offset), 0, 0x20, 0));
            assert!(matches!(
                symbol_name(&symbol, &strings),
                Err(crate::Error::Malformed { .. })
            ));
        }

        let symbol = symbol(&record(&long_name(4), 0, 0x20, 0));
        assert!(symbol_name(&symbol, &Strtab::default()).is_err());
    }

    #[test]
    fn full_width_short_name() {
        let symbol = symbol(&record(b"_abcdefg", 0, 0x20, 0));
        assert_eq!(symbol_name(&symbol, &Strtab::default()).unwrap(), "_abcdefg");
    }

    #[test]
    fn iter_skips_aux_records() {
        let mut image = Vec::new();
        image.extend_from_slice(&record(b"first\0\0\0", 0, 0x20, 2));
        image.extend_from_slice(&[0xAA; 18]);
        image.extend_from_slice(&[0xBB; 18]);
        image.extend_from_slice(&record(b"second\0\0", 4, 0x20, 0));
        image.extend_from_slice(&record(b"third\0\0\0", 8, 0x00, 1));
        image.extend_from_slice(&[0xCC; 18]);

        let table = SymbolTable::parse(&image, 0, 6).unwrap();
        let strings = Strtab::default();
        let symbols = table
            .iter()
            .map(|(index, _, symbol)| {
                (index, symbol_name(&symbol, &strings).unwrap().to_string())
            })
            .collect::<Vec<_>>();

        assert_eq!(
            symbols,
            vec![
                (0, "first".to_string()),
                (3, "second".to_string()),
                (4, "third".to_string()),
            ]
        );
    }

    #[test]
    fn iter_aux_past_end() {
        let image = record(b"lonely\0\0", 0, 0x20, 5);
        let table = SymbolTable::parse(&image, 0, 1).unwrap();

        assert_eq!(table.iter().count(), 1);
    }
}
