//! The PE/COFF structures read from an image.
//!
//! goblin decodes the records (COFF file header, section table, symbol table, string table).
//! This module locates them inside the image with range checks of its own and adds the few
//! rules the section catalog and the symbol resolver apply on top of goblin's types.

pub mod headers;
pub mod section;
pub mod symbol;

/// Trim a fixed-width name field to its first NUL, or keep all of it when there is none.
#[must_use]
pub fn trim_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&byte| byte == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim() {
        assert_eq!(trim_nul(b".text\0\0\0"), b".text");
        assert_eq!(trim_nul(b".rdata$z"), b".rdata$z");
        assert_eq!(trim_nul(b"\0abc"), b"");
    }
}
