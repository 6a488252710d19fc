//! # dwarf-pe Prelude
//!
//! The types needed to open an image, read its sections and look up symbols, for glob import.

/// The main error type for all dwarf-pe operations
pub use crate::Error;

/// The result type used throughout dwarf-pe
pub use crate::Result;

/// Session entry point and its options
pub use crate::{DebugSession, LoadOptions};

/// Section access
pub use crate::{ByteOrder, ObjectAccess, PeObject, SectionInfo};

/// Symbol lookup
pub use crate::{symbols::find_symbol, SymbolMatch};
