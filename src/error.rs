use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Image Errors
/// - [`Error::Malformed`] - An offset or record in the image points outside the mapped data
/// - [`Error::OutOfBounds`] - A read ran past the end of the image data
/// - [`Error::NotSupported`] - The optional header magic is neither PE32 nor PE32+
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::NoEntry`] - The requested section has no backing bytes
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - The image could not be opened
/// - [`Error::MappingError`] - The image could not be mapped into memory
/// - [`Error::GoblinErr`] - goblin failed to decode a PE/COFF record
/// - [`Error::Dwarf`] - The DWARF reader rejected the image
/// - [`Error::RecursionLimit`] - A `.gnu_debuglink` chain was too deep
///
/// # Examples
///
/// ```rust,no_run
/// use dwarf_pe::{DebugSession, Error};
/// use std::path::Path;
///
/// match DebugSession::open(Path::new("app.exe")) {
///     Ok(session) => {
///         println!("Loaded {}", session.path().display());
///     }
///     Err(Error::NotSupported) => {
///         eprintln!("Not a PE32 or PE32+ image");
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed image: {} ({}:{})", message, file, line);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image is damaged and could not be interpreted.
    ///
    /// Raised whenever a header field, section record or symbol record refers to
    /// data that lies outside the mapped image, or a name cannot be decoded. The
    /// error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted on the image data.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The optional header magic is not recognized.
    ///
    /// Only PE32 (`0x10b`) and PE32+ (`0x20b`) images carry an address size the
    /// DWARF reader can work with.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The requested section has no backing bytes.
    ///
    /// Section index 0 is the empty placeholder section and can never be loaded.
    #[error("Section {0} has no entry")]
    NoEntry(usize),

    /// The image file could not be opened.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The opened file could not be mapped into memory.
    #[error("Failed to map file - {0}")]
    MappingError(std::io::Error),

    /// Error from the goblin crate.
    ///
    /// goblin decodes the COFF file header, the section records and the symbol table. This
    /// error wraps any failure from that layer.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Error from the gimli crate while loading or walking DWARF data.
    #[error("{0}")]
    Dwarf(#[from] gimli::Error),

    /// A `.gnu_debuglink` chain exceeded the allowed depth.
    ///
    /// The associated value shows the depth limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
