// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # dwarf-pe
//!
//! Read-only access to the debug information of PE/COFF images, as produced by MinGW
//! toolchains.
//!
//! MinGW links DWARF into ordinary Windows executables: the `.debug_*` sections live in the
//! section table under long names stored in the COFF string table, the legacy COFF symbol
//! table is usually left in place, and the DWARF sections are often split off into a separate
//! file referenced by a `.gnu_debuglink` section. `dwarf-pe` handles all three:
//!
//! - **Section access** - [`PeObject`] exposes the sections of an image through the
//!   [`ObjectAccess`] protocol a DWARF reader needs (count, description, byte order, address
//!   size, raw bytes), with the ELF-style empty section at index `0`
//! - **Debug-link redirection** - [`DebugSession`] follows `.gnu_debuglink` to the separate
//!   debug file and falls back to the original image when that fails
//! - **Symbol fallback** - [`symbols::find_symbol`] finds the nearest function symbol below
//!   an address in the COFF symbol table when there is no DWARF for it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dwarf_pe::prelude::*;
//! use std::path::Path;
//!
//! let session = DebugSession::open(Path::new("app.exe"))?;
//! println!("Debug info read from {}", session.path().display());
//!
//! let mut name = [0_u8; 256];
//! let (found, displacement) = session.find_symbol_into(0x0040_1234, &mut name)?;
//! if found {
//!     let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
//!     println!("{}+0x{:x}", String::from_utf8_lossy(&name[..len]), displacement);
//! }
//!
//! session.finish()?;
//! # Ok::<(), dwarf_pe::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`PeObject`] - Image mapping, header location and the section catalog
//! - [`pe`] - Header location and the rules applied to goblin's section and symbol records
//! - [`debuglink`] - `.gnu_debuglink` lookup and path computation
//! - [`symbols`] - Nearest-symbol search over the COFF symbol table
//! - [`DebugSession`] - Initialization order, DWARF reader wiring and teardown
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a logger.
//! Debug-link decisions are logged at `debug`/`warn`, successful initialization at `info` and
//! the symbol scan at `trace`.
//!
//! ## Safety
//!
//! Images are untrusted input. Every offset read from an image is range-checked against the
//! mapped data; damaged images yield [`Error::Malformed`] instead of out-of-bounds reads.
#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

mod access;
mod config;
mod object;
mod session;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use dwarf_pe::prelude::*;
///
/// let object = PeObject::from_file("app.exe".as_ref())?;
/// println!("{} sections", object.section_count() - 1);
/// # Ok::<(), dwarf_pe::Error>(())
/// ```
pub mod prelude;

/// Raw PE/COFF structures
///
/// goblin decodes the on-disk records the section catalog and the symbol resolver are built
/// on; this module locates them and applies the catalog's rules to them.
///
/// # Key Components
///
/// - [`pe::headers::Layout`] - Offsets of the NT header, section table, symbol table and
///   string table
/// - [`pe::section`] - Section records: exposed size and resolved names
/// - [`pe::symbol`] - Function test and name lookup for COFF symbol records
pub mod pe;

/// `.gnu_debuglink` support
///
/// # Example
///
/// ```rust,no_run
/// use dwarf_pe::{debuglink, PeObject};
///
/// let object = PeObject::from_file("app.exe".as_ref())?;
/// if let Some(link) = debuglink::debuglink_name(&object)? {
///     println!("debug file: {}", debuglink::candidate_path("app.exe", &link));
/// }
/// # Ok::<(), dwarf_pe::Error>(())
/// ```
pub mod debuglink;

/// COFF symbol table lookups
///
/// # Example
///
/// ```rust,no_run
/// use dwarf_pe::{symbols::find_symbol, PeObject};
///
/// let object = PeObject::from_file("app.exe".as_ref())?;
/// if let Some(symbol) = find_symbol(&object, 0x0040_1234)? {
///     println!("{}+0x{:x}", symbol.name, symbol.displacement);
/// }
/// # Ok::<(), dwarf_pe::Error>(())
/// ```
pub mod symbols;

/// `dwarf-pe` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dwarf-pe` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use dwarf_pe::{Error, PeObject};
///
/// match PeObject::from_file(std::path::Path::new("app.exe")) {
///     Ok(object) => println!("Loaded {} bytes", object.len()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The object access protocol and its section descriptions.
pub use access::{ByteOrder, ObjectAccess, SectionInfo};

/// Options controlling debug-link redirection.
pub use config::LoadOptions;

/// A loaded PE/COFF image.
pub use object::PeObject;

/// An initialized image with its DWARF reader.
pub use session::{DebugSession, DwarfSlice};

/// Result of a symbol lookup.
pub use symbols::SymbolMatch;
