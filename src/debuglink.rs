//! `.gnu_debuglink` redirection.
//!
//! MinGW builds are often stripped with `objcopy --only-keep-debug` / `--add-gnu-debuglink`,
//! which moves the DWARF sections into a separate file and leaves behind a `.gnu_debuglink`
//! section holding that file's name (followed by padding and a CRC32, which is not checked).
//! The debug file is expected next to the image, so the lookup path is the image's directory
//! joined with the link name.
//!
//! Redirection is best effort. Any failure along the way (an unreadable section, a missing or
//! invalid debug file, a cycle, a chain deeper than [`LoadOptions::max_debuglink_depth`]) is
//! logged and the image that carried the link is used instead.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    access::ObjectAccess, config::LoadOptions, pe::trim_nul, Error::RecursionLimit,
    Result,
};

/// Name of the section that links an image to its separate debug file.
pub const DEBUGLINK_SECTION: &str = ".gnu_debuglink";

/// Read the debug file name from the first non-empty `.gnu_debuglink` section.
///
/// The name ends at the first NUL or at the end of the section, whichever comes first. An
/// empty name is treated like a missing section.
///
/// # Errors
/// Propagates errors from section enumeration and loading.
pub fn debuglink_name(object: &impl ObjectAccess) -> Result<Option<String>> {
    let Some(data) = object.section_by_name(DEBUGLINK_SECTION)? else {
        return Ok(None);
    };

    let name = trim_nul(data);
    if name.is_empty() {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(name).into_owned()))
}

/// Compute where the debug file named `link` is expected for the image at `image`.
///
/// The directory part of `image` (up to and including its last `\` or `/`) is prepended to
/// `link`. An image path without a separator yields `link` unchanged, i.e. a lookup relative to
/// the current directory.
///
/// ```rust
/// use dwarf_pe::debuglink::candidate_path;
///
/// assert_eq!(candidate_path(r"C:\dir\app.exe", "app.debug"), r"C:\dir\app.debug");
/// assert_eq!(candidate_path("app.exe", "app.debug"), "app.debug");
/// ```
#[must_use]
pub fn candidate_path(image: &str, link: &str) -> String {
    match image.rfind(|c: char| c == '\\' || c == '/') {
        Some(separator) => format!("{}{}", &image[..=separator], link),
        None => link.to_string(),
    }
}

/// Identity under which a path is remembered in the visited set.
pub(crate) fn visited_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Try to replace the image at `image` with the debug file it links to.
///
/// `visited` holds the images of the current chain, the one at `image` included. `initialize`
/// is called with the opened debug file and performs the complete initialization against it,
/// which may redirect again.
///
/// Returns `None` whenever the original image should be kept.
pub(crate) fn follow<T, F>(
    object: &impl ObjectAccess,
    image: &Path,
    options: &LoadOptions,
    visited: &mut Vec<PathBuf>,
    initialize: F,
) -> Option<T>
where
    F: FnOnce(&fs::File, &Path, &mut Vec<PathBuf>) -> Result<T>,
{
    if !options.follow_debuglink {
        return None;
    }

    let link = match debuglink_name(object) {
        Ok(Some(link)) => link,
        Ok(None) => return None,
        Err(error) => {
            warn!(
                "Ignoring unreadable {} section in {}: {}",
                DEBUGLINK_SECTION,
                image.display(),
                error
            );
            return None;
        }
    };

    let candidate = PathBuf::from(candidate_path(&image.to_string_lossy(), &link));
    debug!(
        "{} links to debug file {}",
        image.display(),
        candidate.display()
    );

    let followed = visited.len().saturating_sub(1);
    if !options.allows_redirect(followed) {
        warn!(
            "Not following {}: {}",
            candidate.display(),
            RecursionLimit(options.max_debuglink_depth)
        );
        return None;
    }

    let key = visited_key(&candidate);
    if visited.contains(&key) {
        warn!(
            "Not following {}: debug link cycle back to an image already loaded",
            candidate.display()
        );
        return None;
    }

    let file = match fs::File::open(&candidate) {
        Ok(file) => file,
        Err(error) => {
            warn!(
                "Cannot open debug file {}: {}, using {}",
                candidate.display(),
                error,
                image.display()
            );
            return None;
        }
    };

    visited.push(key);
    match initialize(&file, &candidate, visited) {
        Ok(result) => Some(result),
        Err(error) => {
            warn!(
                "Cannot load debug file {}: {}, using {}",
                candidate.display(),
                error,
                image.display()
            );
            None
        }
    }
}
