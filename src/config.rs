//! Load configuration for debug sessions
//!
//! Controls whether `.gnu_debuglink` redirection is followed and how long a chain of
//! redirections may get before the loader stops and exposes the image it has.

/// Configuration for [`crate::DebugSession`] initialization
///
/// Redirection never turns into an error: when the chain is cut short by `follow_debuglink`,
/// `max_debuglink_depth` or a cycle, the last image reached is exposed as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Follow a `.gnu_debuglink` section to the separate debug file it names
    pub follow_debuglink: bool,

    /// Maximum number of redirections followed from the original image (default: 4)
    /// A depth of 0 behaves like `follow_debuglink: false`
    pub max_debuglink_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            follow_debuglink: true,
            max_debuglink_depth: 4,
        }
    }
}

impl LoadOptions {
    /// Creates a configuration that always exposes the image it was given
    ///
    /// Useful when the caller already resolved the debug file, or wants the COFF symbols of the
    /// stripped image rather than those of its companion.
    #[must_use]
    pub fn no_debuglink() -> Self {
        Self {
            follow_debuglink: false,
            max_debuglink_depth: 0,
        }
    }

    /// Whether another redirection is allowed after `followed` have already been taken
    #[must_use]
    pub fn allows_redirect(&self, followed: usize) -> bool {
        self.follow_debuglink && followed < self.max_debuglink_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoadOptions::default();
        assert!(config.follow_debuglink);
        assert_eq!(config.max_debuglink_depth, 4);
    }

    #[test]
    fn test_no_debuglink_config() {
        let config = LoadOptions::no_debuglink();
        assert!(!config.follow_debuglink);
        assert!(!config.allows_redirect(0));
    }

    #[test]
    fn test_redirect_budget() {
        let config = LoadOptions::default();
        assert!(config.allows_redirect(0));
        assert!(config.allows_redirect(3));
        assert!(!config.allows_redirect(4));

        let config = LoadOptions {
            follow_debuglink: true,
            max_debuglink_depth: 0,
        };
        assert!(!config.allows_redirect(0));

        let config = LoadOptions {
            follow_debuglink: false,
            max_debuglink_depth: 8,
        };
        assert!(!config.allows_redirect(0));
    }
}
