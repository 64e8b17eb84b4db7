// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Platform detection and fixed filesystem conventions
//!
//! Release assets on GitHub are named after Go's `GOOS`/`GOARCH` values
//! (e.g. `dkp_v2.1.1_linux_amd64.tar.gz`), so the Rust platform constants are
//! mapped onto those identifiers here.

/// Default cache root holding downloaded archives and extracted binaries
pub const DEFAULT_CACHE_ROOT: &str = "/tmp/dkp";

/// Default directory where the active binary is published via symlink
pub const DEFAULT_BIN_DIR: &str = "/usr/local/bin";

/// Marker file recording the active release in the working directory
pub const MARKER_FILE: &str = ".dkp";

/// GitHub organization owning the release repositories
pub const GITHUB_OWNER: &str = "mesosphere";

/// Base URL of the GitHub REST API
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Host platform, expressed with the identifiers used in asset file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system identifier (e.g. "linux", "darwin")
    pub os: &'static str,
    /// Architecture identifier (e.g. "amd64", "arm64")
    pub arch: &'static str,
}

impl Platform {
    pub const LINUX_AMD64: Platform = Platform {
        os: "linux",
        arch: "amd64",
    };

    pub const LINUX_ARM64: Platform = Platform {
        os: "linux",
        arch: "arm64",
    };

    pub const DARWIN_AMD64: Platform = Platform {
        os: "darwin",
        arch: "amd64",
    };

    pub const DARWIN_ARM64: Platform = Platform {
        os: "darwin",
        arch: "arm64",
    };

    /// Detect the current platform from the compile-time target
    ///
    /// Unknown operating systems and architectures are passed through as-is so
    /// that asset matching fails with a clear message instead of silently
    /// picking a foreign binary.
    #[must_use]
    pub fn detect() -> Platform {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target identifiers onto release asset identifiers
    #[must_use]
    pub fn from_target(os: &'static str, arch: &'static str) -> Platform {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Platform { os, arch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rust_targets_to_asset_identifiers() {
        assert_eq!(
            Platform::from_target("linux", "x86_64"),
            Platform::LINUX_AMD64
        );
        assert_eq!(
            Platform::from_target("macos", "aarch64"),
            Platform::DARWIN_ARM64
        );
        assert_eq!(Platform::from_target("freebsd", "riscv64").os, "freebsd");
    }
}
