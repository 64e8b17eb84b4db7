// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! DKP Version Switcher Library
//!
//! This library lists DKP releases from GitHub, downloads and unpacks the
//! build for the current platform into a shared cache, and switches the
//! active version by re-pointing a symlink and updating a marker file.

pub mod catalog;
pub mod credentials;
pub mod install;
pub mod marker;
pub mod platform;
pub mod product;
pub mod version;

// Re-export commonly used items at the crate root for convenience
pub use catalog::{Asset, Downloader, GithubClient, Release, select_asset};
pub use install::{InstallLayout, InstallReport, Installer};
pub use platform::{
    DEFAULT_BIN_DIR, DEFAULT_CACHE_ROOT, GITHUB_API_BASE, GITHUB_OWNER, MARKER_FILE, Platform,
};
pub use product::ProductLine;
pub use version::{compare_versions, filter_releases, find_release, is_ga, normalize_tag};
