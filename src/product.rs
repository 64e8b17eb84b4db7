// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Product line naming conventions
//!
//! Konvoy 1.x and DKP 2.x ship from different repositories with different
//! binaries and archive layouts.

use std::fmt;

/// A DKP product line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLine {
    /// Konvoy 1.x, released from `mesosphere/konvoy`
    Konvoy,
    /// DKP 2.x, released from `mesosphere/konvoy2`
    Dkp,
}

impl ProductLine {
    /// All product lines, oldest first
    pub const ALL: [ProductLine; 2] = [ProductLine::Konvoy, ProductLine::Dkp];

    /// Infer the product line from a release artifact file name
    #[must_use]
    pub fn from_asset_name(file_name: &str) -> ProductLine {
        if file_name.contains("konvoy") {
            ProductLine::Konvoy
        } else {
            ProductLine::Dkp
        }
    }

    /// GitHub repository holding this line's releases
    #[must_use]
    pub fn repository(self) -> &'static str {
        match self {
            ProductLine::Konvoy => "konvoy",
            ProductLine::Dkp => "konvoy2",
        }
    }

    /// Binaries expected in an extracted release directory
    #[must_use]
    pub fn binaries(self) -> &'static [&'static str] {
        match self {
            ProductLine::Konvoy => &["konvoy", "konvoy-preflight"],
            ProductLine::Dkp => &["dkp"],
        }
    }

    /// Binary the published symlink points at
    #[must_use]
    pub fn primary_binary(self) -> &'static str {
        self.binaries()[0]
    }

    /// File name of the published symlink
    #[must_use]
    pub fn link_name(self) -> &'static str {
        self.primary_binary()
    }

    /// Directory the release archive unpacks into, if it is nested
    #[must_use]
    pub fn nested_dir(self, tag: &str) -> Option<String> {
        match self {
            ProductLine::Konvoy => Some(format!("konvoy_{tag}")),
            ProductLine::Dkp => None,
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductLine::Konvoy => write!(f, "Konvoy"),
            ProductLine::Dkp => write!(f, "DKP"),
        }
    }
}
