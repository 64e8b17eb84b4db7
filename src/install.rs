// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Release installation
//!
//! Downloads a release artifact into the cache root, extracts it with the
//! system `tar`, publishes the binary through a symlink and records the
//! selection in the marker file. Every step is skipped when its output is
//! already on disk, so installing the same release twice only re-publishes
//! the link and rewrites the marker.
//!
//! Nothing here is transactional: an interruption between publishing the
//! link and writing the marker leaves the two out of sync.

use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::catalog::{Asset, Downloader, Release, select_asset};
use crate::marker::write_marker;
use crate::product::ProductLine;
use crate::version::normalize_tag;
use crate::{DEFAULT_BIN_DIR, DEFAULT_CACHE_ROOT, Platform};

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV_VAR: &str = "DKPSWITCH_CACHE_DIR";

/// Environment variable overriding the publish directory
pub const BIN_DIR_ENV_VAR: &str = "DKPSWITCH_BIN_DIR";

/// Filesystem locations used by an installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Shared cache of archives and extracted binaries
    pub cache_root: PathBuf,
    /// Directory receiving the published symlink
    pub bin_dir: PathBuf,
    /// Directory holding the marker file
    pub marker_dir: PathBuf,
}

impl InstallLayout {
    /// Default layout, honoring the directory override variables
    ///
    /// # Errors
    /// Returns error if the current directory cannot be determined
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let cwd = std::env::current_dir()
            .map_err(|e| format!("Failed to determine current directory: {e}"))?;
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Ok(Self::with_overrides(
            var(CACHE_DIR_ENV_VAR).as_deref(),
            var(BIN_DIR_ENV_VAR).as_deref(),
            &cwd,
        ))
    }

    /// Layout rooted at `cwd`, with optional cache and publish directories
    ///
    /// Relative overrides are resolved against `cwd`: `tar` runs inside the
    /// release directory and link targets are read relative to the link, so
    /// every path in the layout must be absolute.
    #[must_use]
    pub fn with_overrides(cache_root: Option<&str>, bin_dir: Option<&str>, cwd: &Path) -> Self {
        Self {
            cache_root: cwd.join(cache_root.unwrap_or(DEFAULT_CACHE_ROOT)),
            bin_dir: cwd.join(bin_dir.unwrap_or(DEFAULT_BIN_DIR)),
            marker_dir: cwd.to_path_buf(),
        }
    }

    /// Extraction directory of a release
    #[must_use]
    pub fn release_dir(&self, tag: &str) -> PathBuf {
        self.cache_root.join(tag)
    }

    /// Cached location of a downloaded artifact
    #[must_use]
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.cache_root.join(file_name)
    }

    /// Binary the published link points at
    #[must_use]
    pub fn binary_path(&self, tag: &str, product: ProductLine) -> PathBuf {
        self.release_dir(tag).join(product.primary_binary())
    }

    /// Published symlink location
    #[must_use]
    pub fn link_path(&self, product: ProductLine) -> PathBuf {
        self.bin_dir.join(product.link_name())
    }
}

/// Outcome of a successful installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Normalized release identifier written to the marker
    pub tag: String,
    pub product: ProductLine,
    pub binary_path: PathBuf,
    pub link_path: PathBuf,
    /// Whether the artifact was fetched during this run
    pub downloaded: bool,
    /// Whether the artifact was extracted during this run
    pub extracted: bool,
}

/// Installs releases into an `InstallLayout`
pub struct Installer<'a> {
    layout: InstallLayout,
    downloader: &'a dyn Downloader,
    verbose: bool,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(layout: InstallLayout, downloader: &'a dyn Downloader, verbose: bool) -> Self {
        Self {
            layout,
            downloader,
            verbose,
        }
    }

    /// Install `release` for `platform` and make it the active version
    ///
    /// # Errors
    /// Returns error on the first failing step; earlier steps are not undone
    pub fn install(
        &self,
        release: &Release,
        platform: &Platform,
    ) -> Result<InstallReport, Box<dyn Error>> {
        let tag = normalize_tag(release.name());
        let layout = &self.layout;

        fs::create_dir_all(&layout.cache_root).map_err(|e| {
            format!(
                "Failed to create cache directory {}: {e}",
                layout.cache_root.display()
            )
        })?;

        let asset = select_asset(release, platform)?;
        let file_name = asset.file_name();
        let product = ProductLine::from_asset_name(file_name);

        let artifact_path = layout.artifact_path(file_name);
        let release_dir = layout.release_dir(&tag);
        fs::create_dir_all(&release_dir).map_err(|e| {
            format!(
                "Failed to create release directory {}: {e}",
                release_dir.display()
            )
        })?;

        let extracted_already = is_extracted(&release_dir, product);
        let skip_download = extracted_already || artifact_path.is_file();

        if self.verbose {
            eprintln!("Selected asset: {file_name} ({product})");
        }

        if skip_download {
            println!(
                "{tag} is already in {} - skipping download.",
                layout.cache_root.display()
            );
        } else {
            self.fetch(asset, &artifact_path)?;
        }

        if extracted_already {
            println!("Skipping inflation, already exists!");
        } else {
            extract_archive(&artifact_path, &release_dir, self.verbose)?;
            if let Some(nested) = product.nested_dir(&tag) {
                flatten_nested(&release_dir, &nested, product, self.verbose)?;
                remove_artifact(&artifact_path, self.verbose)?;
            }
        }

        let binary_path = layout.binary_path(&tag, product);
        let link_path = layout.link_path(product);
        publish_link(&binary_path, &link_path, self.verbose)?;

        write_marker(&layout.marker_dir, &tag)?;
        println!("Version set to {tag}!");

        Ok(InstallReport {
            tag,
            product,
            binary_path,
            link_path,
            downloaded: !skip_download,
            extracted: !extracted_already,
        })
    }

    /// Download an asset into the cache
    ///
    /// A failed download leaves no partial artifact behind, since the
    /// presence of the file alone marks it as valid on later runs.
    fn fetch(&self, asset: &Asset, dest: &Path) -> Result<(), Box<dyn Error>> {
        let file = fs::File::create(dest)
            .map_err(|e| format!("Failed to create {}: {e}", dest.display()))?;
        let mut out = BufWriter::new(file);

        let result = self
            .downloader
            .download(asset, &mut out)
            .and_then(|bytes| out.flush().map(|()| bytes).map_err(Into::into));

        match result {
            Ok(bytes) => {
                if self.verbose {
                    eprintln!("Downloaded {bytes} bytes to {}", dest.display());
                }
                Ok(())
            }
            Err(e) => {
                drop(out);
                if let Err(rm) = fs::remove_file(dest)
                    && self.verbose
                {
                    eprintln!(
                        "Warning: failed to remove partial download {}: {rm}",
                        dest.display()
                    );
                }
                Err(e)
            }
        }
    }
}

/// Whether every binary of `product` is present in `release_dir`
#[must_use]
pub fn is_extracted(release_dir: &Path, product: ProductLine) -> bool {
    product
        .binaries()
        .iter()
        .all(|bin| release_dir.join(bin).is_file())
}

/// Run `tar -xvf <archive>` inside `dest_dir`
///
/// # Errors
/// Returns error if `tar` cannot be found or spawned, or exits unsuccessfully
pub fn extract_archive(archive: &Path, dest_dir: &Path, verbose: bool) -> Result<(), Box<dyn Error>> {
    let tar = which::which("tar").map_err(|e| format!("Failed to locate tar: {e}"))?;

    if verbose {
        eprintln!(
            "{} -xvf {} (in {})",
            tar.display(),
            archive.display(),
            dest_dir.display()
        );
    }

    let output = Command::new(&tar)
        .arg("-xvf")
        .arg(archive)
        .current_dir(dest_dir)
        .output()
        .map_err(|e| format!("Failed to run tar: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "Failed to extract {} ({}): {}",
            archive.display(),
            output.status,
            stderr.trim()
        )
        .into());
    }

    if verbose {
        eprint!("{}", String::from_utf8_lossy(&output.stdout));
    }
    Ok(())
}

/// Move binaries out of a nested archive directory and remove it
fn flatten_nested(
    release_dir: &Path,
    nested: &str,
    product: ProductLine,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let nested_dir = release_dir.join(nested);

    for bin in product.binaries() {
        let from = nested_dir.join(bin);
        let to = release_dir.join(bin);
        if verbose {
            eprintln!("mv {} {}", from.display(), to.display());
        }
        fs::rename(&from, &to).map_err(|e| {
            format!(
                "Failed to move {} to release directory: {e}",
                from.display()
            )
        })?;
    }

    if verbose {
        eprintln!("rm -r {}", nested_dir.display());
    }
    fs::remove_dir_all(&nested_dir)
        .map_err(|e| format!("Failed to remove {}: {e}", nested_dir.display()))?;
    Ok(())
}

fn remove_artifact(artifact: &Path, verbose: bool) -> Result<(), Box<dyn Error>> {
    if verbose {
        eprintln!("rm {}", artifact.display());
    }
    fs::remove_file(artifact)
        .map_err(|e| format!("Failed to remove {}: {e}", artifact.display()))?;
    Ok(())
}

/// Point `link` at `target`, replacing whatever is there
///
/// # Errors
/// Returns error if the old entry cannot be removed or the link created
pub fn publish_link(target: &Path, link: &Path, verbose: bool) -> Result<(), Box<dyn Error>> {
    match fs::remove_file(link) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(format!(
                "Failed to remove existing file/symlink at {}: {e}",
                link.display()
            )
            .into());
        }
    }

    if verbose {
        eprintln!("Creating link: {} -> {}", link.display(), target.display());
    }

    std::os::unix::fs::symlink(target, link).map_err(|e| {
        format!(
            "Failed to create symlink {} -> {}: {e}",
            link.display(),
            target.display()
        )
    })?;
    Ok(())
}
