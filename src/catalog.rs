// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Remote release catalog
//!
//! This module talks to the GitHub REST API to list the releases of each DKP
//! product line and to download release assets. Catalog data is read-only:
//! a `Release` is never modified after it has been fetched.

use std::error::Error;
use std::io::Write;

use attohttpc::header::{ACCEPT, LOCATION, USER_AGENT};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::credentials::Token;
use crate::product::ProductLine;
use crate::version::filter_releases;
use crate::{GITHUB_API_BASE, GITHUB_OWNER, Platform};

/// Environment variable overriding the API base URL
pub const API_BASE_ENV_VAR: &str = "DKPSWITCH_GITHUB_API";

/// Releases requested per page from the GitHub API (the API maximum)
const PAGE_SIZE: usize = 100;

/// Header carrying the expiry of fine-grained or expiring tokens
const TOKEN_EXPIRATION_HEADER: &str = "github-authentication-token-expiration";

/// A downloadable file attached to a release
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Asset {
    #[serde(default)]
    pub id: u64,
    /// Public file name as uploaded
    #[serde(default)]
    pub name: String,
    /// API URL; serves the binary when requested as `application/octet-stream`
    pub url: String,
    /// Browser-facing download URL
    #[serde(default)]
    pub browser_download_url: String,
}

impl Asset {
    /// File name of the artifact, taken from the download URL
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.browser_download_url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(&self.name)
    }
}

/// A published release of a product line
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Build an asset-less release, mostly useful for lookups and tests
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: Some(name.to_string()),
            tag_name: name.to_string(),
            prerelease: false,
            published_at: None,
            assets: Vec::new(),
        }
    }

    /// Release identifier; the tag is used when the release has no title
    #[must_use]
    pub fn name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => &self.tag_name,
        }
    }
}

/// Select the single asset built for `platform`
///
/// Assets are matched on their file name containing the OS identifier. When
/// several match, the architecture identifier narrows the choice.
///
/// # Errors
/// Returns error if no asset matches, or if the match remains ambiguous
pub fn select_asset<'a>(
    release: &'a Release,
    platform: &Platform,
) -> Result<&'a Asset, Box<dyn Error>> {
    let by_os: Vec<&Asset> = release
        .assets
        .iter()
        .filter(|a| a.file_name().contains(platform.os))
        .collect();

    let matches: Vec<&Asset> = if by_os.len() > 1 {
        by_os
            .into_iter()
            .filter(|a| a.file_name().contains(platform.arch))
            .collect()
    } else {
        by_os
    };

    match matches.as_slice() {
        [asset] => Ok(*asset),
        [] => Err(format!(
            "No asset found for {}/{} in release {}",
            platform.os,
            platform.arch,
            release.name()
        )
        .into()),
        many => Err(format!(
            "Ambiguous assets for {}/{} in release {}: {}",
            platform.os,
            platform.arch,
            release.name(),
            many.iter()
                .map(|a| a.file_name())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .into()),
    }
}

/// Source of release asset bytes
pub trait Downloader {
    /// Stream the contents of `asset` into `dest`
    ///
    /// # Returns
    /// Number of bytes written
    ///
    /// # Errors
    /// Returns error on any transport or I/O failure
    fn download(&self, asset: &Asset, dest: &mut dyn Write) -> Result<u64, Box<dyn Error>>;
}

/// Authenticated user as reported by the API
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub login: String,
    /// Token expiry, when the token has one
    pub token_expiration: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

/// Blocking GitHub API client bound to one access token
#[derive(Debug, Clone)]
pub struct GithubClient {
    api_base: String,
    token: Token,
    verbose: bool,
}

impl GithubClient {
    /// Create a client against the public GitHub API
    #[must_use]
    pub fn new(token: Token, verbose: bool) -> Self {
        Self::with_base_url(GITHUB_API_BASE, token, verbose)
    }

    /// Create a client against an alternate API endpoint
    #[must_use]
    pub fn with_base_url(api_base: &str, token: Token, verbose: bool) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            verbose,
        }
    }

    fn user_agent() -> String {
        format!("dkpswitch/{}", env!("CARGO_PKG_VERSION"))
    }

    fn get_json(&self, url: &str) -> Result<attohttpc::Response, Box<dyn Error>> {
        if self.verbose {
            eprintln!("GET {url}");
        }

        let resp = attohttpc::get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, Self::user_agent())
            .bearer_auth(self.token.expose())
            .send()?;

        if !resp.is_success() {
            return Err(format!("GitHub API request failed: {url} ({})", resp.status()).into());
        }
        Ok(resp)
    }

    /// Verify the token by fetching the authenticated user
    ///
    /// # Errors
    /// Returns error if the request fails or the token is rejected
    pub fn authenticate(&self) -> Result<AuthenticatedUser, Box<dyn Error>> {
        let resp = self.get_json(&format!("{}/user", self.api_base))?;
        let token_expiration = resp
            .headers()
            .get(TOKEN_EXPIRATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let user: UserResponse = serde_json::from_str(&resp.text()?)?;
        Ok(AuthenticatedUser {
            login: user.login,
            token_expiration,
        })
    }

    /// List every release of `owner/repo`, following pagination
    ///
    /// # Errors
    /// Returns error if any page cannot be fetched or parsed
    pub fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, Box<dyn Error>> {
        let mut releases = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/repos/{owner}/{repo}/releases?per_page={PAGE_SIZE}&page={page}",
                self.api_base
            );
            let batch: Vec<Release> = serde_json::from_str(&self.get_json(&url)?.text()?)?;
            let done = batch.len() < PAGE_SIZE;
            releases.extend(batch);
            if done {
                break;
            }
        }

        if self.verbose {
            eprintln!("Found {} releases in {owner}/{repo}", releases.len());
        }
        Ok(releases)
    }

    /// List the releases of every product line
    ///
    /// # Errors
    /// Returns error if any repository listing fails
    pub fn list_product_releases(&self, ga_only: bool) -> Result<Vec<Release>, Box<dyn Error>> {
        let mut releases = Vec::new();
        for product in ProductLine::ALL {
            let listed = self.list_releases(GITHUB_OWNER, product.repository())?;
            releases.extend(filter_releases(listed, ga_only));
        }
        Ok(releases)
    }
}

impl Downloader for GithubClient {
    /// Fetch an asset through its API URL
    ///
    /// The API answers with a redirect to a pre-signed storage URL. That
    /// second request is made without the token, which must only reach the
    /// API host.
    fn download(&self, asset: &Asset, dest: &mut dyn Write) -> Result<u64, Box<dyn Error>> {
        if self.verbose {
            eprintln!("Downloading from: {}", asset.url);
        }

        let resp = attohttpc::get(&asset.url)
            .header(ACCEPT, "application/octet-stream")
            .header(USER_AGENT, Self::user_agent())
            .bearer_auth(self.token.expose())
            .follow_redirects(false)
            .send()?;

        let resp = if resp.status().is_redirection() {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("Redirect without Location for {}", asset.url))?;
            let target = resolve_location(&asset.url, location);
            if self.verbose {
                eprintln!("Following redirect to: {}", redact_query(&target));
            }
            attohttpc::get(&target)
                .header(ACCEPT, "application/octet-stream")
                .header(USER_AGENT, Self::user_agent())
                .send()?
        } else {
            resp
        };

        if !resp.is_success() {
            return Err(format!("Failed to download: {} ({})", asset.url, resp.status()).into());
        }

        Ok(resp.write_to(dest)?)
    }
}

/// Resolve a `Location` header value against the URL that produced it
fn resolve_location(base: &str, location: &str) -> String {
    if location.contains("://") {
        return location.to_string();
    }
    let (scheme, rest) = base.split_once("://").unwrap_or(("https", base));
    let authority = rest.split('/').next().unwrap_or(rest);
    if location.starts_with('/') {
        format!("{scheme}://{authority}{location}")
    } else {
        let dir = base.rsplit_once('/').map_or(base, |(dir, _)| dir);
        format!("{dir}/{location}")
    }
}

/// Strip the signature-bearing query string from a URL for display
fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(file: &str) -> Asset {
        Asset {
            id: 1,
            name: file.to_string(),
            url: format!("https://api.github.com/assets/{file}"),
            browser_download_url: format!("https://github.com/download/{file}"),
        }
    }

    #[test]
    fn file_name_comes_from_download_url() {
        let mut a = asset("dkp_v2.1.1_linux_amd64.tar.gz");
        a.name = "renamed".to_string();
        assert_eq!(a.file_name(), "dkp_v2.1.1_linux_amd64.tar.gz");

        a.browser_download_url.clear();
        assert_eq!(a.file_name(), "renamed");
    }

    #[test]
    fn relative_redirects_resolve_against_the_api_host() {
        let base = "https://api.github.com/repos/mesosphere/konvoy2/releases/assets/42";
        assert_eq!(
            resolve_location(base, "https://objects.example.com/a?sig=1"),
            "https://objects.example.com/a?sig=1"
        );
        assert_eq!(
            resolve_location(base, "/signed/42?sig=1"),
            "https://api.github.com/signed/42?sig=1"
        );
        assert_eq!(
            resolve_location(base, "43"),
            "https://api.github.com/repos/mesosphere/konvoy2/releases/assets/43"
        );
        assert_eq!(redact_query("https://x/a?sig=secret"), "https://x/a");
    }

    #[test]
    fn release_name_falls_back_to_tag() {
        let mut r = Release::named("v2.1.1");
        r.name = None;
        assert_eq!(r.name(), "v2.1.1");
        r.name = Some(String::new());
        assert_eq!(r.name(), "v2.1.1");
    }
}
