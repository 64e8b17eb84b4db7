// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Release identifier handling
//!
//! Normalization, GA detection, ordering and lookup of release names such as
//! `v2.1.1` or `v2.2.0-rc1`.

use std::cmp::Ordering;

use crate::catalog::Release;

/// Ensure a release identifier carries the conventional `v` prefix
///
/// # Examples
/// ```
/// use dkpswitch::version::normalize_tag;
/// assert_eq!(normalize_tag("2.1.1"), "v2.1.1");
/// assert_eq!(normalize_tag("v2.1.1"), "v2.1.1");
/// ```
#[must_use]
pub fn normalize_tag(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('v') {
        name.to_string()
    } else {
        format!("v{name}")
    }
}

/// Check whether a release name denotes a general availability release
///
/// GA releases are recognized solely by the absence of a hyphen.
///
/// # Examples
/// ```
/// use dkpswitch::version::is_ga;
/// assert!(is_ga("v2.1.1"));
/// assert!(!is_ga("v2.2.0-rc1"));
/// ```
#[must_use]
pub fn is_ga(name: &str) -> bool {
    !name.contains('-')
}

/// Compare two release identifiers numerically
///
/// A leading `v` is ignored. Pre-releases sort below the GA release with the
/// same base version, and pre-release suffixes compare lexicographically.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse_version = |v: &str| -> (Vec<u32>, Option<String>) {
        let v = v.trim().trim_start_matches('v');
        let (base, suffix) = match v.split_once('-') {
            Some((base, suffix)) => (base, Some(suffix.to_string())),
            None => (v, None),
        };
        let parts = base
            .split('.')
            .filter_map(|part| part.parse::<u32>().ok())
            .collect();
        (parts, suffix)
    };

    let (a_parts, a_suffix) = parse_version(a);
    let (b_parts, b_suffix) = parse_version(b);

    let max_len = a_parts.len().max(b_parts.len());
    for i in 0..max_len {
        let a_part = a_parts.get(i).unwrap_or(&0);
        let b_part = b_parts.get(i).unwrap_or(&0);
        match a_part.cmp(b_part) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    match (a_suffix, b_suffix) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a_suffix), Some(b_suffix)) => a_suffix.cmp(&b_suffix),
        (None, None) => a.cmp(b),
    }
}

/// Keep only GA releases when `ga_only` is set, otherwise keep everything
#[must_use]
pub fn filter_releases(releases: Vec<Release>, ga_only: bool) -> Vec<Release> {
    if !ga_only {
        return releases;
    }
    releases.into_iter().filter(|r| is_ga(r.name())).collect()
}

/// Release names sorted newest first
#[must_use]
pub fn sorted_names(releases: &[Release]) -> Vec<String> {
    let mut names: Vec<String> = releases.iter().map(|r| r.name().to_string()).collect();
    names.sort_by(|a, b| compare_versions(b, a));
    names.dedup();
    names
}

/// Find the GA release best matching a requested version string
///
/// Names are compared after normalization, so `1.8.4`, `v1.8.4` and a
/// release titled `1.8.4` all agree. An exact match wins; otherwise a
/// request names a version prefix on whole components and the newest
/// release under it is returned, so `2.1` resolves to the latest `v2.1.x`
/// and never to `v2.10.0`.
///
/// # Examples
/// ```
/// use dkpswitch::catalog::Release;
/// use dkpswitch::version::find_release;
///
/// let releases = vec![
///     Release::named("v2.1.0"),
///     Release::named("v2.1.1"),
///     Release::named("v2.10.0"),
/// ];
/// assert_eq!(find_release(&releases, "2.1").unwrap().name(), "v2.1.1");
/// assert!(find_release(&releases, "3.0").is_none());
/// ```
#[must_use]
pub fn find_release<'a>(releases: &'a [Release], requested: &str) -> Option<&'a Release> {
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }
    let normalized = normalize_tag(requested);
    let component_prefix = format!("{normalized}.");

    let mut exact = None;
    let mut candidates: Vec<&Release> = Vec::new();
    for release in releases.iter().filter(|r| is_ga(r.name())) {
        let tag = normalize_tag(release.name());
        if tag == normalized {
            if exact.is_none() {
                exact = Some(release);
            }
        } else if tag.starts_with(&component_prefix) {
            candidates.push(release);
        }
    }

    if exact.is_some() {
        return exact;
    }
    candidates.sort_by(|a, b| compare_versions(a.name(), b.name()));
    candidates.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_ignores_leading_v() {
        assert_eq!(compare_versions("v2.1.1", "2.1.1"), Ordering::Greater);
        assert_eq!(compare_versions("v2.10.0", "v2.9.9"), Ordering::Greater);
    }

    #[test]
    fn prerelease_sorts_below_ga() {
        assert_eq!(compare_versions("v2.2.0-rc1", "v2.2.0"), Ordering::Less);
        assert_eq!(compare_versions("v2.2.0-rc1", "v2.1.9"), Ordering::Greater);
    }

    #[test]
    fn partial_request_matches_whole_components() {
        let releases = vec![Release::named("v2.10.0"), Release::named("v12.1.0")];
        assert!(find_release(&releases, "2.1").is_none());
        assert!(find_release(&releases, "1").is_none());
        assert_eq!(find_release(&releases, "2").unwrap().name(), "v2.10.0");
        assert_eq!(find_release(&releases, "12").unwrap().name(), "v12.1.0");
    }

    #[test]
    fn empty_request_matches_nothing() {
        let releases = vec![Release::named("v2.1.1")];
        assert!(find_release(&releases, "  ").is_none());
    }
}
