//! Pure release checks. No I/O happens here.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::parse_tag_version;
use crate::platform::Release;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+\.\d+$").expect("tag regex is valid"));

/// The newest release that is neither a draft nor a prerelease.
///
/// Releases arrive newest first.
pub fn latest_applicable(releases: &[Release]) -> Option<&Release> {
    releases.iter().find(|r| !r.draft && !r.prerelease)
}

fn has_extension(name: &str, extension: &str) -> bool {
    name.to_ascii_lowercase()
        .ends_with(&extension.to_ascii_lowercase())
}

/// Every asset must exist and come from the automation identity.
pub fn check_provenance(release: &Release, identity: &str) -> Option<String> {
    if release.assets.is_empty() {
        return Some(format!("Release {} has no assets", release.tag));
    }

    let foreign: Vec<String> = release
        .assets
        .iter()
        .filter(|a| a.uploader.as_deref() != Some(identity))
        .map(|a| match &a.uploader {
            Some(login) => format!("{} (uploaded by {login})", a.name),
            None => format!("{} (unknown uploader)", a.name),
        })
        .collect();

    if foreign.is_empty() {
        None
    } else {
        Some(format!(
            "Release {} has assets not uploaded by {identity}: {}",
            release.tag,
            foreign.join(", ")
        ))
    }
}

/// At least one asset must be a plugin package.
pub fn check_package_asset(release: &Release, extension: &str) -> Option<String> {
    if release.assets.iter().any(|a| has_extension(&a.name, extension)) {
        None
    } else {
        Some(format!(
            "Release {} contains no {extension} asset",
            release.tag
        ))
    }
}

/// Download URLs of the plugin package assets.
pub fn package_asset_urls(release: &Release, extension: &str) -> Vec<String> {
    release
        .assets
        .iter()
        .filter(|a| has_extension(&a.name, extension))
        .map(|a| a.url.clone())
        .collect()
}

/// The tag must read `vMAJOR.MINOR.PATCH`.
pub fn check_tag(tag: &str) -> Option<String> {
    if !TAG_RE.is_match(tag) {
        return Some(format!(
            "Release tag '{tag}' does not match vMAJOR.MINOR.PATCH"
        ));
    }
    match parse_tag_version(tag) {
        Some(_) => None,
        None => Some(format!("Release tag '{tag}' is not a valid semantic version")),
    }
}
