use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::RepoSlug;

/// Trust level of a cataloged plugin.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Candidate,
    Primary,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Candidate, Tier::Primary];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Candidate => "candidate",
            Tier::Primary => "primary",
        }
    }

    /// File name of this tier's entries inside the index directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Tier::Candidate => "candidate.json",
            Tier::Primary => "primary.json",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(Tier::Candidate),
            "primary" => Ok(Tier::Primary),
            other => Err(format!("unknown tier '{other}', expected candidate or primary")),
        }
    }
}

/// One published version of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    /// Release tag, `vMAJOR.MINOR.PATCH`.
    pub tag: String,
    /// Download URLs of the plugin package assets.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Release publication time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
}

impl VersionRecord {
    /// Semantic version of the tag, ignoring a leading `v`.
    pub fn semver(&self) -> Option<semver::Version> {
        parse_tag_version(&self.tag)
    }

    /// Whether this record is strictly newer than `other`.
    ///
    /// Tags that do not parse as semantic versions sort below every tag
    /// that does, and never count as newer than one another.
    pub fn is_newer_than(&self, other: &VersionRecord) -> bool {
        compare_tags(&self.tag, &other.tag) == Ordering::Greater
    }
}

/// Parse a release tag (`v1.2.3` or `1.2.3`) as a semantic version.
pub fn parse_tag_version(tag: &str) -> Option<semver::Version> {
    let raw = tag.strip_prefix('v').unwrap_or(tag);
    semver::Version::parse(raw).ok()
}

fn compare_tags(a: &str, b: &str) -> Ordering {
    match (parse_tag_version(a), parse_tag_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// A cataloged plugin as stored in a tier file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    /// Stable identifier, also the key in the tier file and the registry.
    #[serde(default)]
    pub id: String,
    pub repository: RepoSlug,
    #[serde(default)]
    pub tier: Tier,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub serialized_name: String,
    /// Newest first.
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl PluginEntry {
    /// The head of the version history.
    pub fn latest_version(&self) -> Option<&VersionRecord> {
        self.versions.first()
    }

    /// Time since the entry last changed.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_modified
    }
}

/// A repository's verification failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub failures: u32,
    pub last_failure: DateTime<Utc>,
    pub reason: String,
}

impl BlacklistEntry {
    pub fn is_blacklisted(&self, threshold: u32) -> bool {
        self.failures >= threshold
    }
}

/// What an upsert did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A registry/tier-file disagreement found by a consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyIssue {
    /// A tier file holds an id the registry does not know.
    Unregistered { id: String, tier: Tier },
    /// The registry files the id under a different tier.
    WrongTier { id: String, registered: Tier, found: Tier },
    /// The registry names an id missing from its tier file.
    Dangling { id: String, registered: Tier },
}

impl ConsistencyIssue {
    pub fn id(&self) -> &str {
        match self {
            Self::Unregistered { id, .. }
            | Self::WrongTier { id, .. }
            | Self::Dangling { id, .. } => id,
        }
    }
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered { id, tier } => {
                write!(f, "'{id}' is in {} but not in the registry", tier.file_name())
            }
            Self::WrongTier {
                id,
                registered,
                found,
            } => write!(
                f,
                "'{id}' is registered as {registered} but filed in {}",
                found.file_name()
            ),
            Self::Dangling { id, registered } => write!(
                f,
                "'{id}' is registered as {registered} but missing from {}",
                registered.file_name()
            ),
        }
    }
}

/// Make a display name safe for use as a file or URL component.
///
/// Lowercases, turns whitespace runs into dots, drops anything outside
/// `[a-z0-9.-]`, collapses repeated dots and trims dots at either end.
pub fn serialized_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('.');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
            out.push(c);
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '.' && collapsed.ends_with('.') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('.').to_string()
}
