//! Conversion from GitHub payloads to platform-agnostic types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::error::GitHubError;
use super::types::{ContentFile, GitHubAsset, GitHubRelease, WorkflowList};
use crate::platform::{Release, ReleaseAsset};

/// Convert a GitHub release to a platform-agnostic `Release`.
pub fn to_release(release: GitHubRelease) -> Release {
    Release {
        tag: release.tag_name,
        draft: release.draft,
        prerelease: release.prerelease,
        published_at: release.published_at,
        assets: release.assets.into_iter().map(to_release_asset).collect(),
    }
}

fn to_release_asset(asset: GitHubAsset) -> ReleaseAsset {
    ReleaseAsset {
        name: asset.name,
        uploader: asset.uploader.map(|u| u.login),
        url: asset.browser_download_url,
    }
}

/// Workflow file paths, in listing order.
pub fn workflow_paths(list: WorkflowList) -> Vec<String> {
    list.workflows.into_iter().map(|w| w.path).collect()
}

/// Decode the body of a contents response.
///
/// GitHub wraps base64 at 60 columns, so whitespace is stripped first.
pub fn decode_content(file: ContentFile) -> Result<Vec<u8>, GitHubError> {
    let content = file.content.unwrap_or_default();
    match file.encoding.as_deref() {
        Some("base64") | None => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| GitHubError::Decode(format!("invalid base64 content: {e}")))
        }
        Some("utf-8") | Some("utf8") => Ok(content.into_bytes()),
        Some(other) => Err(GitHubError::Decode(format!(
            "unsupported content encoding '{other}'"
        ))),
    }
}
