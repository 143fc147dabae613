//! Shared fixtures for integration tests.
//!
//! [`FakeClient`] is an in-memory [`RemoteRepositoryClient`] whose
//! repositories can be edited between runs. It counts calls and can be told
//! to start returning rate-limit errors after a number of calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use plugdex::platform::{
    RateLimitInfo, Release, ReleaseAsset, RemoteError, RemoteRepositoryClient, RepoSlug, Result,
};

/// Upper bound for any engine call in tests. Exceeding it means a hang.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const BOT: &str = "github-actions[bot]";

/// Everything the fake knows about one repository.
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub workflows: Vec<String>,
    /// Newest first.
    pub releases: Vec<Release>,
    pub files: HashMap<String, Vec<u8>>,
}

impl FakeRepo {
    /// A repository that passes every check with release `tag`.
    pub fn passing(name: &str, tag: &str) -> Self {
        let manifest = serde_json::json!({
            "id": name,
            "name": name,
            "version": tag.trim_start_matches('v'),
            "minimumHostVersion": "4.0.0",
            "description": format!("{name} plugin"),
        });
        Self {
            workflows: vec![".github/workflows/release.yml".to_string()],
            releases: vec![release(tag, BOT)],
            files: HashMap::from([(
                "manifest.json".to_string(),
                serde_json::to_vec(&manifest).unwrap(),
            )]),
        }
    }

    /// Put a newer release in front of the existing ones.
    pub fn with_release(mut self, release: Release) -> Self {
        self.releases.insert(0, release);
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn without_workflows(mut self) -> Self {
        self.workflows.clear();
        self
    }
}

pub fn published_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A published release with one package asset uploaded by `uploader`.
pub fn release(tag: &str, uploader: &str) -> Release {
    Release {
        tag: tag.to_string(),
        draft: false,
        prerelease: false,
        published_at: Some(published_at()),
        assets: vec![ReleaseAsset {
            name: "plugin.eagleplugin".to_string(),
            uploader: Some(uploader.to_string()),
            url: format!("https://example.invalid/download/{tag}/plugin.eagleplugin"),
        }],
    }
}

pub fn slug(s: &str) -> RepoSlug {
    s.parse().unwrap()
}

/// In-memory remote.
#[derive(Default)]
pub struct FakeClient {
    repos: Mutex<HashMap<String, FakeRepo>>,
    calls: AtomicUsize,
    limit_after: Mutex<Option<usize>>,
    quota: Mutex<Option<usize>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, repo: &str, fake: FakeRepo) -> Self {
        self.set_repo(repo, fake);
        self
    }

    pub fn set_repo(&self, repo: &str, fake: FakeRepo) {
        self.repos
            .lock()
            .unwrap()
            .insert(repo.to_ascii_lowercase(), fake);
    }

    pub fn remove_repo(&self, repo: &str) {
        self.repos.lock().unwrap().remove(&repo.to_ascii_lowercase());
    }

    /// Calls made so far, `rate_limit` excluded.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail every call after the next `n` with a rate-limit error.
    pub fn exhaust_after(&self, n: usize) {
        *self.limit_after.lock().unwrap() = Some(self.calls() + n);
    }

    /// Report `remaining` calls from `rate_limit`.
    pub fn set_quota(&self, remaining: usize) {
        *self.quota.lock().unwrap() = Some(remaining);
    }

    fn enter(&self) -> Result<()> {
        let made = self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.limit_after.lock().unwrap() {
            Some(limit) if made >= limit => Err(RemoteError::RateLimited {
                reset_at: Utc::now() + chrono::Duration::minutes(30),
            }),
            _ => Ok(()),
        }
    }

    fn repo(&self, repo: &RepoSlug) -> Result<FakeRepo> {
        self.repos
            .lock()
            .unwrap()
            .get(&repo.to_string().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| RemoteError::not_found(repo.to_string()))
    }
}

#[async_trait]
impl RemoteRepositoryClient for FakeClient {
    async fn exists(&self, repo: &RepoSlug) -> Result<bool> {
        self.enter()?;
        match self.repo(repo) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_file(&self, repo: &RepoSlug, path: &str) -> Result<Vec<u8>> {
        self.enter()?;
        self.repo(repo)?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::not_found(format!("{repo}/{path}")))
    }

    async fn list_workflows(&self, repo: &RepoSlug) -> Result<Vec<String>> {
        self.enter()?;
        Ok(self.repo(repo)?.workflows)
    }

    async fn list_releases(&self, repo: &RepoSlug) -> Result<Vec<Release>> {
        self.enter()?;
        Ok(self.repo(repo)?.releases)
    }

    async fn rate_limit(&self) -> Result<RateLimitInfo> {
        match *self.quota.lock().unwrap() {
            Some(remaining) => Ok(RateLimitInfo {
                limit: 5000,
                remaining,
                reset_at: Utc::now() + chrono::Duration::hours(1),
            }),
            None => Err(RemoteError::AuthRequired),
        }
    }
}
