//! Resolution of `{{dotted.path}}` placeholders against a repository's
//! default-locale bundle.
//!
//! Manifests may declare their display name or description as a key into
//! a locale file instead of a literal. The resolver swaps the key for the
//! bundle's string when it can and hands back the literal otherwise, so a
//! broken bundle never blocks ingestion.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::platform::{RemoteRepositoryClient, RepoSlug, short_error_message};

/// Default location of the default-locale bundle.
pub const DEFAULT_LOCALE_PATH: &str = "_locales/en.json";

/// Outcome of resolving one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved string, or the input unchanged.
    pub text: String,
    /// Whether a placeholder was found and replaced.
    pub was_resolved: bool,
}

impl Resolution {
    fn literal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            was_resolved: false,
        }
    }
}

/// Extract the dotted path from a whole-string `{{ key }}` placeholder.
pub fn placeholder_key(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("{{")?.strip_suffix("}}")?.trim();
    if inner.is_empty() || inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner)
}

/// Walk `path` (dot separated) through `bundle`, returning a string leaf.
pub fn lookup<'a>(bundle: &'a Value, path: &str) -> Option<&'a str> {
    path.split('.')
        .try_fold(bundle, |node, segment| node.as_object()?.get(segment))?
        .as_str()
}

/// Resolves placeholders for any number of repositories, fetching each
/// repository's bundle at most once.
pub struct LocalizationResolver<'a, C: ?Sized> {
    client: &'a C,
    locale_path: String,
    bundles: Mutex<HashMap<RepoSlug, Option<Arc<Value>>>>,
}

impl<'a, C: RemoteRepositoryClient + ?Sized> LocalizationResolver<'a, C> {
    pub fn new(client: &'a C, locale_path: impl Into<String>) -> Self {
        Self {
            client,
            locale_path: locale_path.into(),
            bundles: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `text` for `repo`.
    ///
    /// Plain literals are returned without touching the network.
    pub async fn resolve(&self, repo: &RepoSlug, text: &str) -> Resolution {
        let Some(key) = placeholder_key(text) else {
            return Resolution::literal(text);
        };

        let Some(bundle) = self.bundle(repo).await else {
            return Resolution::literal(text);
        };

        match lookup(&bundle, key) {
            Some(resolved) => Resolution {
                text: resolved.to_string(),
                was_resolved: true,
            },
            None => {
                tracing::debug!(repo = %repo, key, "Localization key not found in bundle");
                Resolution::literal(text)
            }
        }
    }

    async fn bundle(&self, repo: &RepoSlug) -> Option<Arc<Value>> {
        let mut bundles = self.bundles.lock().await;
        if let Some(cached) = bundles.get(repo) {
            return cached.clone();
        }

        let fetched = match self.client.get_file(repo, &self.locale_path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Some(Arc::new(value)),
                Err(e) => {
                    tracing::warn!(
                        repo = %repo,
                        path = %self.locale_path,
                        "Locale bundle is not valid JSON: {}",
                        e
                    );
                    None
                }
            },
            Err(e) => {
                tracing::debug!(
                    repo = %repo,
                    path = %self.locale_path,
                    "Locale bundle unavailable: {}",
                    short_error_message(&e)
                );
                None
            }
        };

        bundles.insert(repo.clone(), fetched.clone());
        fetched
    }
}
