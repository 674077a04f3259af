//! Corpus loading for guides and forum posts
//!
//! Loading fails soft: a missing or malformed file is logged and treated as an
//! empty collection so the assistant can still serve degraded answers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

use crate::errors::{FixError, Result};

/// Maximum number of comments kept per post
pub const MAX_POST_COMMENTS: usize = 20;

/// A structured repair procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub guideid: u64,
    pub title: String,
    pub category: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub guide_type: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A forum thread with its first comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub body: String,
    pub url: String,
    pub comments: Vec<String>,
}

/// Guide record as persisted; every field is optional on disk
#[derive(Debug, Deserialize)]
struct GuideRecord {
    #[serde(default)]
    guideid: Option<JsonValue>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default, rename = "type")]
    guide_type: Option<String>,
    #[serde(default, rename = "dataType")]
    data_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Post record as persisted (scraper field names)
#[derive(Debug, Deserialize)]
struct PostRecord {
    #[serde(default)]
    titre: Option<String>,
    #[serde(default)]
    contenu: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    comments: Option<Vec<String>>,
}

fn parse_guideid(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl GuideRecord {
    fn into_guide(self) -> Option<Guide> {
        let guideid = self.guideid.as_ref().and_then(parse_guideid)?;
        Some(Guide {
            guideid,
            title: self.title.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            guide_type: self.guide_type.unwrap_or_default(),
            data_type: self.data_type.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            summary: self.summary.filter(|s| !s.trim().is_empty()),
        })
    }
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let mut comments = record.comments.unwrap_or_default();
        comments.truncate(MAX_POST_COMMENTS);
        Self {
            title: record.titre.unwrap_or_default(),
            body: record.contenu.unwrap_or_default(),
            url: record.url.unwrap_or_default(),
            comments,
        }
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = std::fs::read_to_string(path).map_err(|e| FixError::CorpusUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|e| FixError::CorpusUnavailable {
        path: path.display().to_string(),
        reason: format!("malformed JSON: {}", e),
    })
}

/// Load guides, reporting failures to the caller
pub fn try_load_guides(path: &Path) -> Result<Vec<Guide>> {
    let records: Vec<GuideRecord> = read_records(path)?;
    let total = records.len();

    let mut seen = HashSet::new();
    let mut guides = Vec::with_capacity(total);
    for record in records {
        match record.into_guide() {
            Some(guide) if seen.insert(guide.guideid) => guides.push(guide),
            Some(guide) => warn!(guideid = guide.guideid, "Duplicate guide id, keeping first record"),
            None => warn!(path = %path.display(), "Skipping guide record without a usable guideid"),
        }
    }

    info!(path = %path.display(), loaded = guides.len(), total, "Guides loaded");
    Ok(guides)
}

/// Load posts, reporting failures to the caller
pub fn try_load_posts(path: &Path) -> Result<Vec<Post>> {
    let records: Vec<PostRecord> = read_records(path)?;
    let posts: Vec<Post> = records.into_iter().map(Post::from).collect();
    info!(path = %path.display(), loaded = posts.len(), "Posts loaded");
    Ok(posts)
}

/// Load guides; a missing or corrupt file yields an empty list
pub fn load_guides(path: &Path) -> Vec<Guide> {
    try_load_guides(path).unwrap_or_else(|e| {
        error!(error = %e, "Failed to load guides, continuing with an empty guide corpus");
        Vec::new()
    })
}

/// Load posts; a missing or corrupt file yields an empty list
pub fn load_posts(path: &Path) -> Vec<Post> {
    try_load_posts(path).unwrap_or_else(|e| {
        error!(error = %e, "Failed to load posts, continuing with an empty post corpus");
        Vec::new()
    })
}
