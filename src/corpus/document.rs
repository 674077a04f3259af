//! Retrieval documents and their typed provenance metadata.

use serde::{Deserialize, Serialize};

use super::loader::{Guide, Post};

/// Which enrichment and formatting path a document follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Guide,
    Post,
}

/// Provenance of a guide-derived document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuideMetadata {
    pub guideid: u64,
    pub title: String,
    pub category: String,
    pub subject: String,
    pub guide_type: String,
    pub data_type: String,
    pub url: String,
    pub summary: Option<String>,
}

/// Provenance of a forum-post-derived document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostMetadata {
    pub url: String,
    pub title: String,
    pub raw_comments: String,
}

/// Fixed metadata schema per source variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metadata {
    Guide(GuideMetadata),
    Post(PostMetadata),
}

impl Metadata {
    /// Flattened `key: value` pairs in a stable order, using the corpus field names
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        match self {
            Metadata::Guide(meta) => {
                let mut entries = vec![
                    ("guideid", meta.guideid.to_string()),
                    ("title", meta.title.clone()),
                    ("category", meta.category.clone()),
                    ("subject", meta.subject.clone()),
                    ("type", meta.guide_type.clone()),
                    ("dataType", meta.data_type.clone()),
                    ("url", meta.url.clone()),
                ];
                if let Some(summary) = &meta.summary {
                    entries.push(("summary", summary.clone()));
                }
                entries
            }
            Metadata::Post(meta) => vec![
                ("url", meta.url.clone()),
                ("title", meta.title.clone()),
                ("raw_comments", meta.raw_comments.clone()),
            ],
        }
    }

    /// True when every field carries an empty string
    pub fn is_blank(&self) -> bool {
        match self {
            // guideid is always present for guides
            Metadata::Guide(_) => false,
            Metadata::Post(meta) => {
                meta.url.trim().is_empty()
                    && meta.title.trim().is_empty()
                    && meta.raw_comments.trim().is_empty()
            }
        }
    }
}

/// The unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

/// Borrowed identity of a document: content plus metadata.
///
/// Two documents with equal keys are the same entity no matter which query
/// surfaced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey<'a> {
    content: &'a str,
    metadata: &'a Metadata,
}

impl Document {
    /// Build the indexed document for a guide record
    pub fn from_guide(guide: &Guide) -> Self {
        Self {
            content: format!(
                "{} - {} {} : {} {}",
                guide.data_type, guide.guide_type, guide.subject, guide.title, guide.url
            ),
            metadata: Metadata::Guide(GuideMetadata {
                guideid: guide.guideid,
                title: guide.title.clone(),
                category: guide.category.clone(),
                subject: guide.subject.clone(),
                guide_type: guide.guide_type.clone(),
                data_type: guide.data_type.clone(),
                url: guide.url.clone(),
                summary: guide.summary.clone(),
            }),
        }
    }

    /// Build the indexed document for a forum post
    pub fn from_post(post: &Post) -> Self {
        Self {
            content: format!("{} - {}", post.title, post.body),
            metadata: Metadata::Post(PostMetadata {
                url: post.url.clone(),
                title: post.title.clone(),
                raw_comments: post.comments.join("\n"),
            }),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.metadata {
            Metadata::Guide(_) => SourceKind::Guide,
            Metadata::Post(_) => SourceKind::Post,
        }
    }

    /// Guide id when the document is tied to a structured guide
    pub fn guideid(&self) -> Option<u64> {
        match &self.metadata {
            Metadata::Guide(meta) => Some(meta.guideid),
            Metadata::Post(_) => None,
        }
    }

    pub fn dedup_key(&self) -> DedupKey<'_> {
        DedupKey {
            content: &self.content,
            metadata: &self.metadata,
        }
    }

    /// Nothing worth handing to the generator
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.metadata.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guide(id: u64, title: &str) -> Guide {
        Guide {
            guideid: id,
            title: title.to_string(),
            category: "iPhone 12".to_string(),
            subject: "Screen".to_string(),
            guide_type: "replacement".to_string(),
            data_type: "guide".to_string(),
            url: format!("https://www.ifixit.com/Guide/{}", id),
            summary: None,
        }
    }

    #[test]
    fn test_guide_document_content() {
        let doc = Document::from_guide(&guide(42, "Replace screen"));
        assert_eq!(
            doc.content,
            "guide - replacement Screen : Replace screen https://www.ifixit.com/Guide/42"
        );
        assert_eq!(doc.source_kind(), SourceKind::Guide);
        assert_eq!(doc.guideid(), Some(42));
    }

    #[test]
    fn test_post_document_joins_comments() {
        let post = Post {
            title: "Laptop won't boot".to_string(),
            body: "Black screen after update".to_string(),
            url: "https://reddit.com/r/techsupport/1".to_string(),
            comments: vec!["Try safe mode".to_string(), "Reseat RAM".to_string()],
        };
        let doc = Document::from_post(&post);
        assert_eq!(doc.content, "Laptop won't boot - Black screen after update");
        assert_eq!(doc.guideid(), None);
        match &doc.metadata {
            Metadata::Post(meta) => assert_eq!(meta.raw_comments, "Try safe mode\nReseat RAM"),
            Metadata::Guide(_) => panic!("expected post metadata"),
        }
    }

    #[test]
    fn test_guide_entries_use_corpus_keys() {
        let doc = Document::from_guide(&guide(7, "Battery"));
        let keys: Vec<&str> = doc.metadata.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["guideid", "title", "category", "subject", "type", "dataType", "url"]
        );
    }

    #[test]
    fn test_dedup_key_equality() {
        let a = Document::from_guide(&guide(1, "Fan"));
        let b = Document::from_guide(&guide(1, "Fan"));
        let c = Document::from_guide(&guide(2, "Fan"));
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_blank_post_is_empty() {
        let doc = Document {
            content: "   ".to_string(),
            metadata: Metadata::Post(PostMetadata {
                url: String::new(),
                title: String::new(),
                raw_comments: String::new(),
            }),
        };
        assert!(doc.is_empty());
    }
}
