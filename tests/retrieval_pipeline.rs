//! End-to-end retrieval over corpus files on disk

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use fixbuddy::corpus::{ChunkingConfig, CorpusConfig};
use fixbuddy::embedding::{Embedder, HashingEmbedder};
use fixbuddy::enrichment::{BackoffPolicy, GuideResponse, GuideStepEnricher, GuideStepSource};
use fixbuddy::errors::Result;
use fixbuddy::rag::{IndexSettings, RetrievalConfig, RetrievalContext, RetrievalPipeline, StaticExpander};
use fixbuddy::recommend::RecommenderConfig;

const GUIDES: &str = r#"[
    {"guideid": 42, "title": "Replace screen", "category": "iPhone 12", "subject": "Screen",
     "type": "replacement", "dataType": "guide", "url": "https://www.ifixit.com/Guide/42"},
    {"guideid": 7, "title": "Battery replacement", "category": "iPhone 12", "subject": "Battery",
     "type": "replacement", "dataType": "guide", "url": "https://www.ifixit.com/Guide/7"},
    {"title": "Guide without id"}
]"#;

const POSTS: &str = r#"[
    {"titre": "Laptop fan very loud", "contenu": "Fan spins at full speed after boot",
     "url": "https://reddit.com/r/techsupport/1", "comments": ["Clean the fan", "Check thermal paste"]}
]"#;

const ONE_STEP: &str = r#"{"steps":[{"lines":[{"text_rendered":"Heat the edges of the display"}]}]}"#;

struct Workspace {
    _dir: TempDir,
    guides: PathBuf,
    posts: PathBuf,
}

fn workspace(guides: &str, posts: Option<&str>) -> Workspace {
    let dir = TempDir::new().unwrap();
    let guides_path = dir.path().join("guides.json");
    let posts_path = dir.path().join("posts.json");
    std::fs::write(&guides_path, guides).unwrap();
    if let Some(posts) = posts {
        std::fs::write(&posts_path, posts).unwrap();
    }
    Workspace {
        _dir: dir,
        guides: guides_path,
        posts: posts_path,
    }
}

fn settings(guides: &Path, posts: &Path) -> IndexSettings {
    IndexSettings {
        corpus: CorpusConfig {
            guides_path: guides.to_path_buf(),
            posts_path: posts.to_path_buf(),
        },
        chunking: ChunkingConfig::default(),
        batch_size: 8,
        recommender: RecommenderConfig::default(),
    }
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(512))
}

async fn context_for(ws: &Workspace) -> RetrievalContext {
    RetrievalContext::initialize(settings(&ws.guides, &ws.posts), embedder())
        .await
        .unwrap()
}

/// Answers every request from a script, recording how often it was called
struct ScriptedGuideApi {
    script: Mutex<Vec<u16>>,
    calls: Mutex<u32>,
}

impl ScriptedGuideApi {
    fn new(statuses: &[u16]) -> Self {
        let mut script = statuses.to_vec();
        script.reverse();
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GuideStepSource for ScriptedGuideApi {
    async fn fetch_guide(&self, _guideid: u64) -> Result<GuideResponse> {
        *self.calls.lock().unwrap() += 1;
        let status = self.script.lock().unwrap().pop().unwrap_or(200);
        let body = if status == 200 { ONE_STEP.to_string() } else { String::new() };
        Ok(GuideResponse { status, body })
    }
}

#[tokio::test]
async fn test_empty_guides_file_gives_empty_results() {
    let ws = workspace("[]", None);
    let ctx = context_for(&ws).await;

    let stats = ctx.stats();
    assert_eq!(stats.guides, 0);
    assert_eq!(stats.posts, 0);
    assert_eq!(stats.chunks, 0);

    let outcome = RetrievalPipeline::new(RetrievalConfig::default())
        .run(&ctx, "my screen is cracked")
        .await
        .unwrap();
    assert!(outcome.is_empty());
    assert!(outcome.context.text.is_empty());
    assert!(ctx.recommend("my screen is cracked", 3, None).unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_guides_file_degrades_to_empty() {
    let ws = workspace("{not json", Some(POSTS));
    let ctx = context_for(&ws).await;
    assert_eq!(ctx.stats().guides, 0);
    assert_eq!(ctx.stats().posts, 1);
}

#[tokio::test]
async fn test_single_guide_found_above_threshold() {
    let ws = workspace(
        r#"[{"guideid": 42, "title": "Replace screen", "category": "", "subject": "", "type": "", "dataType": "", "url": ""}]"#,
        None,
    );
    let ctx = context_for(&ws).await;

    let outcome = RetrievalPipeline::new(RetrievalConfig::default())
        .run(&ctx, "screen replacement")
        .await
        .unwrap();

    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.documents[0].document.guideid(), Some(42));
    assert!(outcome.documents[0].score > 0.3);
}

#[tokio::test]
async fn test_corpus_loaded_and_indexed() {
    let ws = workspace(GUIDES, Some(POSTS));
    let ctx = context_for(&ws).await;

    let stats = ctx.stats();
    assert_eq!(stats.guides, 2);
    assert_eq!(stats.posts, 1);
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.dimension, 512);
}

#[tokio::test]
async fn test_post_context_carries_comments() {
    let ws = workspace(GUIDES, Some(POSTS));
    let ctx = context_for(&ws).await;

    let outcome = RetrievalPipeline::new(RetrievalConfig::default())
        .run(&ctx, "loud laptop fan")
        .await
        .unwrap();

    assert!(outcome.context.text.contains("content:\nLaptop fan very loud - Fan spins at full speed after boot"));
    assert!(outcome.context.text.contains("raw_comments: Clean the fan\nCheck thermal paste"));
}

#[tokio::test]
async fn test_two_queries_matching_same_guide_returned_once() {
    let ws = workspace(GUIDES, Some(POSTS));
    let ctx = context_for(&ws).await;

    let pipeline = RetrievalPipeline::new(RetrievalConfig {
        include_original_query: false,
        ..Default::default()
    })
    .with_expander(
        Arc::new(StaticExpander::new(["replace screen", "screen replacement"])),
        Duration::from_secs(1),
    );

    let outcome = pipeline.run(&ctx, "display broken").await.unwrap();

    assert_eq!(outcome.queries, vec!["replace screen", "screen replacement"]);
    let guide_42 = outcome
        .documents
        .iter()
        .filter(|r| r.document.guideid() == Some(42))
        .count();
    assert_eq!(guide_42, 1);
    assert_eq!(outcome.context.text.matches("guideid: 42").count(), 1);
}

#[tokio::test]
async fn test_multi_query_contains_single_query_results() {
    let ws = workspace(GUIDES, Some(POSTS));
    let ctx = context_for(&ws).await;
    let question = "cracked screen";

    let single = RetrievalPipeline::new(RetrievalConfig::default())
        .run(&ctx, question)
        .await
        .unwrap();
    let multi = RetrievalPipeline::new(RetrievalConfig::default())
        .with_expander(
            Arc::new(StaticExpander::new(["battery drains fast", "fan noise"])),
            Duration::from_secs(1),
        )
        .run(&ctx, question)
        .await
        .unwrap();

    for hit in &single.documents {
        assert!(multi.documents.iter().any(|m| m.document == hit.document));
    }
}

#[tokio::test]
async fn test_rate_limited_guide_enriched_once() {
    let ws = workspace(
        r#"[{"guideid": 42, "title": "Replace screen", "category": "", "subject": "", "type": "", "dataType": "", "url": ""}]"#,
        None,
    );
    let ctx = context_for(&ws).await;

    let api = Arc::new(ScriptedGuideApi::new(&[429, 429, 200]));
    let enricher = GuideStepEnricher::new(api.clone(), BackoffPolicy::fixed(4, 5), Duration::from_secs(5));
    let pipeline = RetrievalPipeline::new(RetrievalConfig::default()).with_enricher(enricher);

    let outcome = pipeline.run(&ctx, "screen replacement").await.unwrap();

    assert_eq!(api.calls(), 3);
    assert_eq!(outcome.stats.rate_limit_retries, 2);
    assert_eq!(outcome.stats.guides_enriched, 1);
    assert_eq!(outcome.context.text.matches("Step 1:").count(), 1);
    assert!(outcome.context.text.contains("Step 1:\nHeat the edges of the display"));
}

#[tokio::test]
async fn test_failed_enrichment_keeps_document() {
    let ws = workspace(GUIDES, None);
    let ctx = context_for(&ws).await;

    let api = Arc::new(ScriptedGuideApi::new(&[500, 500, 500, 500]));
    let enricher = GuideStepEnricher::new(api, BackoffPolicy::fixed(2, 1), Duration::from_secs(5));
    let outcome = RetrievalPipeline::new(RetrievalConfig::default())
        .with_enricher(enricher)
        .run(&ctx, "screen replacement")
        .await
        .unwrap();

    assert!(!outcome.is_empty());
    assert!(!outcome.context.text.contains("Step 1:"));
    assert!(outcome.stats.enrichment_failures >= 1);
}

#[tokio::test]
async fn test_reindex_swaps_index() {
    let ws = workspace("[]", None);
    let ctx = context_for(&ws).await;
    let before = ctx.snapshot();
    assert_eq!(before.stats.guides, 0);

    std::fs::write(&ws.guides, GUIDES).unwrap();
    let stats = ctx.reindex().await.unwrap();

    assert_eq!(stats.guides, 2);
    assert_eq!(ctx.stats().guides, 2);
    assert_eq!(before.stats.guides, 0);
    assert!(before.index.is_empty());

    let matches = ctx.recommend("battery replacement", 1, None).unwrap();
    assert_eq!(matches[0].guide.guideid, 7);
}
