//! End-to-end retrieval pipeline
//!
//! Build time: load corpus -> chunk -> embed -> index, done once by
//! [`RetrievalContext::initialize`]. Query time, in [`RetrievalPipeline::run`]:
//! expand -> threshold search per query -> union-dedup -> enrich -> assemble.
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::corpus::{ChunkingConfig, Corpus, CorpusConfig, TextChunker};
use crate::embedding::Embedder;
use crate::enrichment::GuideStepEnricher;
use crate::errors::{FixError, Result};
use crate::index::{ScoredDocument, VectorIndex};
use crate::rag::context::{AssembledContext, ContextBuilder, ContextConfig};
use crate::rag::dedup::union_dedup;
use crate::rag::expansion::{prepare_queries, QueryExpander};
use crate::rag::retrieval::{RetrievalEngine, SearchParams};
use crate::recommend::{GuideMatch, GuideRecommender, RecommenderConfig};
use crate::telemetry::{RetrievalEvent, RetrievalStats};

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Search the original question along with its reformulations
    pub include_original_query: bool,
    pub search: SearchParams,
    pub context: ContextConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            include_original_query: true,
            search: SearchParams::default(),
            context: ContextConfig::default(),
        }
    }
}

/// Everything needed to (re)build the index
#[derive(Debug, Clone, Default)]
pub struct IndexSettings {
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
    pub recommender: RecommenderConfig,
}

/// Sizes of a built index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub guides: usize,
    pub posts: usize,
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub model_id: String,
    pub build_ms: u64,
}

/// One immutable generation of the index
pub struct IndexSnapshot {
    pub index: VectorIndex,
    pub recommender: GuideRecommender,
    pub stats: IndexStats,
}

impl IndexSnapshot {
    /// Chunk, embed and index a loaded corpus. Blocking.
    pub fn build(corpus: Corpus, settings: &IndexSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let started = Instant::now();
        let chunker = TextChunker::new(settings.chunking.clone())?;

        let documents = corpus.documents();
        let chunks = chunker.chunk(&documents);
        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, embedder.clone(), settings.batch_size)?;

        let guide_count = corpus.guides.len();
        let recommender = match &settings.recommender.embeddings_path {
            Some(path) => GuideRecommender::build_cached(corpus.guides, embedder.clone(), settings.batch_size, path)?,
            None => GuideRecommender::build(corpus.guides, embedder.clone(), settings.batch_size)?,
        };

        let stats = IndexStats {
            guides: guide_count,
            posts: corpus.posts.len(),
            documents: documents.len(),
            chunks: chunk_count,
            dimension: embedder.dimension(),
            model_id: embedder.model_id().to_string(),
            build_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            guides = stats.guides,
            posts = stats.posts,
            chunks = stats.chunks,
            build_ms = stats.build_ms,
            "Index ready"
        );

        Ok(Self {
            index,
            recommender,
            stats,
        })
    }
}

/// Shared, read-only retrieval state.
///
/// Only obtainable once an index has been built. Readers take an `Arc` to
/// the current snapshot; [`RetrievalContext::reindex`] publishes a new one
/// without disturbing in-flight requests.
pub struct RetrievalContext {
    settings: IndexSettings,
    embedder: Arc<dyn Embedder>,
    current: RwLock<Arc<IndexSnapshot>>,
}

impl RetrievalContext {
    /// Load the corpus and build the index on the blocking pool
    pub async fn initialize(settings: IndexSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let snapshot = Self::build_snapshot(settings.clone(), embedder.clone()).await?;
        Ok(Self {
            settings,
            embedder,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Build from an already loaded corpus. Blocking.
    pub fn from_corpus(corpus: Corpus, settings: IndexSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let snapshot = IndexSnapshot::build(corpus, &settings, embedder.clone())?;
        Ok(Self {
            settings,
            embedder,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    async fn build_snapshot(settings: IndexSettings, embedder: Arc<dyn Embedder>) -> Result<IndexSnapshot> {
        tokio::task::spawn_blocking(move || {
            let corpus = Corpus::load(&settings.corpus);
            IndexSnapshot::build(corpus, &settings, embedder)
        })
        .await
        .map_err(|e| FixError::Generic(format!("Index build task failed: {}", e)))?
    }

    /// Current index generation
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Reload the corpus, rebuild, then swap the published index
    pub async fn reindex(&self) -> Result<IndexStats> {
        let snapshot = Arc::new(Self::build_snapshot(self.settings.clone(), self.embedder.clone()).await?);
        let stats = snapshot.stats.clone();
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
        info!(chunks = stats.chunks, "Index swapped");
        Ok(stats)
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats.clone()
    }

    /// Standalone guide recommendation against the current index
    pub fn recommend(&self, question: &str, top_n: usize, similarity_threshold: Option<f32>) -> Result<Vec<GuideMatch>> {
        self.snapshot()
            .recommender
            .predict_guides(question, top_n, similarity_threshold)
    }
}

/// Result of one retrieval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Queries actually searched, in order
    pub queries: Vec<String>,
    /// Unique documents, enriched where possible
    pub documents: Vec<ScoredDocument>,
    pub context: AssembledContext,
    pub stats: RetrievalStats,
}

impl RetrievalOutcome {
    /// Nothing relevant was found
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Query-time pipeline
pub struct RetrievalPipeline {
    expander: Option<Arc<dyn QueryExpander>>,
    expansion_timeout: Duration,
    enricher: Option<GuideStepEnricher>,
    engine: RetrievalEngine,
    context_builder: ContextBuilder,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    /// Pipeline without expansion or enrichment
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            expander: None,
            expansion_timeout: Duration::from_secs(30),
            enricher: None,
            engine: RetrievalEngine::with_params(config.search.clone()),
            context_builder: ContextBuilder::with_config(config.context.clone()),
            config,
        }
    }

    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>, expansion_timeout: Duration) -> Self {
        self.expander = Some(expander);
        self.expansion_timeout = expansion_timeout;
        self
    }

    pub fn with_enricher(mut self, enricher: GuideStepEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    async fn expand(&self, question: &str) -> Result<Vec<String>> {
        let Some(expander) = &self.expander else {
            return Ok(Vec::new());
        };
        match timeout(self.expansion_timeout, expander.expand(question)).await {
            Ok(result) => result,
            Err(_) => Err(FixError::Timeout {
                duration_ms: self.expansion_timeout.as_millis() as u64,
            }),
        }
    }

    /// Answer one question: expand, search, merge, enrich, assemble.
    ///
    /// Recoverable failures (expansion, enrichment, empty searches) degrade
    /// the outcome instead of failing it; check [`RetrievalOutcome::is_empty`].
    pub async fn run(&self, ctx: &RetrievalContext, question: &str) -> Result<RetrievalOutcome> {
        let started = Instant::now();
        let mut stats = RetrievalStats::new();

        // Step 1: Expand the question
        let expansion = self.expand(question).await;
        let queries = prepare_queries(question, expansion, self.config.include_original_query);
        debug!(?queries, "Queries prepared");

        // Step 2: Threshold search per query, in order
        let snapshot = ctx.snapshot();
        let engine = self.engine.clone();
        let search_queries = queries.clone();
        let result_sets = tokio::task::spawn_blocking(move || engine.retrieve_many(&snapshot.index, &search_queries))
            .await
            .map_err(|e| FixError::Generic(format!("Search task failed: {}", e)))??;

        for set in &result_sets {
            stats.record(&RetrievalEvent::QueryExecuted { hits: set.len() });
        }

        // Step 3: Union and deduplicate
        let raw = result_sets.iter().map(Vec::len).sum();
        let mut documents = union_dedup(result_sets);
        stats.record(&RetrievalEvent::ResultsMerged {
            raw,
            unique: documents.len(),
        });
        if documents.is_empty() {
            warn!(error = %FixError::NoRelevantResults(question.to_string()), "Retrieval found nothing");
        }

        // Step 4: Enrich guide documents with their steps
        if let Some(enricher) = &self.enricher {
            for result in documents.iter_mut() {
                let status = enricher.enrich(&mut result.document).await;
                stats.record(&RetrievalEvent::GuideEnrichment(status));
            }
        }

        // Step 5: Assemble the context blob
        let docs: Vec<_> = documents.iter().map(|r| r.document.clone()).collect();
        let context = self.context_builder.build(&docs);
        stats.record(&RetrievalEvent::ContextAssembled {
            documents: context.document_count,
            skipped: context.skipped_empty,
        });

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            queries = stats.queries_run,
            unique = stats.unique_hits,
            enriched = stats.guides_enriched,
            elapsed_ms = stats.elapsed_ms,
            "Retrieval complete"
        );

        Ok(RetrievalOutcome {
            queries,
            documents,
            context,
            stats,
        })
    }
}
