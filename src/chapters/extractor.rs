//! Ordered chapter discovery strategies
//!
//! Each strategy either returns chapters or an error. The extractor tries
//! them in order and keeps the first non-empty result; errors only move it
//! on to the next strategy.

use super::metadata::{parse_chapter_log, parse_ffmetadata};
use super::types::{finalize_chapters, Chapter, ChapterError, ChapterSettings};
use crate::container::{chapters_from_tree, read_atom_tree, AtomTreeParser, IsoBoxParser};
use crate::engine::{discard, stage_source, EngineError, EngineHandle, TranscodeEngine};
use crate::project::SourceHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Per-extraction state shared by the strategies
pub struct ProbeContext<'a> {
    pub source: &'a SourceHandle,
    pub settings: &'a ChapterSettings,
    engine: &'a EngineHandle,
    staged: OnceCell<String>,
}

impl<'a> ProbeContext<'a> {
    pub fn new(source: &'a SourceHandle, engine: &'a EngineHandle, settings: &'a ChapterSettings) -> Self {
        Self {
            source,
            settings,
            engine,
            staged: OnceCell::new(),
        }
    }

    /// Loaded engine plus the sandbox name of the source, staged on first use
    pub async fn staged_input(&self) -> Result<(&'a dyn TranscodeEngine, &str), ChapterError> {
        let handle: &'a EngineHandle = self.engine;
        let engine = handle.ensure_loaded().await?;
        let name = self
            .staged
            .get_or_try_init(|| stage_source(engine, self.source, "chapter_src"))
            .await?;
        Ok((engine, name.as_str()))
    }

    /// Remove the staged copy, if any
    pub async fn release(&self) {
        if let (Some(name), Some(engine)) = (self.staged.get(), self.engine.loaded()) {
            discard(engine, name).await;
        }
    }
}

/// One way of finding chapters in a source
#[async_trait]
pub trait ChapterStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn discover(&self, ctx: &ProbeContext<'_>) -> Result<Vec<Chapter>, ChapterError>;
}

/// Ask ffmpeg for an `ffmetadata` dump and parse its `[CHAPTER]` blocks
pub struct MetadataDumpStrategy;

#[async_trait]
impl ChapterStrategy for MetadataDumpStrategy {
    fn name(&self) -> &'static str {
        "metadata-dump"
    }

    async fn discover(&self, ctx: &ProbeContext<'_>) -> Result<Vec<Chapter>, ChapterError> {
        let (engine, input) = ctx.staged_input().await?;
        let output = format!("chapters_{}.txt", uuid::Uuid::new_v4().simple());

        let args: Vec<String> = ["-i", input, "-f", "ffmetadata", output.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let dump = match engine.exec(&args).await {
            Ok(_) => engine.read_file(&output).await,
            Err(e) => Err(e),
        };
        discard(engine, &output).await;

        let text = String::from_utf8(dump?)
            .map_err(|e| ChapterError::Parse(format!("metadata dump is not UTF-8: {}", e)))?;
        Ok(parse_ffmetadata(&text))
    }
}

/// Read chapters from the input summary ffmpeg logs for `-i <file>`
pub struct DiagnosticLogStrategy;

#[async_trait]
impl ChapterStrategy for DiagnosticLogStrategy {
    fn name(&self) -> &'static str {
        "diagnostic-log"
    }

    async fn discover(&self, ctx: &ProbeContext<'_>) -> Result<Vec<Chapter>, ChapterError> {
        let (engine, input) = ctx.staged_input().await?;
        let args = vec!["-i".to_string(), input.to_string()];

        // Without an output ffmpeg exits non-zero; the summary is still logged
        let log = match engine.exec(&args).await {
            Ok(output) => output.log,
            Err(EngineError::ExitStatus { log, .. }) => log,
            Err(e) => return Err(e.into()),
        };

        Ok(parse_chapter_log(&log, ctx.settings.log_lookahead))
    }
}

/// Builds a fresh box parser for each extraction
pub type ParserFactory = Arc<dyn Fn() -> Box<dyn AtomTreeParser> + Send + Sync>;

/// Parse the container structure ourselves and read the `chpl` atom
pub struct ContainerStrategy {
    factory: ParserFactory,
}

impl ContainerStrategy {
    pub fn new(factory: ParserFactory) -> Self {
        Self { factory }
    }
}

impl Default for ContainerStrategy {
    fn default() -> Self {
        Self::new(Arc::new(|| Box::new(IsoBoxParser::new()) as Box<dyn AtomTreeParser>))
    }
}

#[async_trait]
impl ChapterStrategy for ContainerStrategy {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn discover(&self, ctx: &ProbeContext<'_>) -> Result<Vec<Chapter>, ChapterError> {
        let mut reader = ctx.source.open().await?;
        let mut parser = (self.factory)();

        let tree = read_atom_tree(&mut *reader, parser.as_mut(), ctx.settings.chunk_size).await?;
        match tree {
            Some(tree) => Ok(chapters_from_tree(&tree)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Finds chapter markers in a media source
pub struct ChapterExtractor {
    engine: Arc<EngineHandle>,
    settings: ChapterSettings,
    strategies: Vec<Box<dyn ChapterStrategy>>,
}

impl ChapterExtractor {
    /// Extractor with the standard order: metadata dump, diagnostic log, container
    pub fn new(engine: Arc<EngineHandle>, settings: ChapterSettings) -> Self {
        Self::with_strategies(
            engine,
            settings,
            vec![
                Box::new(MetadataDumpStrategy),
                Box::new(DiagnosticLogStrategy),
                Box::new(ContainerStrategy::default()),
            ],
        )
    }

    pub fn with_strategies(
        engine: Arc<EngineHandle>,
        settings: ChapterSettings,
        strategies: Vec<Box<dyn ChapterStrategy>>,
    ) -> Self {
        Self {
            engine,
            settings,
            strategies,
        }
    }

    /// Chapters sorted by start time and numbered from 1.
    ///
    /// Never fails: if every strategy errors or finds nothing the list is empty.
    pub async fn extract_chapters(&self, source: &SourceHandle) -> Vec<Chapter> {
        let ctx = ProbeContext::new(source, &self.engine, &self.settings);
        let mut found = Vec::new();

        for strategy in &self.strategies {
            match strategy.discover(&ctx).await {
                Ok(chapters) if !chapters.is_empty() => {
                    tracing::debug!("{} strategy found {} chapters", strategy.name(), chapters.len());
                    found = chapters;
                    break;
                }
                Ok(_) => tracing::debug!("{} strategy found no chapters", strategy.name()),
                Err(e) => tracing::warn!("Chapter strategy {} failed: {}", strategy.name(), e),
            }
        }

        ctx.release().await;

        let chapters = finalize_chapters(found);
        tracing::info!("Found {} chapters in {}", chapters.len(), source.display_name());
        chapters
    }
}
