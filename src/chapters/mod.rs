//! Chapter discovery
//!
//! [`ChapterExtractor`] runs a fixed chain of strategies against a source:
//! an engine metadata dump, the engine's diagnostic log, and finally our own
//! container parse.

mod extractor;
mod metadata;
mod types;

pub use extractor::{
    ChapterExtractor, ChapterStrategy, ContainerStrategy, DiagnosticLogStrategy,
    MetadataDumpStrategy, ParserFactory, ProbeContext,
};
pub use metadata::{parse_chapter_log, parse_ffmetadata, parse_timebase};
pub use types::{finalize_chapters, Chapter, ChapterError, ChapterSettings};
