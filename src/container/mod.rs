//! Container box tree access
//!
//! Feeds a source through an [`AtomTreeParser`] in fixed-size chunks and
//! pulls chapter markers out of the resulting tree, either from a list the
//! parser exposes directly or from a `chpl` atom.

mod atom;
mod chpl;
mod parser;

pub use atom::{find_atom, AtomNode, ChapterEntry, ContainerBox, FourCC, Nesting, CHPL, META, MOOV};
pub use chpl::decode_chpl;
pub use parser::{AtomTreeParser, IsoBoxParser, ParseStatus, TreeInfo};

use crate::chapters::Chapter;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Box parsing errors
#[derive(Error, Debug)]
pub enum AtomError {
    #[error("Truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid box: {0}")]
    InvalidBox(String),

    #[error("Chunk out of order: expected offset {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fill up to `size` bytes; shorter only at end of input
async fn read_chunk<R>(reader: &mut R, size: usize) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

/// Stream `reader` into `parser` until it is ready or the input runs out.
///
/// A parser error on any chunk ends the read; there is no retry.
pub async fn read_atom_tree<R>(
    reader: &mut R,
    parser: &mut dyn AtomTreeParser,
    chunk_size: usize,
) -> Result<Option<TreeInfo>, AtomError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let chunk_size = chunk_size.max(1);
    let mut offset = 0u64;

    loop {
        let chunk = read_chunk(reader, chunk_size).await?;
        if chunk.is_empty() {
            return parser.finish();
        }

        let len = chunk.len() as u64;
        tracing::debug!("Parsing container chunk at {} ({} bytes)", offset, len);
        match parser.append_chunk(chunk, offset)? {
            ParseStatus::Ready(tree) => {
                tracing::debug!("Box tree ready after {} bytes", offset + len);
                return Ok(Some(tree));
            }
            ParseStatus::NeedMore => offset += len,
        }
    }
}

fn to_chapters(entries: &[ChapterEntry]) -> Vec<Chapter> {
    entries
        .iter()
        .map(|e| Chapter::new(e.title.clone(), e.start_seconds()))
        .collect()
}

/// Chapters from a parsed tree (unsorted, unnumbered)
pub fn chapters_from_tree(tree: &TreeInfo) -> Result<Vec<Chapter>, AtomError> {
    if let Some(entries) = tree.chapters.as_deref().filter(|e| !e.is_empty()) {
        return Ok(to_chapters(entries));
    }

    let Some(atom) = find_atom(&tree.atoms, CHPL) else {
        return Ok(Vec::new());
    };

    match &atom.entries {
        Some(entries) => Ok(to_chapters(entries)),
        None => Ok(to_chapters(&decode_chpl(&atom.payload)?)),
    }
}
