//! Incremental box-tree parsing
//!
//! Parsers are fed the source in order as a sequence of chunks. The built-in
//! [`IsoBoxParser`] keeps only what it needs: small top-level boxes and the
//! whole `moov` are buffered and parsed, large boxes such as `mdat` are
//! recorded by header and skipped without being held in memory.

use super::atom::{AtomNode, ChapterEntry, ContainerBox, FourCC, Nesting, CHPL, HDLR, META, MOOV};
use super::chpl::{decode_chpl, ByteReader};
use super::AtomError;
use bytes::{Buf, Bytes, BytesMut};

/// Structure known once a parser reports readiness
#[derive(Debug, Clone, Default)]
pub struct TreeInfo {
    /// Top-level boxes seen so far
    pub atoms: Vec<AtomNode>,
    /// Chapter list exposed directly by the parser, if it knows one
    pub chapters: Option<Vec<ChapterEntry>>,
}

/// Result of feeding one chunk
#[derive(Debug)]
pub enum ParseStatus {
    NeedMore,
    Ready(TreeInfo),
}

/// A streaming box-tree parser
pub trait AtomTreeParser: Send {
    /// Feed the chunk that starts at absolute `offset` in the source
    fn append_chunk(&mut self, chunk: Bytes, offset: u64) -> Result<ParseStatus, AtomError>;

    /// Input is exhausted; return a tree if one can still be produced
    fn finish(&mut self) -> Result<Option<TreeInfo>, AtomError>;
}

/// Boxes whose body is a plain list of child boxes
const CHILD_CONTAINERS: [&[u8; 4]; 11] = [
    b"moov", b"trak", b"mdia", b"minf", b"stbl", b"udta", b"edts", b"dinf", b"mvex", b"moof",
    b"traf",
];

/// Non-`moov` top-level boxes up to this size are kept with their payload
const INLINE_BOX_LIMIT: u64 = 1024 * 1024;

/// Largest `moov` we are willing to buffer
const MAX_MOOV_SIZE: u64 = 256 * 1024 * 1024;

struct BoxHeader {
    kind: FourCC,
    /// `None` when the box runs to the end of its parent
    size: Option<u64>,
    header_len: usize,
}

fn read_header(data: &[u8]) -> Result<Option<BoxHeader>, AtomError> {
    if data.len() < 8 {
        return Ok(None);
    }
    let mut reader = ByteReader::new(data);
    let size32 = reader.read_u32()?;
    let mut kind = [0u8; 4];
    kind.copy_from_slice(reader.read_bytes(4)?);
    let kind = FourCC(kind);

    let (size, header_len) = match size32 {
        0 => (None, 8),
        1 => {
            if data.len() < 16 {
                return Ok(None);
            }
            (Some(reader.read_u64()?), 16)
        }
        n => (Some(n as u64), 8),
    };

    if let Some(size) = size {
        if size < header_len as u64 {
            return Err(AtomError::InvalidBox(format!(
                "{} box declares size {} (header is {} bytes)",
                kind, size, header_len
            )));
        }
    }

    Ok(Some(BoxHeader {
        kind,
        size,
        header_len,
    }))
}

fn parse_box(
    header: &BoxHeader,
    data: Bytes,
    offset: u64,
    decode_chapters: bool,
) -> Result<AtomNode, AtomError> {
    let body = data.slice(header.header_len..);
    let body_offset = offset + header.header_len as u64;
    let mut node = AtomNode::leaf(header.kind, offset, data.len() as u64, body.clone());

    if CHILD_CONTAINERS.contains(&header.kind.as_bytes()) {
        node.nesting = Nesting::Children(parse_children(&body, body_offset, decode_chapters)?);
    } else if header.kind == META {
        node.nesting = parse_meta(&body, body_offset, decode_chapters)?;
    } else if header.kind == CHPL && decode_chapters {
        match decode_chpl(&body) {
            Ok(entries) => node.entries = Some(entries),
            Err(e) => tracing::debug!("Leaving chpl at {} undecoded: {}", offset, e),
        }
    }

    Ok(node)
}

fn parse_children(
    body: &Bytes,
    base_offset: u64,
    decode_chapters: bool,
) -> Result<Vec<AtomNode>, AtomError> {
    let mut children = Vec::new();
    let mut pos = 0usize;

    // Fewer than 8 trailing bytes is padding (e.g. the udta terminator)
    while body.len() - pos >= 8 {
        let available = body.len() - pos;
        let header = read_header(&body[pos..])?.ok_or(AtomError::Truncated {
            offset: pos,
            needed: 16,
            available,
        })?;
        let size = header.size.unwrap_or(available as u64);
        if size > available as u64 {
            return Err(AtomError::Truncated {
                offset: pos,
                needed: size as usize,
                available,
            });
        }

        let data = body.slice(pos..pos + size as usize);
        children.push(parse_box(&header, data, base_offset + pos as u64, decode_chapters)?);
        pos += size as usize;
    }

    Ok(children)
}

/// `meta` is a full box in ISO files but a plain container in QuickTime ones
fn parse_meta(body: &Bytes, base_offset: u64, decode_chapters: bool) -> Result<Nesting, AtomError> {
    if body.len() >= 8 && &body[4..8] == HDLR.as_bytes() {
        return Ok(Nesting::Children(parse_children(body, base_offset, decode_chapters)?));
    }

    let mut reader = ByteReader::new(body);
    let version_flags = reader.read_u32()?;
    let children = parse_children(&body.slice(4..), base_offset + 4, decode_chapters)?;

    Ok(Nesting::Container(ContainerBox {
        version: (version_flags >> 24) as u8,
        flags: version_flags & 0x00ff_ffff,
        children,
    }))
}

enum Step {
    NeedMore,
    Continue,
    Ready,
}

/// Streaming ISO-BMFF / QuickTime parser, ready once `moov` is complete
pub struct IsoBoxParser {
    buffer: BytesMut,
    /// Absolute offset of `buffer[0]`
    buffer_offset: u64,
    next_chunk_offset: u64,
    /// Bytes of a large box still to be skipped
    skip: u64,
    atoms: Vec<AtomNode>,
    decode_chapters: bool,
    ready: bool,
}

impl Default for IsoBoxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IsoBoxParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            buffer_offset: 0,
            next_chunk_offset: 0,
            skip: 0,
            atoms: Vec::new(),
            decode_chapters: false,
            ready: false,
        }
    }

    /// Decode `chpl` bodies into [`AtomNode::entries`] while parsing
    pub fn with_chapter_decoding(mut self, enabled: bool) -> Self {
        self.decode_chapters = enabled;
        self
    }

    fn consume(&mut self, len: usize) {
        self.buffer.advance(len);
        self.buffer_offset += len as u64;
    }

    fn step(&mut self) -> Result<Step, AtomError> {
        if self.skip > 0 {
            return Ok(Step::NeedMore);
        }
        let Some(header) = read_header(&self.buffer)? else {
            return Ok(Step::NeedMore);
        };
        let offset = self.buffer_offset;

        let Some(size) = header.size else {
            if header.kind == MOOV {
                return Err(AtomError::InvalidBox("moov without a size".to_string()));
            }
            // Runs to end of file; nothing after it can be a box
            tracing::debug!("{} at {} extends to end of input", header.kind, offset);
            self.atoms.push(AtomNode::leaf(header.kind, offset, 0, Bytes::new()));
            self.buffer.clear();
            self.skip = u64::MAX;
            return Ok(Step::NeedMore);
        };

        if header.kind == MOOV || size <= INLINE_BOX_LIMIT {
            if size > MAX_MOOV_SIZE {
                return Err(AtomError::InvalidBox(format!("moov of {} bytes", size)));
            }
            if (self.buffer.len() as u64) < size {
                return Ok(Step::NeedMore);
            }
            let data = self.buffer.split_to(size as usize).freeze();
            self.buffer_offset += size;
            let node = parse_box(&header, data, offset, self.decode_chapters)?;
            self.atoms.push(node);
            return Ok(if header.kind == MOOV {
                Step::Ready
            } else {
                Step::Continue
            });
        }

        tracing::debug!("Skipping {} box of {} bytes at {}", header.kind, size, offset);
        self.atoms.push(AtomNode::leaf(header.kind, offset, size, Bytes::new()));
        let buffered = (self.buffer.len() as u64).min(size) as usize;
        self.consume(buffered);
        self.skip = size - buffered as u64;
        Ok(Step::Continue)
    }
}

impl AtomTreeParser for IsoBoxParser {
    fn append_chunk(&mut self, chunk: Bytes, offset: u64) -> Result<ParseStatus, AtomError> {
        if self.ready {
            return Err(AtomError::InvalidBox("input after box tree was complete".to_string()));
        }
        if offset != self.next_chunk_offset {
            return Err(AtomError::OutOfOrder {
                expected: self.next_chunk_offset,
                got: offset,
            });
        }
        self.next_chunk_offset += chunk.len() as u64;

        let mut chunk = chunk;
        if self.skip > 0 {
            let skipped = self.skip.min(chunk.len() as u64) as usize;
            chunk.advance(skipped);
            self.skip -= skipped as u64;
            self.buffer_offset += skipped as u64;
        }
        self.buffer.extend_from_slice(&chunk);

        loop {
            match self.step()? {
                Step::NeedMore => return Ok(ParseStatus::NeedMore),
                Step::Continue => continue,
                Step::Ready => {
                    self.ready = true;
                    self.buffer.clear();
                    return Ok(ParseStatus::Ready(TreeInfo {
                        atoms: std::mem::take(&mut self.atoms),
                        chapters: None,
                    }));
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Option<TreeInfo>, AtomError> {
        tracing::debug!(
            "Input ended before moov ({} top-level boxes, {} bytes pending)",
            self.atoms.len(),
            self.buffer.len()
        );
        Ok(None)
    }
}
