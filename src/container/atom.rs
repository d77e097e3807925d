//! Box tree node types and lookup

use bytes::Bytes;
use std::fmt;

/// Four-character box type code
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(code: &[u8; 4]) -> Self {
        Self(*code)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

pub const MOOV: FourCC = FourCC::new(b"moov");
pub const META: FourCC = FourCC::new(b"meta");
pub const CHPL: FourCC = FourCC::new(b"chpl");
pub const HDLR: FourCC = FourCC::new(b"hdlr");

/// One decoded entry of a chapter list atom
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterEntry {
    /// Start time in 100 ns ticks
    pub start_ticks: u64,
    pub title: String,
}

impl ChapterEntry {
    pub const TICKS_PER_SECOND: f64 = 10_000_000.0;

    pub fn start_seconds(&self) -> f64 {
        self.start_ticks as f64 / Self::TICKS_PER_SECOND
    }
}

/// Full box (version + flags) wrapping a child list, e.g. ISO `meta`
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBox {
    pub version: u8,
    pub flags: u32,
    pub children: Vec<AtomNode>,
}

/// How a node holds its children
#[derive(Debug, Clone, PartialEq)]
pub enum Nesting {
    Leaf,
    /// Plain container: children follow the header directly
    Children(Vec<AtomNode>),
    /// Children sit behind a version/flags prefix
    Container(ContainerBox),
}

/// A parsed box
#[derive(Debug, Clone, PartialEq)]
pub struct AtomNode {
    pub kind: FourCC,
    /// Absolute offset of the box header in the source
    pub offset: u64,
    /// Total size including the header
    pub size: u64,
    /// Box body (everything after the header)
    pub payload: Bytes,
    /// Structured chapter entries, when the parser decoded them
    pub entries: Option<Vec<ChapterEntry>>,
    pub nesting: Nesting,
}

impl AtomNode {
    pub fn leaf(kind: FourCC, offset: u64, size: u64, payload: Bytes) -> Self {
        Self {
            kind,
            offset,
            size,
            payload,
            entries: None,
            nesting: Nesting::Leaf,
        }
    }

    /// Child nodes regardless of which nesting form holds them
    pub fn children(&self) -> &[AtomNode] {
        match &self.nesting {
            Nesting::Leaf => &[],
            Nesting::Children(children) => children,
            Nesting::Container(container) => &container.children,
        }
    }
}

/// Depth-first search for the first node of type `kind`
pub fn find_atom(nodes: &[AtomNode], kind: FourCC) -> Option<&AtomNode> {
    for node in nodes {
        if node.kind == kind {
            return Some(node);
        }
        if let Some(found) = find_atom(node.children(), kind) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: &[u8; 4], nesting: Nesting) -> AtomNode {
        AtomNode {
            nesting,
            ..AtomNode::leaf(FourCC::new(kind), 0, 8, Bytes::new())
        }
    }

    #[test]
    fn test_find_through_both_nesting_forms() {
        let chpl = node(b"chpl", Nesting::Leaf);
        let meta = node(
            b"meta",
            Nesting::Container(ContainerBox {
                version: 0,
                flags: 0,
                children: vec![node(b"hdlr", Nesting::Leaf), chpl.clone()],
            }),
        );
        let tree = vec![
            node(b"ftyp", Nesting::Leaf),
            node(
                b"moov",
                Nesting::Children(vec![
                    node(b"mvhd", Nesting::Leaf),
                    node(b"udta", Nesting::Children(vec![meta])),
                ]),
            ),
        ];

        assert_eq!(find_atom(&tree, CHPL), Some(&chpl));
        assert_eq!(find_atom(&tree, HDLR).map(|n| n.kind), Some(HDLR));
        assert!(find_atom(&tree, FourCC::new(b"trak")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut first = node(b"chpl", Nesting::Leaf);
        first.offset = 10;
        let mut second = node(b"chpl", Nesting::Leaf);
        second.offset = 20;
        let tree = vec![node(b"moov", Nesting::Children(vec![first])), second];

        assert_eq!(find_atom(&tree, CHPL).unwrap().offset, 10);
    }

    #[test]
    fn test_fourcc_display() {
        assert_eq!(CHPL.to_string(), "chpl");
        assert_eq!(FourCC::new(b"\xa9nam").to_string(), ".nam");
    }
}
