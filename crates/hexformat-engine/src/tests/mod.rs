//! Shared fixtures for unit tests.

use std::ops::Range;

use crate::editing::Document;
use crate::range::ByteRange;
use crate::selection::{Dimensions, DisplayHost};
use crate::snapshot::format_outline;
use crate::tree::{SegmentId, invariants};

pub fn range(start: u64, end: u64) -> ByteRange {
    ByteRange::new(start, end).unwrap()
}

pub fn root(doc: &Document) -> SegmentId {
    doc.tree().roots()[0]
}

pub fn assert_valid(doc: &Document) {
    if let Err(violation) = invariants::check(doc.tree(), doc.catalog()) {
        panic!("{violation}\n{}", layout_of(doc));
    }
}

/// Rendered outline, convenient for before/after comparisons
pub fn layout_of(doc: &Document) -> String {
    format_outline(&doc.snapshot())
}

/// Descendants of `id` as (depth, name, relative start, relative end, format)
pub fn outline_under(doc: &Document, id: SegmentId) -> Vec<(usize, String, u64, u64, String)> {
    let tree = doc.tree();
    let base = tree.get(id).unwrap().start();
    let depth = tree.ancestors(id).len();
    tree.descendants(id)
        .into_iter()
        .map(|child| {
            let segment = tree.get(child).unwrap();
            (
                tree.ancestors(child).len() - depth,
                segment.name().to_string(),
                segment.start() - base,
                segment.end() - base,
                segment.display_format().to_string(),
            )
        })
        .collect()
}

/// 32 byte file: `Header` at [0,7] and [8,15] (fields [0,3] [4,7]), raw tail [16,31].
///
/// Returns the two instances, registration order.
pub fn two_header_doc() -> (Document, SegmentId, SegmentId) {
    let mut doc = Document::new(32);
    let a = doc.split(root(&doc), range(0, 7)).unwrap().new_selection.unwrap();
    let rest = doc.tree().roots()[1];
    let b = doc.split(rest, range(8, 15)).unwrap().new_selection.unwrap();
    doc.create_child(a, range(0, 3)).unwrap();
    doc.define_struct(a, "Header").unwrap();
    doc.apply_struct("Header", b).unwrap();
    doc.take_events();
    (doc, a, b)
}

/// In-memory display collaborator: 16 bytes per row, ten visible data rows
#[derive(Debug, Clone)]
pub struct FakeHost {
    pub selection: Vec<Range<u64>>,
    pub offset: u64,
    pub file_size: u64,
}

impl FakeHost {
    pub fn with_selection(file_size: u64, selection: Range<u64>) -> Self {
        Self {
            selection: vec![selection],
            offset: 0,
            file_size,
        }
    }
}

impl DisplayHost for FakeHost {
    fn selection_ranges(&self) -> Vec<Range<u64>> {
        self.selection.clone()
    }

    fn set_selection_ranges(&mut self, ranges: Vec<Range<u64>>) {
        self.selection = ranges;
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: 800,
            height: 110,
            row_px_height: 10,
        }
    }

    fn column_width(&self) -> u64 {
        16
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }
}
