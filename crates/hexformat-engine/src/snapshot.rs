use std::collections::HashMap;

use crate::editing::Document;
use crate::range::ByteRange;
use crate::tree::{IndexPath, SegmentId, SegmentKind};

/// Read-only view of one segment for renderers
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentView {
    pub id: SegmentId,
    pub path: IndexPath,
    pub depth: usize,
    pub name: String,
    pub range: ByteRange,
    pub display_format: String,
    pub kind: SegmentKind,
    pub is_array_item: bool,
    pub belong_struct: Option<IndexPath>,
    pub child_count: usize,
}

/// Whole forest flattened in pre-order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub segments: Vec<SegmentView>,
    pub version: u64,
}

impl Snapshot {
    pub fn find(&self, id: SegmentId) -> Option<&SegmentView> {
        self.segments.iter().find(|view| view.id == id)
    }
}

impl Document {
    /// Flatten the forest, deriving each path on the way down
    pub fn snapshot(&self) -> Snapshot {
        let tree = self.tree();
        let mut segments = Vec::new();
        let mut struct_paths: HashMap<SegmentId, IndexPath> = HashMap::new();
        let mut stack: Vec<(SegmentId, IndexPath)> = tree
            .roots()
            .iter()
            .enumerate()
            .rev()
            .map(|(index, id)| (*id, IndexPath::new(vec![index])))
            .collect();
        while let Some((id, path)) = stack.pop() {
            let Ok(segment) = tree.get(id) else {
                continue;
            };
            stack.extend(
                segment
                    .children()
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(index, child)| (*child, path.child(index))),
            );
            if segment.kind() == &SegmentKind::Struct {
                struct_paths.insert(id, path.clone());
            }
            // governing structs are ancestors, so already visited
            let belong_struct = segment.belong_struct().and_then(|root| struct_paths.get(&root).cloned());
            segments.push(SegmentView {
                id,
                depth: path.depth() - 1,
                path,
                name: segment.name().to_string(),
                range: segment.range(),
                display_format: segment.display_format().to_string(),
                kind: segment.kind().clone(),
                is_array_item: segment.is_array_item(),
                belong_struct,
                child_count: segment.children().len(),
            });
        }
        Snapshot {
            segments,
            version: self.version(),
        }
    }
}

/// One line per segment: indented path, name, inclusive range, format,
/// and the governing struct root when there is one
pub fn format_outline(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for view in &snapshot.segments {
        out.push_str(&"  ".repeat(view.depth));
        out.push_str(&format!(
            "{} {} {}..={} {}",
            view.path,
            view.name,
            view.range.start(),
            view.range.end(),
            view.display_format
        ));
        if view.is_array_item {
            out.push_str(" item");
        }
        if let Some(root) = &view.belong_struct {
            out.push_str(&format!(" in {root}"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{range, two_header_doc};

    #[test]
    fn test_snapshot_is_preorder() {
        let (doc, a, _) = two_header_doc();
        let snapshot = doc.snapshot();
        let paths: Vec<String> = snapshot.segments.iter().map(|v| v.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["[0]", "[0, 0]", "[0, 1]", "[1]", "[1, 0]", "[1, 1]", "[2]"]
        );
        let header = snapshot.find(a).unwrap();
        assert_eq!(header.child_count, 2);
        assert_eq!(header.kind, SegmentKind::Struct);
        assert_eq!(snapshot.segments[1].belong_struct, Some(IndexPath::new(vec![0])));
        assert_eq!(snapshot.segments[4].belong_struct, Some(IndexPath::new(vec![1])));
        assert_eq!(snapshot.segments[4].depth, 1);
    }

    #[test]
    fn test_snapshot_of_large_array() {
        let mut doc = Document::new(4096);
        let root = doc.tree().roots()[0];
        doc.set_array_by_format(root, "uint8", 1).unwrap();

        let snapshot = doc.snapshot();
        assert_eq!(snapshot.segments.len(), 4097);
        let last = snapshot.segments.last().unwrap();
        assert_eq!(last.path, IndexPath::new(vec![0, 4095]));
        assert_eq!(last.range, range(4095, 4095));
    }

    #[test]
    fn test_outline_of_split_file() {
        let mut doc = Document::new(16);
        let root = doc.tree().roots()[0];
        doc.split(root, range(4, 7)).unwrap();
        insta::assert_snapshot!(format_outline(&doc.snapshot()).trim_end(), @r"
        [0] 全文 0..=3 raw
        [1] 分段1 4..=7 raw
        [2] 全文 8..=15 raw
        ");
    }
}
