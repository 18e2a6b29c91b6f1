use hexformat_engine::tree::invariants;
use hexformat_engine::{ByteRange, Document, IndexPath, SegmentId, format_outline};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn range(start: u64, end: u64) -> ByteRange {
    ByteRange::new(start, end).unwrap()
}

fn at(doc: &Document, path: &[usize]) -> SegmentId {
    doc.resolve(&IndexPath::new(path.to_vec())).unwrap()
}

fn assert_valid(doc: &Document) {
    if let Err(violation) = invariants::check(doc.tree(), doc.catalog()) {
        panic!("{violation}\n{}", format_outline(&doc.snapshot()));
    }
}

/// Small deterministic generator so edit scripts are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound.max(1)
    }
}

/// Random leaf and a random sub-range of it
fn pick(doc: &Document, rng: &mut Lcg) -> (SegmentId, ByteRange) {
    let leaves: Vec<SegmentId> = doc
        .tree()
        .preorder()
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| !doc.segment(*id).unwrap().has_children())
        .collect();
    let id = leaves[rng.next(leaves.len() as u64) as usize];
    let segment = doc.segment(id).unwrap();
    let start = segment.start() + rng.next(segment.len());
    let end = start + rng.next(segment.end() - start + 1);
    (id, range(start, end))
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(42)]
#[case(1234)]
fn partition_holds_after_any_edit_script(#[case] seed: u64) {
    let mut doc = Document::new(256);
    let mut rng = Lcg(seed);
    for _ in 0..200 {
        let (target, selected) = pick(&doc, &mut rng);
        // rejections are fine, they must just leave the forest valid
        let _ = match rng.next(4) {
            0 => doc.split(target, selected),
            1 => doc.create_child(target, selected),
            2 => doc.merge_up(target),
            _ => doc.merge_down(target),
        };
        assert_valid(&doc);

        let total: u64 = doc
            .tree()
            .roots()
            .iter()
            .map(|id| doc.segment(*id).unwrap().len())
            .sum();
        assert_eq!(total, 256);
    }
}

#[rstest]
#[case(0, 3)]
#[case(12, 15)]
#[case(5, 9)]
#[case(0, 0)]
#[case(15, 15)]
fn split_then_merge_restores_range(#[case] start: u64, #[case] end: u64) {
    let mut doc = Document::new(16);
    let selected = doc
        .split(at(&doc, &[0]), range(start, end))
        .unwrap()
        .new_selection
        .unwrap();

    let mut merged = selected;
    if start > 0 {
        merged = doc.merge_up(merged).unwrap().new_selection.unwrap();
    }
    if end < 15 {
        merged = doc.merge_down(merged).unwrap().new_selection.unwrap();
    }
    assert_eq!(doc.tree().roots().len(), 1);
    assert_eq!(doc.segment(merged).unwrap().range(), range(0, 15));
}

#[test]
fn instances_converge_after_edits_in_different_instances() {
    let mut doc = Document::new(64);
    for (index, start) in [(0, 0), (1, 16), (2, 32)] {
        doc.split(at(&doc, &[index]), range(start, start + 15)).unwrap();
    }
    let first = at(&doc, &[0]);
    doc.create_child(first, range(0, 7)).unwrap();
    doc.define_struct(first, "Block").unwrap();
    for index in 1..4 {
        doc.apply_struct("Block", at(&doc, &[index])).unwrap();
    }

    // edit a different instance each time
    doc.split(at(&doc, &[2, 1]), range(40, 43)).unwrap();
    doc.set_display_format(at(&doc, &[3, 0]), "uint32").unwrap();
    doc.rename(at(&doc, &[1, 2]), "tail").unwrap();
    doc.merge_up(at(&doc, &[0, 2])).unwrap();

    let shapes: Vec<Vec<(u64, u64, String, String)>> = (0..4)
        .map(|index| {
            let root = at(&doc, &[index]);
            let base = doc.segment(root).unwrap().start();
            doc.tree()
                .descendants(root)
                .into_iter()
                .map(|id| {
                    let s = doc.segment(id).unwrap();
                    (
                        s.start() - base,
                        s.end() - base,
                        s.name().to_string(),
                        s.display_format().to_string(),
                    )
                })
                .collect()
        })
        .collect();
    for shape in &shapes[1..] {
        assert_eq!(shape, &shapes[0]);
    }
    assert_eq!(
        shapes[0],
        vec![
            (0, 7, "分段4".to_string(), "uint32".to_string()),
            (8, 15, "分段6".to_string(), "raw".to_string()),
        ]
    );
    assert_valid(&doc);
}

#[test]
fn export_import_reproduces_tree() {
    let mut doc = Document::new(96);
    let mut rng = Lcg(99);
    for _ in 0..40 {
        let (target, selected) = pick(&doc, &mut rng);
        let _ = doc.split(target, selected);
    }
    let first = at(&doc, &[0]);
    if doc.segment(first).unwrap().len() > 1 {
        let start = doc.segment(first).unwrap().start();
        doc.create_child(first, range(start, start)).unwrap();
        doc.define_struct(first, "Lead").unwrap();
    }

    let layout = doc.export();
    let mut restored = Document::new(0);
    restored.import(layout.clone()).unwrap();

    assert_eq!(restored.export(), layout);
    assert_eq!(
        format_outline(&restored.snapshot()),
        format_outline(&doc.snapshot())
    );
    assert_valid(&restored);
}
