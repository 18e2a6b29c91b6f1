//! Bridge between the host's byte selection and the segment forest.
//!
//! Hosts select half-open `[start, end)` ranges; the forest uses inclusive
//! ranges. Selections that do not sit inside a single leaf are reported as
//! warnings rather than guessed at.

pub mod viewport;

use std::ops::Range;

pub use viewport::{Dimensions, displayed_bytes, is_byte_visible, start_of_row_containing_byte};

use crate::editing::{Cmd, Document, EditError, Patch};
use crate::events::EditorEvent;
use crate::range::ByteRange;
use crate::tree::SegmentId;

/// The display collaborator: owns the selection and the scroll position
pub trait DisplayHost {
    /// Current selection as half-open byte ranges
    fn selection_ranges(&self) -> Vec<Range<u64>>;
    fn set_selection_ranges(&mut self, ranges: Vec<Range<u64>>);
    fn dimensions(&self) -> Dimensions;
    /// Bytes per row
    fn column_width(&self) -> u64;
    /// First byte of the top visible row
    fn offset(&self) -> u64;
    fn set_offset(&mut self, offset: u64);
    fn file_size(&self) -> u64;

    fn is_byte_visible(&self, byte: u64) -> bool {
        viewport::is_byte_visible(self.dimensions(), self.column_width(), self.offset(), byte)
    }

    fn start_of_row_containing_byte(&self, byte: u64) -> u64 {
        viewport::start_of_row_containing_byte(byte, self.column_width())
    }
}

impl Document {
    /// The leaf containing the first selected range, with that range made inclusive
    pub fn resolve_selection(&self, ranges: &[Range<u64>]) -> Result<(SegmentId, ByteRange), EditError> {
        let selected = ranges.first().ok_or(EditError::NoSelection)?;
        let range = ByteRange::from_half_open(selected.start, selected.end).ok_or(EditError::NoSelection)?;
        let leaf = *self
            .tree
            .find_leaves(&range)
            .first()
            .ok_or(EditError::SelectionCrossesBoundary)?;
        Ok((leaf, range))
    }

    fn apply_to_selection<H: DisplayHost + ?Sized>(
        &mut self,
        host: &H,
        build: impl FnOnce(SegmentId, ByteRange) -> Cmd,
    ) -> Option<Patch> {
        match self.resolve_selection(&host.selection_ranges()) {
            Ok((target, range)) => self.apply(build(target, range)),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    /// Split the leaf under the host's selection
    pub fn split_selection<H: DisplayHost + ?Sized>(&mut self, host: &H) -> Option<Patch> {
        self.apply_to_selection(host, |target, range| Cmd::Split { target, range })
    }

    /// Partition the leaf under the host's selection into children
    pub fn create_child_from_selection<H: DisplayHost + ?Sized>(&mut self, host: &H) -> Option<Patch> {
        self.apply_to_selection(host, |target, range| Cmd::CreateChild { target, range })
    }

    /// Select a segment's bytes in the host and scroll them into view
    pub fn select_segment<H: DisplayHost + ?Sized>(&mut self, id: SegmentId, host: &mut H) -> Result<(), EditError> {
        let range = self.tree.get(id)?.range();
        let ranges = vec![range.to_half_open()];
        host.set_selection_ranges(ranges.clone());
        self.events.push(EditorEvent::SelectionChanged { ranges });

        if !host.is_byte_visible(range.start()) {
            let offset = host.start_of_row_containing_byte(range.start());
            host.set_offset(offset);
            self.events.push(EditorEvent::ScrollTo { offset });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{FakeHost, range};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selection_is_converted_to_inclusive() {
        let mut doc = Document::new(16);
        let host = FakeHost::with_selection(16, 4..8);
        let patch = doc.split_selection(&host).unwrap();

        let selected = doc.segment(patch.new_selection.unwrap()).unwrap();
        assert_eq!(selected.range(), range(4, 7));
        assert_eq!(doc.tree().roots().len(), 3);
    }

    #[test]
    fn test_crossing_selection_warns() {
        let mut doc = Document::new(16);
        doc.split(doc.tree().roots()[0], range(4, 7)).unwrap();
        doc.take_events();

        let host = FakeHost::with_selection(16, 2..6);
        assert!(doc.create_child_from_selection(&host).is_none());
        assert_eq!(
            doc.take_events(),
            vec![EditorEvent::warning("selection crosses a segment boundary")]
        );
        assert_eq!(doc.tree().roots().len(), 3);
    }

    #[test]
    fn test_empty_selection_warns() {
        let mut doc = Document::new(16);
        let host = FakeHost::with_selection(16, 3..3);
        assert!(doc.split_selection(&host).is_none());
        assert_eq!(doc.take_events(), vec![EditorEvent::warning("nothing is selected")]);
    }

    #[test]
    fn test_select_segment_scrolls_when_hidden() {
        let mut doc = Document::new(1024);
        let root = doc.tree().roots()[0];
        let far = doc.split(root, range(500, 515)).unwrap().new_selection.unwrap();
        doc.take_events();

        let mut host = FakeHost::with_selection(1024, 0..1);
        doc.select_segment(far, &mut host).unwrap();

        assert_eq!(host.selection, vec![500..516]);
        assert_eq!(host.offset, 496);
        assert_eq!(
            doc.take_events(),
            vec![
                EditorEvent::SelectionChanged { ranges: vec![500..516] },
                EditorEvent::ScrollTo { offset: 496 },
            ]
        );
    }

    #[test]
    fn test_select_visible_segment_does_not_scroll() {
        let mut doc = Document::new(64);
        let root = doc.tree().roots()[0];
        let mut host = FakeHost::with_selection(64, 0..1);
        doc.select_segment(root, &mut host).unwrap();
        assert_eq!(host.offset, 0);
        assert_eq!(doc.take_events().len(), 1);
    }
}
