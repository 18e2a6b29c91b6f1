//! Structural edits on single segments: split, child partition, merge,
//! rename, display format and clearing.

use crate::editing::{Document, EditError, Patch};
use crate::format::FormatDescriptor;
use crate::range::ByteRange;
use crate::tree::{RAW, Segment, SegmentId, SegmentKind, UNDEF_STRUCT};

/// Which side of the selection a fragment sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    Before,
    Selected,
    After,
}

/// Cut `outer` around `range` into 2 or 3 adjacent fragments, left to right
fn fragments(outer: ByteRange, range: ByteRange) -> Result<Vec<(Fragment, ByteRange)>, EditError> {
    let mut pieces = Vec::with_capacity(3);
    if range.start() > outer.start() {
        pieces.push((
            Fragment::Before,
            Document::span(outer.start(), range.start() - 1, outer)?,
        ));
    }
    pieces.push((Fragment::Selected, range));
    if range.end() < outer.end() {
        pieces.push((
            Fragment::After,
            Document::span(range.end() + 1, outer.end(), outer)?,
        ));
    }
    Ok(pieces)
}

fn not_raw(segment: &Segment) -> EditError {
    if segment.kind == SegmentKind::Raw {
        EditError::AlreadyHasChildren
    } else {
        EditError::NotRaw(segment.display_format.clone())
    }
}

impl Document {
    /// Check that `range` can be cut out of the raw leaf `target`
    fn check_cut(&self, target: SegmentId, range: ByteRange) -> Result<&Segment, EditError> {
        let segment = self.tree.get(target)?;
        if !segment.range.contains(&range) {
            return Err(EditError::RangeOutsideSegment {
                range: range.to_string(),
                segment: segment.range.to_string(),
            });
        }
        if !segment.is_raw_leaf() {
            return Err(not_raw(segment));
        }
        if segment.range == range {
            return Err(EditError::NothingToSplit);
        }
        Ok(segment)
    }

    /// Replace a raw leaf with 2 or 3 siblings; the selected fragment gets a
    /// fresh name and the others keep the original one
    pub fn split(&mut self, target: SegmentId, range: ByteRange) -> Result<Patch, EditError> {
        let segment = self.check_cut(target, range)?;
        let name = segment.name.clone();
        let parent = segment.parent;
        let pieces = fragments(segment.range, range)?;

        let selected_name = self.fresh_name();
        let mut ids = Vec::with_capacity(pieces.len());
        let mut selection = None;
        for (fragment, piece) in pieces {
            let id = if fragment == Fragment::Selected {
                let id = self.tree.alloc(Segment::raw(selected_name.clone(), piece));
                selection = Some(id);
                id
            } else {
                self.tree.alloc(Segment::raw(name.clone(), piece))
            };
            ids.push(id);
        }

        self.tree.splice(target, &ids)?;
        self.tree.release_subtree(target);
        if let Some(parent) = parent {
            self.tree.refresh_membership(parent)?;
        }
        self.commit(parent, ids, selection)
    }

    /// Partition a raw leaf into children around `range`; the leaf becomes
    /// an undefStruct
    pub fn create_child(&mut self, target: SegmentId, range: ByteRange) -> Result<Patch, EditError> {
        let segment = self.check_cut(target, range)?;
        let pieces = fragments(segment.range, range)?;

        let mut ids = Vec::with_capacity(pieces.len());
        let mut selection = None;
        for (fragment, piece) in pieces {
            let name = self.fresh_name();
            let id = self.tree.alloc(Segment::raw(name, piece));
            if fragment == Fragment::Selected {
                selection = Some(id);
            }
            ids.push(id);
        }

        self.tree.replace_children(target, ids.clone())?;
        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::UndefStruct;
        segment.display_format = UNDEF_STRUCT.to_string();
        self.tree.refresh_membership(target)?;
        self.commit(Some(target), ids, selection)
    }

    /// Merge with the previous sibling, keeping the previous sibling's name
    pub fn merge_up(&mut self, target: SegmentId) -> Result<Patch, EditError> {
        let (_, index) = self.tree.position(target)?;
        let left = index.checked_sub(1).ok_or(EditError::NoNeighbour("previous"))?;
        self.merge_pair(target, left, true)
    }

    /// Merge with the next sibling, keeping the next sibling's name
    pub fn merge_down(&mut self, target: SegmentId) -> Result<Patch, EditError> {
        let (parent, index) = self.tree.position(target)?;
        if index + 1 >= self.tree.siblings(parent)?.len() {
            return Err(EditError::NoNeighbour("next"));
        }
        self.merge_pair(target, index, false)
    }

    fn merge_pair(&mut self, target: SegmentId, left_index: usize, keep_left: bool) -> Result<Patch, EditError> {
        let parent = self.tree.get(target)?.parent;
        let siblings = self.tree.siblings(parent)?;
        let (left, right) = (siblings[left_index], siblings[left_index + 1]);
        let (left, right) = (self.tree.get(left)?, self.tree.get(right)?);
        if !left.is_raw_leaf() || !right.is_raw_leaf() {
            return Err(EditError::MergeFormatted);
        }
        let range = left.range.join(&right.range).ok_or(EditError::MergeFormatted)?;
        let name = if keep_left { left.name.clone() } else { right.name.clone() };

        let merged = self.tree.alloc(Segment::raw(name, range));
        let removed = self.tree.splice_range(parent, left_index, 2, merged)?;
        for id in removed {
            self.tree.release_subtree(id);
        }
        if let Some(parent) = parent {
            self.tree.refresh_membership(parent)?;
        }
        self.commit(parent, vec![merged], Some(merged))
    }

    pub fn rename(&mut self, target: SegmentId, name: &str) -> Result<Patch, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName);
        }
        let segment = self.tree.get_mut(target)?;
        segment.name = name.to_string();
        let parent = segment.parent;
        self.commit(parent, vec![target], Some(target))
    }

    /// Show a childless leaf as a base or text format
    pub fn set_display_format(&mut self, target: SegmentId, label: &str) -> Result<Patch, EditError> {
        let segment = self.tree.get(target)?;
        if segment.is_array_item {
            return Err(EditError::ArrayItemLocked);
        }
        if segment.has_children() {
            return Err(EditError::AlreadyHasChildren);
        }
        if !matches!(segment.kind, SegmentKind::Raw | SegmentKind::Primitive(_)) {
            return Err(EditError::NotRaw(segment.display_format.clone()));
        }
        if label == RAW {
            return self.clear_format(target);
        }
        let format = self
            .catalog
            .get(label)
            .ok_or_else(|| EditError::UnknownFormat(label.to_string()))?;
        if !self.catalog.is_atom(label) {
            return Err(EditError::NotPrimitive(label.to_string()));
        }
        let length = segment.len();
        if length % format.min_bytes() != 0 {
            return Err(EditError::LengthNotDivisible {
                length,
                width: format.min_bytes(),
            });
        }

        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::Primitive(label.to_string());
        segment.display_format = label.to_string();
        let parent = segment.parent;
        self.format_changed(label);
        self.commit(parent, vec![target], Some(target))
    }

    /// Back to raw: children are discarded and a struct instance is
    /// unregistered (its label stays in the catalog)
    pub fn clear_format(&mut self, target: SegmentId) -> Result<Patch, EditError> {
        let segment = self.tree.get(target)?;
        if segment.is_array_item {
            return Err(EditError::ArrayItemLocked);
        }
        let previous = segment.display_format.clone();
        let was_struct = segment.kind == SegmentKind::Struct;
        let parent = segment.parent;

        let mut retired = self.tree.descendants(target);
        retired.push(target);
        self.catalog.forget_locations(&retired);

        let children = self.tree.replace_children(target, Vec::new())?;
        for child in children {
            self.tree.release_subtree(child);
        }
        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::Raw;
        segment.display_format = RAW.to_string();
        if was_struct {
            self.format_changed(&previous);
        }
        self.commit(parent, vec![target], Some(target))
    }

    /// Formats the segment could be shown as, for menus
    pub fn applicable_formats(&self, target: SegmentId) -> Result<Vec<&FormatDescriptor>, EditError> {
        let length = self.tree.get(target)?.len();
        Ok(self.catalog.applicable(length))
    }
}
