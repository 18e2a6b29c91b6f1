//! # Segment tree
//!
//! The segment forest lives in a generational arena. A [`SegmentId`] stays valid
//! for as long as its segment exists; once a segment is released its slot's
//! generation is bumped, so any id still pointing at it is reported as stale
//! instead of silently aliasing whatever segment reuses the slot.
//!
//! Positional [`IndexPath`]s are derived on demand (for rendering, warnings and
//! the persisted layout) and resolved back to ids when they come from outside.

pub mod invariants;

use serde::{Deserialize, Serialize};

use crate::range::ByteRange;

/// Stable handle to a segment in a [`SegmentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Positional address: root index, then one child index per level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }
}

impl From<Vec<usize>> for IndexPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl std::fmt::Display for IndexPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "]")
    }
}

/// Resolved structural kind of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Unformatted, splittable, never has children
    Raw,
    /// Has sub-segments but has not been promoted to a named struct
    UndefStruct,
    /// Instance of a user struct; `display_format` is the struct label
    Struct,
    /// Equal-width items sharing one element format
    Array,
    /// Base or text format; `display_format` is the primitive label
    Primitive(String),
}

pub const RAW: &str = "raw";
pub const UNDEF_STRUCT: &str = "undefStruct";
const STRUCT: &str = "struct";
const ARRAY: &str = "array";

impl SegmentKind {
    /// Value of the persisted `format` field
    pub fn as_format_str(&self) -> &str {
        match self {
            SegmentKind::Raw => RAW,
            SegmentKind::UndefStruct => UNDEF_STRUCT,
            SegmentKind::Struct => STRUCT,
            SegmentKind::Array => ARRAY,
            SegmentKind::Primitive(label) => label,
        }
    }

    pub fn from_format_str(format: &str) -> Self {
        match format {
            RAW => SegmentKind::Raw,
            UNDEF_STRUCT => SegmentKind::UndefStruct,
            STRUCT => SegmentKind::Struct,
            ARRAY => SegmentKind::Array,
            label => SegmentKind::Primitive(label.to_string()),
        }
    }
}

/// A named, typed byte range node
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub(crate) name: String,
    pub(crate) range: ByteRange,
    pub(crate) display_format: String,
    pub(crate) kind: SegmentKind,
    pub(crate) is_array_item: bool,
    /// Root of the struct instance governing this segment
    pub(crate) belong_struct: Option<SegmentId>,
    pub(crate) parent: Option<SegmentId>,
    pub(crate) children: Vec<SegmentId>,
}

impl Segment {
    /// A detached raw segment
    pub fn raw(name: impl Into<String>, range: ByteRange) -> Self {
        Self {
            name: name.into(),
            range,
            display_format: RAW.to_string(),
            kind: SegmentKind::Raw,
            is_array_item: false,
            belong_struct: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A detached primitive-formatted segment
    pub fn primitive(name: impl Into<String>, range: ByteRange, label: &str) -> Self {
        Self {
            display_format: label.to_string(),
            kind: SegmentKind::Primitive(label.to_string()),
            ..Self::raw(name, range)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn start(&self) -> u64 {
        self.range.start()
    }

    pub fn end(&self) -> u64 {
        self.range.end()
    }

    pub fn len(&self) -> u64 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn display_format(&self) -> &str {
        &self.display_format
    }

    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    pub fn is_array_item(&self) -> bool {
        self.is_array_item
    }

    pub fn belong_struct(&self) -> Option<SegmentId> {
        self.belong_struct
    }

    pub fn parent(&self) -> Option<SegmentId> {
        self.parent
    }

    pub fn children(&self) -> &[SegmentId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_raw_leaf(&self) -> bool {
        self.kind == SegmentKind::Raw && self.children.is_empty()
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("segment {0} no longer exists")]
    StaleSegment(SegmentId),
    #[error("index path {0} does not address a segment")]
    PathOutOfRange(IndexPath),
    #[error("segment {descendant} is not inside {ancestor}")]
    NotADescendant {
        ancestor: SegmentId,
        descendant: SegmentId,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    segment: Option<Segment>,
}

/// Generational arena holding the segment forest
#[derive(Debug, Clone, Default)]
pub struct SegmentTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<SegmentId>,
}

impl SegmentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the forest with one raw segment spanning `[0, file_size - 1]`.
    ///
    /// An empty file yields an empty forest.
    pub fn for_file(file_size: u64, root_name: &str) -> Self {
        let mut tree = Self::new();
        if let Some(range) = ByteRange::with_len(0, file_size) {
            let id = tree.alloc(Segment::raw(root_name, range));
            tree.roots.push(id);
        }
        tree
    }

    pub fn roots(&self) -> &[SegmentId] {
        &self.roots
    }

    /// Number of live segments
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.segment.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: SegmentId) -> Result<&Segment, TreeError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.segment.as_ref())
            .ok_or(TreeError::StaleSegment(id))
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment, TreeError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.segment.as_mut())
            .ok_or(TreeError::StaleSegment(id))
    }

    /// Store a detached segment and hand out its id
    pub(crate) fn alloc(&mut self, segment: Segment) -> SegmentId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.segment = Some(segment);
            SegmentId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                segment: Some(segment),
            });
            SegmentId {
                index,
                generation: 0,
            }
        }
    }

    /// Drop a segment and all of its descendants from the arena.
    ///
    /// The caller is responsible for unlinking `id` from its parent first.
    pub(crate) fn release_subtree(&mut self, id: SegmentId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(segment) = slot.segment.take() {
                stack.extend(segment.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    /// Sibling list that `parent` owns (`None` is the root list)
    pub fn siblings(&self, parent: Option<SegmentId>) -> Result<&[SegmentId], TreeError> {
        match parent {
            Some(parent) => Ok(&self.get(parent)?.children),
            None => Ok(&self.roots),
        }
    }

    fn siblings_mut(&mut self, parent: Option<SegmentId>) -> Result<&mut Vec<SegmentId>, TreeError> {
        match parent {
            Some(parent) => Ok(&mut self.get_mut(parent)?.children),
            None => Ok(&mut self.roots),
        }
    }

    /// Parent and position of `id` among its siblings
    pub fn position(&self, id: SegmentId) -> Result<(Option<SegmentId>, usize), TreeError> {
        let parent = self.get(id)?.parent;
        let index = self
            .siblings(parent)?
            .iter()
            .position(|sibling| *sibling == id)
            .ok_or(TreeError::StaleSegment(id))?;
        Ok((parent, index))
    }

    /// Derive the current index path of a segment
    pub fn path_of(&self, id: SegmentId) -> Result<IndexPath, TreeError> {
        let mut indices = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let (parent, index) = self.position(node)?;
            indices.push(index);
            current = parent;
        }
        indices.reverse();
        Ok(IndexPath(indices))
    }

    /// Walk an index path from the root list
    pub fn resolve(&self, path: &IndexPath) -> Result<SegmentId, TreeError> {
        let out_of_range = || TreeError::PathOutOfRange(path.clone());
        let (first, rest) = path.as_slice().split_first().ok_or_else(out_of_range)?;
        let root = *self.roots.get(*first).ok_or_else(out_of_range)?;
        self.resolve_from(root, rest).map_err(|_| out_of_range())
    }

    /// Walk child indices starting at `base`
    pub fn resolve_from(&self, base: SegmentId, relative: &[usize]) -> Result<SegmentId, TreeError> {
        let mut current = base;
        for (depth, index) in relative.iter().enumerate() {
            current = *self
                .get(current)?
                .children
                .get(*index)
                .ok_or_else(|| TreeError::PathOutOfRange(IndexPath(relative[..=depth].to_vec())))?;
        }
        Ok(current)
    }

    /// Child indices leading from `ancestor` down to `id`
    pub fn relative_path(&self, ancestor: SegmentId, id: SegmentId) -> Result<Vec<usize>, TreeError> {
        let mut indices = Vec::new();
        let mut current = id;
        while current != ancestor {
            let (parent, index) = self.position(current)?;
            indices.push(index);
            current = parent.ok_or(TreeError::NotADescendant {
                ancestor,
                descendant: id,
            })?;
        }
        indices.reverse();
        Ok(indices)
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: SegmentId) -> Vec<SegmentId> {
        let mut result = Vec::new();
        let mut current = self.get(id).ok().and_then(|s| s.parent);
        while let Some(node) = current {
            result.push(node);
            current = self.get(node).ok().and_then(|s| s.parent);
        }
        result
    }

    /// Pre-order descendants of `id`, excluding `id`
    pub fn descendants(&self, id: SegmentId) -> Vec<SegmentId> {
        let mut result = Vec::new();
        let mut stack: Vec<SegmentId> = self
            .get(id)
            .map(|s| s.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Ok(segment) = self.get(current) {
                stack.extend(segment.children.iter().rev().copied());
            }
        }
        result
    }

    /// Whole forest in pre-order with depth
    pub fn preorder(&self) -> Vec<(SegmentId, usize)> {
        let mut result = Vec::new();
        let mut stack: Vec<(SegmentId, usize)> = self.roots.iter().rev().map(|id| (*id, 0)).collect();
        while let Some((current, depth)) = stack.pop() {
            result.push((current, depth));
            if let Ok(segment) = self.get(current) {
                stack.extend(segment.children.iter().rev().map(|child| (*child, depth + 1)));
            }
        }
        result
    }

    /// Deepest segments whose range contains `range`.
    ///
    /// Containing segments with children are descended into rather than
    /// returned. An empty result means the range crosses a segment boundary.
    pub fn find_leaves(&self, range: &ByteRange) -> Vec<SegmentId> {
        let mut found = Vec::new();
        self.collect_leaves(&self.roots, range, &mut found);
        found
    }

    fn collect_leaves(&self, level: &[SegmentId], range: &ByteRange, found: &mut Vec<SegmentId>) {
        for id in level {
            let Ok(segment) = self.get(*id) else {
                continue;
            };
            if !segment.range.contains(range) {
                continue;
            }
            if segment.children.is_empty() {
                found.push(*id);
            } else {
                self.collect_leaves(&segment.children, range, found);
            }
        }
    }

    /// Index paths of [`SegmentTree::find_leaves`]
    pub fn find_index_paths(&self, range: &ByteRange) -> Vec<IndexPath> {
        self.find_leaves(range)
            .into_iter()
            .filter_map(|id| self.path_of(id).ok())
            .collect()
    }

    /// Nearest strict ancestor whose kind is struct
    pub fn nearest_struct_ancestor(&self, id: SegmentId) -> Option<SegmentId> {
        self.ancestors(id).into_iter().find(|ancestor| {
            self.get(*ancestor)
                .map(|s| s.kind == SegmentKind::Struct)
                .unwrap_or(false)
        })
    }

    /// Swap `target` for `replacements` inside its sibling list.
    ///
    /// `target` is detached but not released; the replacements adopt its parent.
    pub(crate) fn splice(&mut self, target: SegmentId, replacements: &[SegmentId]) -> Result<(), TreeError> {
        let (parent, index) = self.position(target)?;
        for id in replacements {
            self.get_mut(*id)?.parent = parent;
        }
        let siblings = self.siblings_mut(parent)?;
        let _detached: Vec<SegmentId> = siblings.splice(index..=index, replacements.iter().copied()).collect();
        self.get_mut(target)?.parent = None;
        Ok(())
    }

    /// Remove `count` siblings starting at `index` and put `replacement` in their place.
    pub(crate) fn splice_range(
        &mut self,
        parent: Option<SegmentId>,
        index: usize,
        count: usize,
        replacement: SegmentId,
    ) -> Result<Vec<SegmentId>, TreeError> {
        self.get_mut(replacement)?.parent = parent;
        let siblings = self.siblings_mut(parent)?;
        let removed: Vec<SegmentId> = siblings.splice(index..index + count, [replacement]).collect();
        for id in &removed {
            self.get_mut(*id)?.parent = None;
        }
        Ok(removed)
    }

    /// Replace the children of `parent`, returning the detached previous ones.
    pub(crate) fn replace_children(
        &mut self,
        parent: SegmentId,
        children: Vec<SegmentId>,
    ) -> Result<Vec<SegmentId>, TreeError> {
        for child in &children {
            self.get_mut(*child)?.parent = Some(parent);
        }
        let previous = std::mem::replace(&mut self.get_mut(parent)?.children, children);
        for child in &previous {
            self.get_mut(*child)?.parent = None;
        }
        Ok(previous)
    }

    /// Deep-copy the subtree at `source` into fresh detached segments,
    /// shifting every range from `source`'s start to `new_start`.
    pub(crate) fn clone_subtree(&mut self, source: SegmentId, new_start: u64) -> Result<SegmentId, TreeError> {
        let origin = self.get(source)?.start();
        self.clone_rebased(source, origin, new_start)
    }

    fn clone_rebased(&mut self, source: SegmentId, from: u64, to: u64) -> Result<SegmentId, TreeError> {
        let original = self.get(source)?.clone();
        let range = original
            .range
            .rebase(from, to)
            .ok_or(TreeError::StaleSegment(source))?;
        let mut children = Vec::with_capacity(original.children.len());
        for child in &original.children {
            children.push(self.clone_rebased(*child, from, to)?);
        }
        let copy = Segment {
            range,
            parent: None,
            belong_struct: None,
            children: Vec::new(),
            ..original
        };
        let id = self.alloc(copy);
        self.replace_children(id, children)?;
        Ok(id)
    }

    /// Recompute `belong_struct` for the descendants of `id`.
    ///
    /// Every node points at its nearest strict ancestor of kind struct.
    pub(crate) fn refresh_membership(&mut self, id: SegmentId) -> Result<(), TreeError> {
        let segment = self.get(id)?;
        let governing = if segment.kind == SegmentKind::Struct {
            Some(id)
        } else {
            segment.belong_struct
        };
        let mut stack: Vec<(SegmentId, Option<SegmentId>)> =
            segment.children.iter().map(|child| (*child, governing)).collect();
        while let Some((current, governing)) = stack.pop() {
            let node = self.get_mut(current)?;
            node.belong_struct = governing;
            let next = if node.kind == SegmentKind::Struct {
                Some(current)
            } else {
                governing
            };
            stack.extend(node.children.iter().map(|child| (*child, next)));
        }
        Ok(())
    }

    /// Attach a detached segment at the end of the root list
    pub(crate) fn push_root(&mut self, id: SegmentId) -> Result<(), TreeError> {
        self.get_mut(id)?.parent = None;
        self.roots.push(id);
        Ok(())
    }
}
