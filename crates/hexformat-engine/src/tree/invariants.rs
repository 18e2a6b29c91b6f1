use crate::format::FormatCatalog;
use crate::tree::{IndexPath, SegmentId, SegmentKind, SegmentTree};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("segments under {0} do not exactly partition their parent")]
    BrokenPartition(IndexPath),
    #[error("top-level segments are not contiguous")]
    BrokenRootPartition,
    #[error("segment {0} has a stale parent link")]
    ParentLink(IndexPath),
    #[error("raw or primitive segment {0} has sub-segments")]
    LeafWithChildren(IndexPath),
    #[error("{0} segment {1} has no sub-segments")]
    EmptyContainer(String, IndexPath),
    #[error("array {0} has items of differing format or width")]
    BrokenArray(IndexPath),
    #[error("struct segment {0} is not registered under its label")]
    UntrackedStruct(IndexPath),
    #[error("struct \"{0}\" lists a location that is not one of its instances")]
    DanglingLocation(String),
    #[error("segment {0} points at the wrong struct root")]
    WrongMembership(IndexPath),
    #[error("instance {1} of struct \"{0}\" does not span the struct's width")]
    WrongWidth(String, IndexPath),
}

/// Validate every structural invariant of the forest against the catalog.
pub fn check(tree: &SegmentTree, catalog: &FormatCatalog) -> Result<(), InvariantViolation> {
    check_level(tree, None, tree.roots())?;
    for (id, _) in tree.preorder() {
        check_segment(tree, catalog, id)?;
    }
    for format in catalog.user_formats() {
        for location in format.locations() {
            let ok = tree
                .get(*location)
                .map(|s| s.kind == SegmentKind::Struct && s.display_format == format.label())
                .unwrap_or(false);
            if !ok {
                return Err(InvariantViolation::DanglingLocation(format.label().to_string()));
            }
            if tree.get(*location).map(|s| s.len()).ok() != Some(format.min_bytes()) {
                return Err(InvariantViolation::WrongWidth(
                    format.label().to_string(),
                    path(tree, *location),
                ));
            }
        }
    }
    Ok(())
}

fn path(tree: &SegmentTree, id: SegmentId) -> IndexPath {
    tree.path_of(id).unwrap_or_default()
}

fn check_level(tree: &SegmentTree, parent: Option<SegmentId>, level: &[SegmentId]) -> Result<(), InvariantViolation> {
    let broken = || match parent {
        Some(parent) => InvariantViolation::BrokenPartition(path(tree, parent)),
        None => InvariantViolation::BrokenRootPartition,
    };
    let mut ranges = Vec::with_capacity(level.len());
    for id in level {
        let segment = tree.get(*id).map_err(|_| broken())?;
        if segment.parent != parent {
            return Err(InvariantViolation::ParentLink(path(tree, *id)));
        }
        ranges.push(segment.range);
    }
    if ranges.windows(2).any(|pair| !pair[0].is_followed_by(&pair[1])) {
        return Err(broken());
    }
    if let Some(parent) = parent {
        let outer = tree.get(parent).map_err(|_| broken())?.range;
        let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
            return Ok(());
        };
        if first.start() != outer.start() || last.end() != outer.end() {
            return Err(broken());
        }
    }
    Ok(())
}

fn check_segment(tree: &SegmentTree, catalog: &FormatCatalog, id: SegmentId) -> Result<(), InvariantViolation> {
    let here = || path(tree, id);
    let Ok(segment) = tree.get(id) else {
        return Err(InvariantViolation::ParentLink(here()));
    };
    check_level(tree, Some(id), &segment.children)?;

    match &segment.kind {
        SegmentKind::Raw | SegmentKind::Primitive(_) => {
            if segment.has_children() {
                return Err(InvariantViolation::LeafWithChildren(here()));
            }
        }
        kind => {
            if !segment.has_children() {
                return Err(InvariantViolation::EmptyContainer(
                    kind.as_format_str().to_string(),
                    here(),
                ));
            }
        }
    }

    if segment.kind == SegmentKind::Array {
        let items: Vec<_> = segment.children.iter().filter_map(|c| tree.get(*c).ok()).collect();
        let first = items.first().ok_or_else(|| InvariantViolation::BrokenArray(here()))?;
        let uniform = items.iter().all(|item| {
            item.is_array_item && item.display_format == first.display_format && item.len() == first.len()
        });
        if !uniform {
            return Err(InvariantViolation::BrokenArray(here()));
        }
    }

    if segment.kind == SegmentKind::Struct {
        let tracked = catalog
            .user(&segment.display_format)
            .map(|f| f.locations().contains(&id))
            .unwrap_or(false);
        if !tracked {
            return Err(InvariantViolation::UntrackedStruct(here()));
        }
    }

    if segment.belong_struct != tree.nearest_struct_ancestor(id) {
        return Err(InvariantViolation::WrongMembership(here()));
    }
    Ok(())
}
