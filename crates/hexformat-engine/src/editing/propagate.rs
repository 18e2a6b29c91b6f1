//! Keeps every instance of a struct structurally identical.
//!
//! After an edit under node `C`, the governing struct root `G` is `C` itself
//! when `C` is a struct instance, otherwise `C`'s `belong_struct`. For every
//! other registered instance of `G`'s label the node at the same relative path
//! gets its children replaced by clones of `C`'s children.
//!
//! The cost per edit is O(instances × size of `C`'s subtree): nothing is
//! diffed, the edited subtree is re-cloned wholesale.

use crate::editing::{Document, EditError};
use crate::tree::{SegmentId, SegmentKind};

impl Document {
    /// Sync other instances after an edit under `changed`; returns the nodes
    /// rewritten in those instances. Instances whose layout no longer lines up
    /// are skipped with a warning.
    pub(crate) fn propagate_from(&mut self, changed: Option<SegmentId>) -> Result<Vec<SegmentId>, EditError> {
        let Some(changed) = changed else {
            return Ok(Vec::new());
        };
        let segment = self.tree.get(changed)?;
        let governing = if segment.kind == SegmentKind::Struct {
            Some(changed)
        } else {
            segment.belong_struct
        };
        let Some(root) = governing else {
            return Ok(Vec::new());
        };

        let label = self.tree.get(root)?.display_format.clone();
        let relative = self.tree.relative_path(root, changed)?;
        let locations = self
            .catalog
            .user(&label)
            .map(|f| f.locations().to_vec())
            .unwrap_or_default();

        let mut synced = Vec::new();
        for location in locations {
            if location == root || !self.tree.contains(location) {
                continue;
            }
            match self.sync_instance(changed, &relative, location) {
                Ok(target) => {
                    log::debug!("synced {label} instance {location} at {relative:?}");
                    synced.push(target);
                }
                Err(err) if err.is_user_facing() => {
                    let at = self
                        .tree
                        .path_of(location)
                        .map(|p| p.to_string())
                        .unwrap_or_else(|_| location.to_string());
                    self.warn(format!("skipped instance of \"{label}\" at {at}: {err}"));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(synced)
    }

    fn sync_instance(
        &mut self,
        source: SegmentId,
        relative: &[usize],
        instance: SegmentId,
    ) -> Result<SegmentId, EditError> {
        let target = self
            .tree
            .resolve_from(instance, relative)
            .map_err(|_| EditError::ShapeMismatch)?;
        let original = self.tree.get(source)?;
        let current = self.tree.get(target)?;
        if original.len() != current.len() {
            return Err(EditError::ShapeMismatch);
        }
        let kind = original.kind.clone();
        let display_format = original.display_format.clone();
        let children = original.children.clone();
        let source_start = original.start();
        let target_start = current.start();
        let was_struct = current.kind == SegmentKind::Struct;

        let mut clones = Vec::with_capacity(children.len());
        for child in children {
            let child_start = self.tree.get(child)?.start();
            clones.push(
                self.tree
                    .clone_subtree(child, child_start - source_start + target_start)?,
            );
        }

        let previous = self.tree.replace_children(target, clones.clone())?;
        let mut retired = Vec::new();
        for id in &previous {
            retired.push(*id);
            retired.extend(self.tree.descendants(*id));
        }
        self.catalog.forget_locations(&retired);
        for id in previous {
            self.tree.release_subtree(id);
        }

        if target != instance {
            if was_struct && kind != SegmentKind::Struct {
                self.catalog.forget_locations(&[target]);
            }
            let segment = self.tree.get_mut(target)?;
            segment.kind = kind;
            segment.display_format = display_format;
        }
        for clone in &clones {
            self.track_instances(*clone)?;
        }
        self.tree.refresh_membership(target)?;
        Ok(target)
    }
}
