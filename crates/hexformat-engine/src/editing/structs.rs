//! User struct definition and instantiation.

use crate::editing::{Cmd, Document, EditError, Patch};
use crate::tree::{SegmentId, SegmentKind};

/// A struct definition waiting for its name.
///
/// Produced by [`Document::begin_define_struct`] once the target has been
/// checked. Dropping the request cancels the definition without touching
/// the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructNameRequest {
    target: SegmentId,
    length: u64,
}

impl StructNameRequest {
    pub fn target(&self) -> SegmentId {
        self.target
    }

    /// Size the new struct will have
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Complete the definition; a rejected name is reported as a warning
    pub fn submit(self, doc: &mut Document, name: &str) -> Option<Patch> {
        doc.apply(Cmd::DefineStruct {
            target: self.target,
            name: name.to_string(),
        })
    }
}

impl Document {
    fn check_definable(&self, target: SegmentId) -> Result<u64, EditError> {
        let segment = self.tree.get(target)?;
        if segment.kind != SegmentKind::UndefStruct {
            return Err(EditError::NotUndefStruct);
        }
        Ok(segment.len())
    }

    /// Validate the target now and ask the caller for a name later
    pub fn begin_define_struct(&self, target: SegmentId) -> Result<StructNameRequest, EditError> {
        let length = self.check_definable(target)?;
        Ok(StructNameRequest { target, length })
    }

    /// Promote an undefStruct to a new user struct named `name`
    pub fn define_struct(&mut self, target: SegmentId, name: &str) -> Result<Patch, EditError> {
        let length = self.check_definable(target)?;
        self.catalog.register_struct(name, length, target)?;

        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::Struct;
        segment.display_format = name.to_string();
        let parent = segment.parent;
        self.tree.refresh_membership(target)?;
        self.format_changed(name);
        self.commit(parent, vec![target], Some(target))
    }

    /// Stamp `template`'s internal layout onto the raw leaf `target`
    pub fn instantiate(&mut self, template: SegmentId, target: SegmentId) -> Result<Patch, EditError> {
        let source = self.tree.get(template)?;
        if source.kind != SegmentKind::Struct {
            return Err(EditError::NotAStruct);
        }
        let label = source.display_format.clone();
        let source_start = source.start();
        let children = source.children.clone();
        let expected = self
            .catalog
            .user(&label)
            .map(|f| f.min_bytes())
            .ok_or_else(|| EditError::UnknownFormat(label.clone()))?;
        self.check_template_width(template, &label, expected)?;

        let segment = self.tree.get(target)?;
        if segment.is_array_item {
            return Err(EditError::ArrayItemLocked);
        }
        if segment.has_children() {
            return Err(EditError::AlreadyHasChildren);
        }
        if segment.kind != SegmentKind::Raw {
            return Err(EditError::NotRaw(segment.display_format.clone()));
        }
        if segment.len() != expected {
            return Err(EditError::LengthMismatch {
                label,
                expected,
                actual: segment.len(),
            });
        }
        self.check_not_recursive(target, &label)?;
        let target_start = segment.start();
        let parent = segment.parent;

        let mut clones = Vec::with_capacity(children.len());
        for child in children {
            let child_start = self.tree.get(child)?.start();
            clones.push(
                self.tree
                    .clone_subtree(child, child_start - source_start + target_start)?,
            );
        }
        self.tree.replace_children(target, clones.clone())?;
        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::Struct;
        segment.display_format = label.clone();
        self.catalog.add_location(&label, target)?;
        for clone in &clones {
            self.track_instances(*clone)?;
        }
        self.tree.refresh_membership(target)?;
        self.format_changed(&label);
        self.commit(parent, clones, Some(target))
    }

    /// Instantiate `label` using its first registered instance as template
    pub fn apply_struct(&mut self, label: &str, target: SegmentId) -> Result<Patch, EditError> {
        let format = self
            .catalog
            .user(label)
            .ok_or_else(|| EditError::UnknownFormat(label.to_string()))?;
        let template = *format
            .locations()
            .first()
            .ok_or_else(|| EditError::NoTemplate(label.to_string()))?;
        self.instantiate(template, target)
    }

    /// Register every struct root in the subtree at `root`, `root` included
    pub(crate) fn track_instances(&mut self, root: SegmentId) -> Result<(), EditError> {
        let mut ids = vec![root];
        ids.extend(self.tree.descendants(root));
        for id in ids {
            let segment = self.tree.get(id)?;
            if segment.kind == SegmentKind::Struct {
                let label = segment.display_format.clone();
                self.catalog.add_location(&label, id)?;
            }
        }
        Ok(())
    }

    /// The instance a layout is copied from must span exactly the struct's width
    pub(crate) fn check_template_width(&self, template: SegmentId, label: &str, expected: u64) -> Result<(), EditError> {
        let actual = self.tree.get(template)?.len();
        if actual != expected {
            return Err(EditError::TemplateWidth {
                label: label.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// A struct may not appear inside one of its own instances
    pub(crate) fn check_not_recursive(&self, target: SegmentId, label: &str) -> Result<(), EditError> {
        let nested = self.tree.ancestors(target).into_iter().any(|ancestor| {
            self.tree
                .get(ancestor)
                .map(|s| s.kind == SegmentKind::Struct && s.display_format == label)
                .unwrap_or(false)
        });
        if nested {
            return Err(EditError::RecursiveStruct(label.to_string()));
        }
        Ok(())
    }
}
