use crate::editing::{Document, EditError, Patch};
use crate::format::array_format;
use crate::range::ByteRange;
use crate::tree::{Segment, SegmentId, SegmentKind, UNDEF_STRUCT};

/// What each chunk becomes
#[derive(Debug, Clone, Copy)]
enum ChunkFormat {
    Primitive,
    /// Instance cloned from an existing instance of the struct
    Struct { template: SegmentId },
}

/// Validated chunking of one raw segment
#[derive(Debug)]
struct ChunkPlan {
    name: String,
    label: String,
    start: u64,
    chunk_len: u64,
    count: u64,
    format: ChunkFormat,
}

impl Document {
    fn plan_chunks(&self, target: SegmentId, label: &str, chunk_len: u64) -> Result<ChunkPlan, EditError> {
        let segment = self.tree.get(target)?;
        if segment.has_children() {
            return Err(EditError::AlreadyHasChildren);
        }
        if segment.kind != SegmentKind::Raw {
            return Err(EditError::NotRaw(segment.display_format.clone()));
        }
        if chunk_len == 0 {
            return Err(EditError::ZeroChunk);
        }
        let length = segment.len();
        if length % chunk_len != 0 {
            return Err(EditError::LengthNotDivisible {
                length,
                width: chunk_len,
            });
        }

        let format = if self.catalog.is_atom(label) {
            let width = self
                .catalog
                .get(label)
                .map(|f| f.min_bytes())
                .ok_or_else(|| EditError::UnknownFormat(label.to_string()))?;
            if chunk_len % width != 0 {
                return Err(EditError::LengthNotDivisible {
                    length: chunk_len,
                    width,
                });
            }
            ChunkFormat::Primitive
        } else if let Some(user) = self.catalog.user(label) {
            if user.min_bytes() != chunk_len {
                return Err(EditError::LengthMismatch {
                    label: label.to_string(),
                    expected: user.min_bytes(),
                    actual: chunk_len,
                });
            }
            let template = *user
                .locations()
                .first()
                .ok_or_else(|| EditError::NoTemplate(label.to_string()))?;
            self.check_template_width(template, label, chunk_len)?;
            self.check_not_recursive(target, label)?;
            ChunkFormat::Struct { template }
        } else {
            return Err(EditError::UnknownFormat(label.to_string()));
        };

        Ok(ChunkPlan {
            name: segment.name.clone(),
            label: label.to_string(),
            start: segment.start(),
            chunk_len,
            count: length / chunk_len,
            format,
        })
    }

    /// Allocate the detached chunks `<name>_<label>_<i>`, registering struct chunks
    fn build_chunks(&mut self, plan: &ChunkPlan, array_items: bool) -> Result<Vec<SegmentId>, EditError> {
        let mut ids = Vec::new();
        for i in 0..plan.count {
            let start = plan.start + i * plan.chunk_len;
            let name = format!("{}_{}_{}", plan.name, plan.label, i + 1);
            let id = match plan.format {
                ChunkFormat::Primitive => {
                    let range = ByteRange::with_len(start, plan.chunk_len).ok_or(EditError::ZeroChunk)?;
                    self.tree.alloc(Segment::primitive(name, range, &plan.label))
                }
                ChunkFormat::Struct { template } => {
                    let id = self.tree.clone_subtree(template, start)?;
                    self.tree.get_mut(id)?.name = name;
                    self.track_instances(id)?;
                    // clones come back detached from any struct
                    self.tree.refresh_membership(id)?;
                    id
                }
            };
            self.tree.get_mut(id)?.is_array_item = array_items;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Turn a raw leaf into an undefStruct of equal-width children
    pub fn split_segment_by_format(
        &mut self,
        target: SegmentId,
        label: &str,
        chunk_len: u64,
    ) -> Result<Patch, EditError> {
        let plan = self.plan_chunks(target, label, chunk_len)?;
        let ids = self.build_chunks(&plan, false)?;

        self.tree.replace_children(target, ids.clone())?;
        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::UndefStruct;
        segment.display_format = UNDEF_STRUCT.to_string();
        self.tree.refresh_membership(target)?;
        self.format_changed(label);
        self.commit(Some(target), ids, Some(target))
    }

    /// Turn a raw leaf into an `Array<label>[count]` of equal-width items
    pub fn set_array_by_format(&mut self, target: SegmentId, label: &str, chunk_len: u64) -> Result<Patch, EditError> {
        let plan = self.plan_chunks(target, label, chunk_len)?;
        let ids = self.build_chunks(&plan, true)?;

        self.tree.replace_children(target, ids.clone())?;
        let segment = self.tree.get_mut(target)?;
        segment.kind = SegmentKind::Array;
        segment.display_format = array_format(label, ids.len());
        self.tree.refresh_membership(target)?;
        self.format_changed(label);
        self.commit(Some(target), ids, Some(target))
    }

    /// Replace a raw leaf among its siblings with equal-width chunks
    pub fn separate_by_format(&mut self, target: SegmentId, label: &str, chunk_len: u64) -> Result<Patch, EditError> {
        let plan = self.plan_chunks(target, label, chunk_len)?;
        let parent = self.tree.get(target)?.parent;
        let ids = self.build_chunks(&plan, false)?;

        self.tree.splice(target, &ids)?;
        self.tree.release_subtree(target);
        if let Some(parent) = parent {
            self.tree.refresh_membership(parent)?;
        }
        self.format_changed(label);
        let selection = ids.first().copied();
        self.commit(parent, ids, selection)
    }
}
