use crate::editing::{Document, EditError, Patch};
use crate::range::ByteRange;
use crate::tree::SegmentId;

/// Every edit the document understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Split a raw leaf into up to three siblings around `range`
    Split { target: SegmentId, range: ByteRange },
    /// Partition a raw leaf into children around `range`
    CreateChild { target: SegmentId, range: ByteRange },
    /// Merge with the previous sibling, keeping that sibling's name
    MergeUp { target: SegmentId },
    /// Merge with the next sibling, keeping that sibling's name
    MergeDown { target: SegmentId },
    /// Chunk into `chunk_len`-byte children of `format`
    SplitByFormat {
        target: SegmentId,
        format: String,
        chunk_len: u64,
    },
    /// Chunk into array items of `format`
    SetArrayByFormat {
        target: SegmentId,
        format: String,
        chunk_len: u64,
    },
    /// Chunk into siblings that replace the segment
    SeparateByFormat {
        target: SegmentId,
        format: String,
        chunk_len: u64,
    },
    SetDisplayFormat { target: SegmentId, format: String },
    Rename { target: SegmentId, name: String },
    /// Return to raw, dropping sub-segments
    ClearFormat { target: SegmentId },
    /// Promote an undefStruct segment to a named struct
    DefineStruct { target: SegmentId, name: String },
    /// Copy `template`'s layout onto `target`
    Instantiate { template: SegmentId, target: SegmentId },
    /// Instantiate a struct by label using its first instance as template
    ApplyStruct { label: String, target: SegmentId },
}

pub(crate) fn execute(doc: &mut Document, cmd: Cmd) -> Result<Patch, EditError> {
    match cmd {
        Cmd::Split { target, range } => doc.split(target, range),
        Cmd::CreateChild { target, range } => doc.create_child(target, range),
        Cmd::MergeUp { target } => doc.merge_up(target),
        Cmd::MergeDown { target } => doc.merge_down(target),
        Cmd::SplitByFormat {
            target,
            format,
            chunk_len,
        } => doc.split_segment_by_format(target, &format, chunk_len),
        Cmd::SetArrayByFormat {
            target,
            format,
            chunk_len,
        } => doc.set_array_by_format(target, &format, chunk_len),
        Cmd::SeparateByFormat {
            target,
            format,
            chunk_len,
        } => doc.separate_by_format(target, &format, chunk_len),
        Cmd::SetDisplayFormat { target, format } => doc.set_display_format(target, &format),
        Cmd::Rename { target, name } => doc.rename(target, &name),
        Cmd::ClearFormat { target } => doc.clear_format(target),
        Cmd::DefineStruct { target, name } => doc.define_struct(target, &name),
        Cmd::Instantiate { template, target } => doc.instantiate(template, target),
        Cmd::ApplyStruct { label, target } => doc.apply_struct(&label, target),
    }
}
