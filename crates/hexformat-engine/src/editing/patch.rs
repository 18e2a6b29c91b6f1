use crate::tree::SegmentId;

/// Result of applying a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// Segments created or rewritten by the command itself
    pub changed: Vec<SegmentId>,
    /// Segment the view should highlight afterwards, if any
    pub new_selection: Option<SegmentId>,
    /// Other struct instances rewritten by propagation
    pub synced: Vec<SegmentId>,
    pub version: u64,
}
