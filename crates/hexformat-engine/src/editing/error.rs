use crate::format::CatalogError;
use crate::tree::TreeError;

/// Why a command was rejected
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Stale id or path; the caller should re-resolve
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("nothing is selected")]
    NoSelection,
    #[error("selection crosses a segment boundary")]
    SelectionCrossesBoundary,
    #[error("selection covers the whole segment, nothing to split")]
    NothingToSplit,
    #[error("range {range} lies outside segment {segment}")]
    RangeOutsideSegment { range: String, segment: String },
    #[error("segment is formatted as \"{0}\", clear its format first")]
    NotRaw(String),
    #[error("segment already has sub-segments, clear them first")]
    AlreadyHasChildren,
    #[error("segment length ({length}) is not divisible by format width ({width})")]
    LengthNotDivisible { length: u64, width: u64 },
    #[error("chunk length must be at least one byte")]
    ZeroChunk,
    #[error("unknown format \"{0}\"")]
    UnknownFormat(String),
    #[error("\"{0}\" is not a primitive format")]
    NotPrimitive(String),
    #[error("only unformatted segments without sub-segments can be merged")]
    MergeFormatted,
    #[error("there is no {0} segment to merge with")]
    NoNeighbour(&'static str),
    #[error("only a segment with unnamed sub-segments can be defined as a struct")]
    NotUndefStruct,
    #[error("segment is not a struct instance")]
    NotAStruct,
    #[error("struct \"{label}\" needs {expected} bytes but the segment has {actual}")]
    LengthMismatch { label: String, expected: u64, actual: u64 },
    #[error("instance of struct \"{label}\" spans {actual} bytes instead of {expected}")]
    TemplateWidth { label: String, expected: u64, actual: u64 },
    #[error("struct \"{0}\" has no instance to copy its layout from")]
    NoTemplate(String),
    #[error("struct \"{0}\" cannot be placed inside one of its own instances")]
    RecursiveStruct(String),
    #[error("array items take the array's element format")]
    ArrayItemLocked,
    #[error("segment name cannot be empty")]
    EmptyName,
    #[error("instance layout does not match the edited struct")]
    ShapeMismatch,
}

impl EditError {
    /// User precondition failures go to the warning channel; addressing
    /// errors are internal and only logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, EditError::Tree(_))
    }
}
