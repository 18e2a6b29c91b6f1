pub mod editing;
pub mod events;
pub mod format;
pub mod layout;
pub mod range;
pub mod selection;
pub mod snapshot;
pub mod tree;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{Cmd, Document, DocumentOptions, EditError, Patch, StructNameRequest};
pub use events::EditorEvent;
pub use format::{CatalogError, FormatCatalog, FormatDescriptor, Section};
pub use layout::{ImportError, Layout};
pub use range::ByteRange;
pub use selection::{Dimensions, DisplayHost};
pub use snapshot::{SegmentView, Snapshot, format_outline};
pub use tree::{IndexPath, Segment, SegmentId, SegmentKind, SegmentTree, TreeError};
