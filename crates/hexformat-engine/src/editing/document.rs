use crate::editing::commands::{self, Cmd};
use crate::editing::{EditError, Patch};
use crate::events::EditorEvent;
use crate::format::FormatCatalog;
use crate::range::ByteRange;
use crate::tree::{IndexPath, Segment, SegmentId, SegmentTree};

pub const DEFAULT_ROOT_NAME: &str = "全文";
pub const DEFAULT_NAME_PREFIX: &str = "分段";

/// Naming used when the engine has to invent segment names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Name of the segment seeded over the whole file
    pub root_name: String,
    /// Auto-generated names are `<prefix><N>`
    pub name_prefix: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

/// Format annotation state for one binary file
///
/// Document owns the whole editing model:
///
/// ## 1. Segment forest
/// - **Exact partition**: top-level segments tile `[0, file_size - 1]` and every
///   parent's children tile the parent's range
/// - **Stable ids**: [`SegmentId`]s survive unrelated edits; ids of removed
///   segments become stale rather than pointing at something else
///
/// ## 2. Format catalog
/// - Built-in primitive formats plus user structs
/// - Every struct lists the segments instantiating it, in registration order
///
/// ## 3. Command-based editing
/// - Every edit is a [`Cmd`]; preconditions are checked before anything mutates
/// - A rejected command leaves the forest untouched and queues a warning
/// - After a successful edit inside a struct instance, every other instance of
///   that struct is rewritten to match
///
/// ## Usage Pattern
///
/// ```rust
/// # use hexformat_engine::editing::{Cmd, Document};
/// # use hexformat_engine::range::ByteRange;
/// let mut doc = Document::new(16);
/// let root = doc.tree().roots()[0];
///
/// let patch = doc
///     .apply(Cmd::Split { target: root, range: ByteRange::new(4, 7).unwrap() })
///     .expect("split inside a raw segment");
/// assert_eq!(doc.tree().roots().len(), 3);
/// assert!(patch.new_selection.is_some());
///
/// // Rejected edits surface as warnings instead of errors
/// let same = patch.new_selection.unwrap();
/// assert!(doc.apply(Cmd::Split { target: same, range: ByteRange::new(4, 7).unwrap() }).is_none());
/// assert_eq!(doc.take_events().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) tree: SegmentTree,
    pub(crate) catalog: FormatCatalog,
    pub(crate) options: DocumentOptions,
    pub(crate) file_size: u64,
    /// Next `N` handed out for `<prefix><N>`
    pub(crate) next_name: u64,
    /// Incremented on each successful edit
    pub(crate) version: u64,
    /// Events not yet drained by the host
    pub(crate) events: Vec<EditorEvent>,
}

impl Document {
    /// Fresh document over a file of `file_size` bytes with default naming
    pub fn new(file_size: u64) -> Self {
        Self::with_options(file_size, DocumentOptions::default())
    }

    pub fn with_options(file_size: u64, options: DocumentOptions) -> Self {
        Self {
            tree: SegmentTree::for_file(file_size, &options.root_name),
            catalog: FormatCatalog::new(),
            options,
            file_size,
            next_name: 1,
            version: 0,
            events: Vec::new(),
        }
    }

    pub fn tree(&self) -> &SegmentTree {
        &self.tree
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn segment(&self, id: SegmentId) -> Result<&Segment, EditError> {
        Ok(self.tree.get(id)?)
    }

    pub fn path_of(&self, id: SegmentId) -> Result<IndexPath, EditError> {
        Ok(self.tree.path_of(id)?)
    }

    pub fn resolve(&self, path: &IndexPath) -> Result<SegmentId, EditError> {
        Ok(self.tree.resolve(path)?)
    }

    /// Apply a command, queueing a warning instead of returning the error
    pub fn apply(&mut self, cmd: Cmd) -> Option<Patch> {
        log::debug!("applying {cmd:?}");
        match commands::execute(self, cmd) {
            Ok(patch) => {
                self.events.push(EditorEvent::TreeChanged {
                    version: patch.version,
                });
                Some(patch)
            }
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    /// Drain queued events in the order they happened
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Route a rejected edit: user-facing failures become warnings, addressing
    /// errors are logged only
    pub(crate) fn report(&mut self, err: &EditError) {
        if err.is_user_facing() {
            log::warn!("{err}");
            self.events.push(EditorEvent::warning(err.to_string()));
        } else {
            log::error!("addressing error: {err}");
        }
    }

    pub(crate) fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.events.push(EditorEvent::warning(message));
    }

    /// Hand out the next `<prefix><N>` name
    pub(crate) fn fresh_name(&mut self) -> String {
        let name = format!("{}{}", self.options.name_prefix, self.next_name);
        self.next_name += 1;
        name
    }

    /// Continue numbering after the highest `<prefix><N>` present in the forest
    pub(crate) fn resume_name_counter(&mut self) {
        let prefix = &self.options.name_prefix;
        let highest = self
            .tree
            .preorder()
            .into_iter()
            .filter_map(|(id, _)| self.tree.get(id).ok())
            .filter_map(|segment| segment.name.strip_prefix(prefix.as_str()))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_name = highest + 1;
    }

    /// Bump the version and propagate the edit made under `changed_node`
    pub(crate) fn commit(
        &mut self,
        changed_node: Option<SegmentId>,
        changed: Vec<SegmentId>,
        new_selection: Option<SegmentId>,
    ) -> Result<Patch, EditError> {
        let synced = self.propagate_from(changed_node)?;
        self.version += 1;
        Ok(Patch {
            changed,
            new_selection,
            synced,
            version: self.version,
        })
    }

    pub(crate) fn format_changed(&mut self, label: &str) {
        self.events.push(EditorEvent::FormatChanged {
            label: label.to_string(),
        });
    }

    /// Inclusive range, mapping impossible bounds to an out-of-segment error
    pub(crate) fn span(start: u64, end: u64, outer: ByteRange) -> Result<ByteRange, EditError> {
        ByteRange::new(start, end).ok_or_else(|| EditError::RangeOutsideSegment {
            range: format!("[{start}, {end}]"),
            segment: outer.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SegmentKind;

    #[test]
    fn test_new_document_has_single_raw_root() {
        let doc = Document::new(16);
        let roots = doc.tree().roots();
        assert_eq!(roots.len(), 1);
        let root = doc.segment(roots[0]).unwrap();
        assert_eq!(root.name(), "全文");
        assert_eq!(root.kind(), &SegmentKind::Raw);
        assert_eq!((root.start(), root.end()), (0, 15));
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_empty_file_has_no_segments() {
        let doc = Document::new(0);
        assert!(doc.tree().is_empty());
    }

    #[test]
    fn test_fresh_names_count_up() {
        let mut doc = Document::with_options(
            8,
            DocumentOptions {
                root_name: "file".into(),
                name_prefix: "seg".into(),
            },
        );
        assert_eq!(doc.fresh_name(), "seg1");
        assert_eq!(doc.fresh_name(), "seg2");
    }

    #[test]
    fn test_resume_name_counter_skips_existing_names() {
        let mut doc = Document::new(8);
        let root = doc.tree().roots()[0];
        doc.tree.get_mut(root).unwrap().name = "分段41".to_string();
        doc.resume_name_counter();
        assert_eq!(doc.fresh_name(), "分段42");
    }

    #[test]
    fn test_stale_id_is_logged_not_warned() {
        let mut doc = Document::new(16);
        let root = doc.tree().roots()[0];
        doc.apply(Cmd::Split {
            target: root,
            range: ByteRange::new(0, 3).unwrap(),
        })
        .unwrap();
        doc.take_events();

        // root was replaced by the split
        let result = doc.apply(Cmd::ClearFormat { target: root });
        assert!(result.is_none());
        assert!(doc.take_events().is_empty());
    }
}
