//! Persisted JSON layout: user struct catalog plus the full segment forest.
//!
//! Ids never leave the process; every cross reference (struct locations,
//! `belongStruct`) is written as an index path and resolved again on import.
//! Import builds the new forest on the side, checks it, and only then swaps
//! it in, so a bad file leaves the current document untouched.

use std::io::{Read, Write};

use serde::{Deserialize, Deserializer, Serialize};

use crate::editing::{Document, DocumentOptions};
use crate::events::EditorEvent;
use crate::format::{CatalogError, FormatCatalog, FormatDescriptor, parse_array_format};
use crate::range::ByteRange;
use crate::tree::invariants::{self, InvariantViolation};
use crate::tree::{IndexPath, Segment, SegmentId, SegmentKind, SegmentTree, TreeError};

/// Version written by this build; files without the field are read as version 1
pub const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    1
}

/// `null` and `[]` both mean "no struct"
fn nullable_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<IndexPath, D::Error> {
    Ok(Option::<IndexPath>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    #[serde(default = "default_version")]
    pub format_version: u32,
    #[serde(default)]
    pub user_formats: Vec<FormatRecord>,
    #[serde(default)]
    pub segments: Vec<SegmentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatRecord {
    pub label: String,
    pub min_bytes: u64,
    #[serde(default)]
    pub locations: Vec<IndexPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub name: String,
    pub start: u64,
    pub end: u64,
    pub display_format: String,
    pub format: String,
    #[serde(default)]
    pub is_array_item: bool,
    #[serde(default, deserialize_with = "nullable_path")]
    pub belong_struct: IndexPath,
    #[serde(default)]
    pub sub_segments: Vec<SegmentRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layout format version {0} is newer than supported version {max}", max = FORMAT_VERSION)]
    UnsupportedVersion(u32),
    #[error("segment \"{name}\" has invalid range [{start}, {end}]")]
    InvalidRange { name: String, start: u64, end: u64 },
    #[error("top-level segments must start at byte 0")]
    MisalignedStart,
    #[error("segment \"{name}\" has unknown format \"{format}\"")]
    UnknownFormat { name: String, format: String },
    #[error("array segment \"{0}\" has an unreadable element format")]
    BadArrayFormat(String),
    #[error("struct \"{0}\" must be at least one byte wide")]
    ZeroWidth(String),
    #[error("index path {0} does not address a segment")]
    DanglingPath(IndexPath),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("layout is inconsistent: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl Document {
    pub fn export(&self) -> Layout {
        let tree = self.tree();
        let user_formats = self
            .catalog()
            .user_formats()
            .iter()
            .map(|format| FormatRecord {
                label: format.label().to_string(),
                min_bytes: format.min_bytes(),
                locations: format
                    .locations()
                    .iter()
                    .filter_map(|id| tree.path_of(*id).ok())
                    .collect(),
            })
            .collect();
        Layout {
            format_version: FORMAT_VERSION,
            user_formats,
            segments: tree
                .roots()
                .iter()
                .filter_map(|id| export_segment(tree, *id))
                .collect(),
        }
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export())
    }

    pub fn write_layout<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, &self.export())
    }

    /// Replace the forest and the user structs with `layout`.
    ///
    /// The layout is trusted to be internally consistent (no propagation is
    /// run) but it is still checked, and rejected as a whole when it is not.
    pub fn import(&mut self, layout: Layout) -> Result<(), ImportError> {
        let (tree, catalog) = build(layout)?;
        self.file_size = tree
            .roots()
            .last()
            .and_then(|id| tree.get(*id).ok())
            .map(|segment| segment.end() + 1)
            .unwrap_or(0);
        self.tree = tree;
        self.catalog = catalog;
        self.resume_name_counter();
        self.version += 1;
        self.events.push(EditorEvent::TreeReplaced);
        log::debug!(
            "imported layout: {} segments, {} structs",
            self.tree.len(),
            self.catalog.user_formats().len()
        );
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let layout: Layout = serde_json::from_str(json)?;
        self.import(layout)
    }

    pub fn read_layout<R: Read>(&mut self, reader: R) -> Result<(), ImportError> {
        let layout: Layout = serde_json::from_reader(reader)?;
        self.import(layout)
    }

    pub fn from_layout(layout: Layout, options: DocumentOptions) -> Result<Self, ImportError> {
        let mut doc = Self::with_options(0, options);
        doc.import(layout)?;
        Ok(doc)
    }
}

fn export_segment(tree: &SegmentTree, id: SegmentId) -> Option<SegmentRecord> {
    let segment = tree.get(id).ok()?;
    Some(SegmentRecord {
        name: segment.name().to_string(),
        start: segment.start(),
        end: segment.end(),
        display_format: segment.display_format().to_string(),
        format: segment.kind().as_format_str().to_string(),
        is_array_item: segment.is_array_item(),
        belong_struct: segment
            .belong_struct()
            .and_then(|root| tree.path_of(root).ok())
            .unwrap_or_default(),
        sub_segments: segment
            .children()
            .iter()
            .filter_map(|child| export_segment(tree, *child))
            .collect(),
    })
}

fn build(layout: Layout) -> Result<(SegmentTree, FormatCatalog), ImportError> {
    if layout.format_version > FORMAT_VERSION {
        return Err(ImportError::UnsupportedVersion(layout.format_version));
    }
    let mut catalog = FormatCatalog::new();

    let mut tree = SegmentTree::new();
    let mut memberships = Vec::new();
    for record in &layout.segments {
        let id = build_segment(&mut tree, &catalog, record, &mut memberships)?;
        tree.push_root(id)?;
    }
    if let Some(first) = tree.roots().first()
        && tree.get(*first)?.start() != 0
    {
        return Err(ImportError::MisalignedStart);
    }
    for (id, path) in memberships {
        let root = tree
            .resolve(&path)
            .map_err(|_| ImportError::DanglingPath(path.clone()))?;
        tree.get_mut(id)?.belong_struct = Some(root);
    }

    let mut user: Vec<FormatDescriptor> = Vec::with_capacity(layout.user_formats.len());
    for record in layout.user_formats {
        catalog.validate_new_label(&record.label)?;
        if user.iter().any(|f| f.label() == record.label) {
            return Err(CatalogError::DuplicateFormatName(record.label).into());
        }
        if record.min_bytes == 0 {
            return Err(ImportError::ZeroWidth(record.label));
        }
        let mut locations = Vec::with_capacity(record.locations.len());
        for path in &record.locations {
            let id = tree
                .resolve(path)
                .map_err(|_| ImportError::DanglingPath(path.clone()))?;
            locations.push(id);
        }
        user.push(FormatDescriptor::with_locations(
            record.label,
            record.min_bytes,
            locations,
        ));
    }
    catalog.replace_user_formats(user);

    invariants::check(&tree, &catalog)?;
    Ok((tree, catalog))
}

fn build_segment(
    tree: &mut SegmentTree,
    catalog: &FormatCatalog,
    record: &SegmentRecord,
    memberships: &mut Vec<(SegmentId, IndexPath)>,
) -> Result<SegmentId, ImportError> {
    let range = ByteRange::new(record.start, record.end).ok_or_else(|| ImportError::InvalidRange {
        name: record.name.clone(),
        start: record.start,
        end: record.end,
    })?;
    let kind = match SegmentKind::from_format_str(&record.format) {
        SegmentKind::Primitive(label) if !catalog.is_atom(&label) => {
            return Err(ImportError::UnknownFormat {
                name: record.name.clone(),
                format: label,
            });
        }
        SegmentKind::Array => {
            let (_, count) = parse_array_format(&record.display_format)
                .ok_or_else(|| ImportError::BadArrayFormat(record.name.clone()))?;
            if count != record.sub_segments.len() {
                return Err(ImportError::BadArrayFormat(record.name.clone()));
            }
            SegmentKind::Array
        }
        kind => kind,
    };

    let id = tree.alloc(Segment {
        display_format: record.display_format.clone(),
        kind,
        is_array_item: record.is_array_item,
        ..Segment::raw(record.name.clone(), range)
    });
    let mut children = Vec::with_capacity(record.sub_segments.len());
    for sub in &record.sub_segments {
        children.push(build_segment(tree, catalog, sub, memberships)?);
    }
    tree.replace_children(id, children)?;
    if !record.belong_struct.is_empty() {
        memberships.push((id, record.belong_struct.clone()));
    }
    Ok(id)
}
