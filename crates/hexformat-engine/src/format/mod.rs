//! Format catalog: built-in primitive formats plus user-defined struct formats.
//!
//! User struct entries track every segment currently instantiating them. That
//! location list is what the propagation engine walks when one instance changes.

use std::sync::OnceLock;

use regex::Regex;

use crate::tree::{RAW, SegmentId, UNDEF_STRUCT};

/// Prefix of array display formats, `Array<label>[count]`
pub const ARRAY_PREFIX: &str = "Array<";

/// Display format of an array of `count` items of `label`
pub fn array_format(label: &str, count: usize) -> String {
    format!("{ARRAY_PREFIX}{label}>[{count}]")
}

/// Element label and item count of an `Array<label>[count]` display format
pub fn parse_array_format(display: &str) -> Option<(&str, usize)> {
    static ARRAY_REGEX: OnceLock<Regex> = OnceLock::new();
    let array_regex =
        ARRAY_REGEX.get_or_init(|| Regex::new(r"^Array<(.+)>\[(\d+)\]$").expect("Invalid array regex"));

    let captures = array_regex.captures(display)?;
    let label = captures.get(1)?.as_str();
    let count = captures.get(2)?.as_str().parse().ok()?;
    Some((label, count))
}

/// Primitive numeric formats and their widths in bytes
const BASE_FORMATS: &[(&str, u64)] = &[
    ("binary", 1),
    ("octal", 1),
    ("uint8", 1),
    ("int8", 1),
    ("uint16", 2),
    ("int16", 2),
    ("uint32", 4),
    ("int32", 4),
    ("uint64", 8),
    ("int64", 8),
    ("float32", 4),
    ("float64", 8),
];

/// Text encodings and their code-unit sizes
const TEXT_FORMATS: &[(&str, u64)] = &[("ASCII", 1), ("UTF-8", 1), ("UTF-16", 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Base,
    Text,
    Special,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    label: String,
    min_bytes: u64,
    /// Instances in registration order; only populated for user structs
    locations: Vec<SegmentId>,
}

impl FormatDescriptor {
    pub fn new(label: impl Into<String>, min_bytes: u64) -> Self {
        Self {
            label: label.into(),
            min_bytes,
            locations: Vec::new(),
        }
    }

    pub(crate) fn with_locations(label: impl Into<String>, min_bytes: u64, locations: Vec<SegmentId>) -> Self {
        Self {
            label: label.into(),
            min_bytes,
            locations,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    pub fn locations(&self) -> &[SegmentId] {
        &self.locations
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("format name \"{0}\" already exists")]
    DuplicateFormatName(String),
    #[error("\"{0}\" is not a valid format name")]
    InvalidFormatName(String),
    #[error("no struct format named \"{0}\"")]
    UnknownStruct(String),
}

fn builtin(table: &[(&str, u64)]) -> Vec<FormatDescriptor> {
    table
        .iter()
        .map(|(label, min_bytes)| FormatDescriptor::new(*label, *min_bytes))
        .collect()
}

/// Registry of every format label a segment can carry
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCatalog {
    base: Vec<FormatDescriptor>,
    text: Vec<FormatDescriptor>,
    special: Vec<FormatDescriptor>,
    user: Vec<FormatDescriptor>,
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatCatalog {
    pub fn new() -> Self {
        Self {
            base: builtin(BASE_FORMATS),
            text: builtin(TEXT_FORMATS),
            special: vec![FormatDescriptor::new(RAW, 1), FormatDescriptor::new(UNDEF_STRUCT, 1)],
            user: Vec::new(),
        }
    }

    pub fn user_formats(&self) -> &[FormatDescriptor] {
        &self.user
    }

    /// Base and text formats, the ones a leaf can be displayed as
    pub fn atom_formats(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.base.iter().chain(self.text.iter())
    }

    fn sections(&self) -> [(Section, &[FormatDescriptor]); 4] {
        [
            (Section::Base, self.base.as_slice()),
            (Section::Text, self.text.as_slice()),
            (Section::Special, self.special.as_slice()),
            (Section::User, self.user.as_slice()),
        ]
    }

    pub fn get(&self, label: &str) -> Option<&FormatDescriptor> {
        self.sections()
            .into_iter()
            .find_map(|(_, formats)| formats.iter().find(|f| f.label == label))
    }

    pub fn section_of(&self, label: &str) -> Option<Section> {
        self.sections()
            .into_iter()
            .find(|(_, formats)| formats.iter().any(|f| f.label == label))
            .map(|(section, _)| section)
    }

    pub fn is_atom(&self, label: &str) -> bool {
        matches!(self.section_of(label), Some(Section::Base | Section::Text))
    }

    pub fn user(&self, label: &str) -> Option<&FormatDescriptor> {
        self.user.iter().find(|f| f.label == label)
    }

    fn user_mut(&mut self, label: &str) -> Result<&mut FormatDescriptor, CatalogError> {
        self.user
            .iter_mut()
            .find(|f| f.label == label)
            .ok_or_else(|| CatalogError::UnknownStruct(label.to_string()))
    }

    /// Check a proposed struct name without registering it
    pub fn validate_new_label(&self, label: &str) -> Result<(), CatalogError> {
        if label.trim().is_empty() || label != label.trim() || label.starts_with(ARRAY_PREFIX) {
            return Err(CatalogError::InvalidFormatName(label.to_string()));
        }
        if self.get(label).is_some() {
            return Err(CatalogError::DuplicateFormatName(label.to_string()));
        }
        Ok(())
    }

    /// Add a user struct with its first instance
    pub fn register_struct(&mut self, label: &str, min_bytes: u64, location: SegmentId) -> Result<(), CatalogError> {
        self.validate_new_label(label)?;
        self.user
            .push(FormatDescriptor::with_locations(label, min_bytes, vec![location]));
        Ok(())
    }

    pub fn add_location(&mut self, label: &str, location: SegmentId) -> Result<(), CatalogError> {
        let format = self.user_mut(label)?;
        if !format.locations.contains(&location) {
            format.locations.push(location);
        }
        Ok(())
    }

    /// Drop one instance; the label itself is kept even when no instance remains
    pub fn remove_location(&mut self, label: &str, location: SegmentId) -> bool {
        let Ok(format) = self.user_mut(label) else {
            return false;
        };
        let before = format.locations.len();
        format.locations.retain(|l| *l != location);
        before != format.locations.len()
    }

    /// Forget any instance among `ids`, whichever struct it belonged to
    pub fn forget_locations(&mut self, ids: &[SegmentId]) {
        for format in &mut self.user {
            format.locations.retain(|l| !ids.contains(l));
        }
    }

    /// Formats a segment of `length` bytes can take: atoms whose width divides
    /// the length, and structs of exactly that length
    pub fn applicable(&self, length: u64) -> Vec<&FormatDescriptor> {
        let atoms = self
            .atom_formats()
            .filter(|f| length >= f.min_bytes && length % f.min_bytes == 0);
        let structs = self.user.iter().filter(|f| f.min_bytes == length);
        atoms.chain(structs).collect()
    }

    pub(crate) fn replace_user_formats(&mut self, user: Vec<FormatDescriptor>) {
        self.user = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::ByteRange;
    use crate::tree::{Segment, SegmentTree};
    use rstest::rstest;

    #[rstest]
    #[case("Array<uint16>[4]", Some(("uint16", 4)))]
    #[case("Array<Array<uint8>[2]>[3]", Some(("Array<uint8>[2]", 3)))]
    #[case("Array<uint16>", None)]
    #[case("uint16", None)]
    fn test_parse_array_format(#[case] display: &str, #[case] expected: Option<(&str, usize)>) {
        assert_eq!(parse_array_format(display), expected);
    }

    #[test]
    fn test_array_format_round_trips() {
        let display = array_format("Header", 12);
        assert_eq!(display, "Array<Header>[12]");
        assert_eq!(parse_array_format(&display), Some(("Header", 12)));
    }

    fn some_ids(count: usize) -> Vec<SegmentId> {
        let mut tree = SegmentTree::new();
        (0..count)
            .map(|i| tree.alloc(Segment::raw(format!("s{i}"), ByteRange::new(0, 7).unwrap())))
            .collect()
    }

    #[test]
    fn test_builtin_sections() {
        let catalog = FormatCatalog::new();
        assert_eq!(catalog.section_of("uint32"), Some(Section::Base));
        assert_eq!(catalog.section_of("UTF-16"), Some(Section::Text));
        assert_eq!(catalog.section_of("raw"), Some(Section::Special));
        assert_eq!(catalog.section_of("Header"), None);
        assert_eq!(catalog.get("UTF-16").map(|f| f.min_bytes()), Some(2));
        assert!(catalog.is_atom("float64"));
        assert!(!catalog.is_atom("undefStruct"));
    }

    #[rstest]
    #[case("uint8")]
    #[case("ASCII")]
    #[case("raw")]
    #[case("undefStruct")]
    fn test_builtin_names_collide(#[case] label: &str) {
        let catalog = FormatCatalog::new();
        assert_eq!(
            catalog.validate_new_label(label),
            Err(CatalogError::DuplicateFormatName(label.to_string()))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(" Header")]
    #[case("Array<uint8>[4]")]
    fn test_invalid_names(#[case] label: &str) {
        let catalog = FormatCatalog::new();
        assert_eq!(
            catalog.validate_new_label(label),
            Err(CatalogError::InvalidFormatName(label.to_string()))
        );
    }

    #[test]
    fn test_register_and_track_locations() {
        let ids = some_ids(3);
        let mut catalog = FormatCatalog::new();
        catalog.register_struct("Header", 8, ids[0]).unwrap();
        catalog.add_location("Header", ids[1]).unwrap();
        catalog.add_location("Header", ids[1]).unwrap();
        assert_eq!(catalog.user("Header").unwrap().locations(), &ids[..2]);

        assert_eq!(
            catalog.register_struct("Header", 8, ids[2]),
            Err(CatalogError::DuplicateFormatName("Header".to_string()))
        );
        assert_eq!(
            catalog.add_location("Missing", ids[2]),
            Err(CatalogError::UnknownStruct("Missing".to_string()))
        );
    }

    #[test]
    fn test_label_survives_last_location_removal() {
        let ids = some_ids(1);
        let mut catalog = FormatCatalog::new();
        catalog.register_struct("Header", 8, ids[0]).unwrap();
        assert!(catalog.remove_location("Header", ids[0]));
        assert!(!catalog.remove_location("Header", ids[0]));

        let header = catalog.user("Header").expect("label is never auto-deleted");
        assert!(header.locations().is_empty());
    }

    #[test]
    fn test_forget_locations_across_structs() {
        let ids = some_ids(3);
        let mut catalog = FormatCatalog::new();
        catalog.register_struct("A", 4, ids[0]).unwrap();
        catalog.register_struct("B", 4, ids[1]).unwrap();
        catalog.add_location("B", ids[2]).unwrap();
        catalog.forget_locations(&[ids[0], ids[2]]);
        assert!(catalog.user("A").unwrap().locations().is_empty());
        assert_eq!(catalog.user("B").unwrap().locations(), &[ids[1]]);
    }

    #[test]
    fn test_applicable_formats() {
        let ids = some_ids(1);
        let mut catalog = FormatCatalog::new();
        catalog.register_struct("Pair", 6, ids[0]).unwrap();

        let labels: Vec<&str> = catalog.applicable(6).iter().map(|f| f.label()).collect();
        assert!(labels.contains(&"uint16"));
        assert!(labels.contains(&"UTF-16"));
        assert!(labels.contains(&"Pair"));
        assert!(!labels.contains(&"uint32"));
        assert!(!labels.contains(&"raw"));

        let labels: Vec<&str> = catalog.applicable(1).iter().map(|f| f.label()).collect();
        assert!(!labels.contains(&"uint16"));
        assert!(!labels.contains(&"Pair"));
    }
}
