use serde::{Deserialize, Serialize};

/// Messages the engine pushes out to the display collaborator.
///
/// Serialized with a `type` tag so hosts can forward them as JSON messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    /// A rejected precondition the user should see
    ShowWarningMessage { message: String },
    /// A struct or display format was defined, applied or cleared
    FormatChanged { label: String },
    /// The forest changed shape; re-render
    TreeChanged { version: u64 },
    /// The whole forest and catalog were swapped (import)
    TreeReplaced,
    /// Half-open byte ranges to select in the view
    SelectionChanged { ranges: Vec<std::ops::Range<u64>> },
    /// Scroll so that the row starting at `offset` is at the top
    ScrollTo { offset: u64 },
}

impl EditorEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        EditorEvent::ShowWarningMessage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_serializes_with_type_tag() {
        let event = EditorEvent::warning("nothing to split");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "ShowWarningMessage", "message": "nothing to split"})
        );
    }

    #[test]
    fn test_selection_event_round_trips() {
        let event = EditorEvent::SelectionChanged { ranges: vec![4..8] };
        let json = serde_json::to_string(&event).unwrap();
        let back: EditorEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
