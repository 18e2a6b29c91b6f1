//! Hex window state: the byte cursor, the selection and the scroll offset.

use std::ops::Range;

use hexformat_engine::{Dimensions, DisplayHost};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone)]
pub struct HexView {
    pub column_width: u64,
    pub file_size: u64,
    pub cursor: u64,
    /// Start of a keyboard selection, if one is being extended
    pub anchor: Option<u64>,
    selection: Vec<Range<u64>>,
    offset: u64,
    /// Updated on every draw; one terminal line per row
    dimensions: Dimensions,
}

impl HexView {
    pub fn new(file_size: u64, column_width: u64) -> Self {
        Self {
            column_width: column_width.max(1),
            file_size,
            cursor: 0,
            anchor: None,
            selection: vec![0..file_size.min(1)],
            offset: 0,
            dimensions: Dimensions::default(),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.dimensions = Dimensions {
            width: u64::from(width),
            height: u64::from(height),
            row_px_height: 1,
        };
    }

    /// Move the cursor by `delta` bytes, clamped to the file
    pub fn move_cursor(&mut self, delta: i64) {
        let last = self.file_size.saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.sync_selection();
        if !self.is_byte_visible(self.cursor) {
            let row = self.start_of_row_containing_byte(self.cursor);
            let rows = self.visible_rows().saturating_sub(1);
            // keep the cursor on the bottom row when scrolling down
            self.offset = if row < self.offset {
                row
            } else {
                row.saturating_sub(rows * self.column_width)
            };
        }
    }

    pub fn toggle_anchor(&mut self) {
        self.anchor = match self.anchor {
            Some(_) => None,
            None => Some(self.cursor),
        };
        self.sync_selection();
    }

    fn sync_selection(&mut self) {
        if self.file_size == 0 {
            self.selection = Vec::new();
            return;
        }
        let anchor = self.anchor.unwrap_or(self.cursor);
        let start = anchor.min(self.cursor);
        let end = anchor.max(self.cursor) + 1;
        self.selection = vec![start..end];
    }

    /// Data rows that fit, not counting the header row
    pub fn visible_rows(&self) -> u64 {
        self.dimensions
            .height
            .checked_div(self.dimensions.row_px_height)
            .unwrap_or(0)
            .saturating_sub(1)
    }

    fn is_selected(&self, byte: u64) -> bool {
        self.selection.iter().any(|range| range.contains(&byte))
    }

    /// Header plus one line per visible row of `bytes`
    pub fn render_lines(&self, bytes: &[u8]) -> Vec<Line<'static>> {
        let mut header = vec![Span::styled(
            format!("{:<12}", "offset"),
            Style::default().fg(Color::DarkGray),
        )];
        for column in 0..self.column_width {
            header.push(Span::styled(
                format!("{column:02x} "),
                Style::default().fg(Color::DarkGray),
            ));
        }
        let mut lines = vec![Line::from(header)];

        for row in 0..self.visible_rows() {
            let row_start = self.offset + row * self.column_width;
            if row_start >= self.file_size {
                break;
            }
            let row_end = (row_start + self.column_width).min(self.file_size);
            let mut spans = vec![Span::styled(
                format!("{row_start:010x}  "),
                Style::default().fg(Color::DarkGray),
            )];
            let mut ascii = String::new();
            for byte in row_start..row_end {
                let value = bytes.get(byte as usize).copied().unwrap_or(0);
                let mut style = Style::default();
                if self.is_selected(byte) {
                    style = style.bg(Color::Yellow).fg(Color::Black);
                }
                if byte == self.cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(format!("{value:02x}"), style));
                spans.push(Span::raw(" "));
                ascii.push(if value.is_ascii_graphic() || value == b' ' {
                    value as char
                } else {
                    '.'
                });
            }
            spans.push(Span::raw(" "));
            spans.push(Span::raw(ascii));
            lines.push(Line::from(spans));
        }
        lines
    }
}

impl DisplayHost for HexView {
    fn selection_ranges(&self) -> Vec<Range<u64>> {
        self.selection.clone()
    }

    fn set_selection_ranges(&mut self, ranges: Vec<Range<u64>>) {
        if let Some(first) = ranges.first() {
            self.cursor = first.start;
        }
        self.anchor = None;
        self.selection = ranges;
    }

    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn column_width(&self) -> u64 {
        self.column_width
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }
}
