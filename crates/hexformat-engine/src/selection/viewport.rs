use serde::{Deserialize, Serialize};

/// Visible area of the hex view, in whatever unit the host measures rows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: u64,
    pub height: u64,
    pub row_px_height: u64,
}

/// Bytes shown at once; one row is reserved for the header
pub fn displayed_bytes(dimensions: Dimensions, column_width: u64) -> u64 {
    let rows = dimensions
        .height
        .checked_div(dimensions.row_px_height)
        .unwrap_or(0);
    column_width.saturating_mul(rows.saturating_sub(1))
}

pub fn is_byte_visible(dimensions: Dimensions, column_width: u64, offset: u64, byte: u64) -> bool {
    byte >= offset && byte - offset < displayed_bytes(dimensions, column_width)
}

pub fn start_of_row_containing_byte(byte: u64, column_width: u64) -> u64 {
    match byte.checked_rem(column_width) {
        Some(column) => byte - column,
        None => byte,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VIEW: Dimensions = Dimensions {
        width: 800,
        height: 110,
        row_px_height: 10,
    };

    #[test]
    fn test_displayed_bytes_skips_header_row() {
        assert_eq!(displayed_bytes(VIEW, 16), 160);
        assert_eq!(
            displayed_bytes(
                Dimensions {
                    height: 5,
                    ..VIEW
                },
                16
            ),
            0
        );
        assert_eq!(
            displayed_bytes(
                Dimensions {
                    row_px_height: 0,
                    ..VIEW
                },
                16
            ),
            0
        );
    }

    #[rstest]
    #[case(0, 0, true)]
    #[case(0, 159, true)]
    #[case(0, 160, false)]
    #[case(32, 16, false)]
    #[case(32, 191, true)]
    fn test_byte_visibility(#[case] offset: u64, #[case] byte: u64, #[case] expected: bool) {
        assert_eq!(is_byte_visible(VIEW, 16, offset, byte), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(15, 0)]
    #[case(16, 16)]
    #[case(37, 32)]
    fn test_start_of_row(#[case] byte: u64, #[case] expected: u64) {
        assert_eq!(start_of_row_containing_byte(byte, 16), expected);
        assert_eq!(start_of_row_containing_byte(byte, 0), byte);
    }
}
