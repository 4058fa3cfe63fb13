//! Markdown rendering of worksheet snapshots.
//!
//! The rendered table carries synthetic index headers: the header row lists
//! column positions and every data row is prefixed with its 1-based position
//! in the original snapshot. Rows without a meaningful cell are dropped, so
//! row indices in the output may skip values.

pub const EMPTY_SHEET_MESSAGE: &str = "Empty sheet, no data to display.";

const PREAMBLE: &str = "\
First row and column are index, so they are not part of the data.
Use as a reference to the data index in the sheet.
If row is empty, it will not show using index as reference

";

/// Returns true when `cell` keeps its row visible.
///
/// Blank text is not meaningful. Text that parses as an integer is
/// meaningful only when the integer is non-zero, so `"0"` and `"-00"` count
/// as empty.
pub fn is_cell_meaningful(cell: &str) -> bool {
    let trimmed = cell.trim();
    match parse_integer(trimmed) {
        Some(is_zero) => !is_zero && !trimmed.is_empty(),
        None => !trimmed.is_empty(),
    }
}

pub fn is_row_meaningful<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().any(|cell| is_cell_meaningful(cell.as_ref()))
}

/// Parses `text` as an integer literal and reports whether its value is zero.
///
/// Accepts an optional sign, single underscores between digits and any
/// Unicode decimal digit, so `"０"` and `"٠"` are zero. Returns `None` when
/// the text is not an integer literal. Width is unbounded.
fn parse_integer(text: &str) -> Option<bool> {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return None;
    }

    let mut is_zero = true;
    let mut previous_underscore = false;
    for ch in digits.chars() {
        match ch {
            '_' if previous_underscore => return None,
            '_' => previous_underscore = true,
            _ => {
                previous_underscore = false;
                if decimal_value(ch)? != 0 {
                    is_zero = false;
                }
            }
        }
    }
    Some(is_zero)
}

/// First code point (the zero) of every run of ten decimal digits
/// (general category Nd, Unicode 15.1), in ascending order.
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6,
    0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

/// Value of `ch` as a decimal digit in any script.
fn decimal_value(ch: char) -> Option<u32> {
    if let Some(value) = ch.to_digit(10) {
        return Some(value);
    }
    let code = u32::from(ch);
    let zero = match DECIMAL_ZEROS.binary_search(&code) {
        Ok(index) => DECIMAL_ZEROS[index],
        Err(0) => return None,
        Err(index) => DECIMAL_ZEROS[index - 1],
    };
    (code - zero < 10).then_some(code - zero)
}

/// Renders a worksheet snapshot as a Markdown table.
///
/// The header width comes from the first row only and data rows are emitted
/// with their own length; cell text is not escaped.
pub fn render_table<S: AsRef<str>>(grid: &[Vec<S>]) -> String {
    let Some(first_row) = grid.first() else {
        return EMPTY_SHEET_MESSAGE.to_string();
    };

    let mut table = String::from(PREAMBLE);

    let header = (1..first_row.len())
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(" | ");
    table.push_str("| Index | ");
    table.push_str(&header);
    table.push_str(" |\n");

    for (index, row) in grid.iter().enumerate() {
        if !is_row_meaningful(row) {
            continue;
        }
        let cells = row
            .iter()
            .map(|cell| cell.as_ref())
            .collect::<Vec<_>>()
            .join(" | ");
        table.push_str(&format!("| {} | {} |\n", index + 1, cells));
    }

    table
}
