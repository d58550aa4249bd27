//! Small text helpers shared by the assembler and layout.

/// Strip everything except ASCII letters and digits.
pub fn convert_to_alnum(text: &str) -> String {
    text.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Grafana row reference letter for the target at `index` (0 -> `A`).
pub fn ref_id(index: usize) -> String {
    let mut index = index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`ref_id`], `None` for anything that is not upper-case letters
/// or does not fit in a `usize`.
pub fn ref_index(ref_id: &str) -> Option<usize> {
    if ref_id.is_empty() || !ref_id.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let mut value = 0usize;
    for b in ref_id.bytes() {
        value = value
            .checked_mul(26)?
            .checked_add((b - b'A') as usize + 1)?;
    }
    Some(value - 1)
}

/// Names that may be joined into a library template path.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
