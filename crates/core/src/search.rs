//! 純文字搜尋，位移以字元計。 / Plain-text search over character offsets.

use std::ops::Range;

/// 自 `from` 起找下一個符合處，找不到時從頭再找一次。
/// Finds the next occurrence at or after `from`, wrapping to the start of the text.
///
/// An empty needle never matches.
pub fn find_next(text: &str, from: usize, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let from_byte = byte_index(text, from);
    let found = text[from_byte..]
        .find(needle)
        .map(|index| from_byte + index)
        .or_else(|| text.find(needle))?;
    let start = text[..found].chars().count();
    Some(start..start + needle.chars().count())
}

/// 所有不重疊的符合處。 / Every non-overlapping occurrence, left to right.
pub fn find_all(text: &str, needle: &str) -> Vec<Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_len = needle.chars().count();
    let mut matches = Vec::new();
    let mut consumed_bytes = 0;
    let mut consumed_chars = 0;
    for (index, _) in text.match_indices(needle) {
        consumed_chars += text[consumed_bytes..index].chars().count();
        consumed_bytes = index;
        matches.push(consumed_chars..consumed_chars + needle_len);
    }
    matches
}

fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_from_offset_then_wraps() {
        let text = "输出(a);\n输出(b);";
        assert_eq!(find_next(text, 0, "输出"), Some(0..2));
        assert_eq!(find_next(text, 1, "输出"), Some(7..9));
        assert_eq!(find_next(text, 8, "输出"), Some(0..2));
        assert_eq!(find_next(text, 99, "(b)"), Some(9..12));
    }

    #[test]
    fn missing_or_empty_needle() {
        assert_eq!(find_next("如果", 0, "否则"), None);
        assert_eq!(find_next("如果", 0, ""), None);
        assert!(find_all("如果", "").is_empty());
    }

    #[test]
    fn find_all_counts_chars_not_bytes() {
        assert_eq!(find_all("甲a甲aa", "a"), vec![1..2, 3..4, 4..5]);
        assert_eq!(find_all("aaaa", "aa"), vec![0..2, 2..4]);
    }
}
