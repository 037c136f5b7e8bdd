use crate::document::{Document, EditError};
use crate::scan::is_quote;
use crate::selection::{Position, Selection};

/// 輸入時自動補全的符號。 / Delimiters completed automatically while typing.
pub const AUTO_PAIRS: [(char, char); 5] =
    [('(', ')'), ('[', ']'), ('{', '}'), ('"', '"'), ('\'', '\'')];

/// 取得自動補全的閉合符號。 / Closing counterpart inserted for a typed delimiter.
pub fn pair_for(typed: char) -> Option<char> {
    AUTO_PAIRS
        .iter()
        .find(|(open, _)| *open == typed)
        .map(|(_, close)| *close)
}

/// 游標前的文字是否停在未閉合的字串中（只看最後一行）。 / Whether the text before the caret ends inside an open literal on its line.
pub fn is_in_string(text_before_cursor: &str) -> bool {
    let line = text_before_cursor
        .rsplit('\n')
        .next()
        .unwrap_or(text_before_cursor);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if is_quote(ch) => quote = Some(ch),
            None => {}
        }
    }
    quote.is_some()
}

/// 處理一次按鍵；回傳 `None` 表示照常輸入。 / Applies auto-pairing for one keystroke; `None` means insert the key normally.
///
/// Without a selection the pair is inserted and the caret lands between the two
/// delimiters. With a selection the selected text is wrapped and the caret lands
/// after the closing delimiter.
pub fn apply_auto_pair(
    document: &mut Document,
    selection: &Selection,
    typed: char,
) -> Result<Option<Selection>, EditError> {
    let Some(close) = pair_for(typed) else {
        return Ok(None);
    };
    let start = selection.start();
    let line = document.line(start.line).ok_or(EditError::PositionOutOfRange {
        line: start.line,
        column: start.column,
    })?;
    let before: String = line.chars().take(start.column).collect();
    if is_in_string(&before) {
        return Ok(None);
    }

    if selection.is_empty() {
        let pair: String = [typed, close].iter().collect();
        document.replace_range(start, start, &pair)?;
        let caret = Position::new(start.line, start.column + 1);
        return Ok(Some(Selection::caret(caret)));
    }

    let inner = document.text_between(start, selection.end())?;
    let wrapped = format!("{typed}{inner}{close}");
    let caret = document.replace_range(start, selection.end(), &wrapped)?;
    Ok(Some(Selection::caret(caret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_open_literal_before_caret() {
        assert!(is_in_string("输出(\"abc"));
        assert!(!is_in_string("输出(\"abc\""));
        assert!(is_in_string(r#"s = "a\"b"#));
        assert!(!is_in_string("s = 'a'\nx = "));
        assert!(!is_in_string(""));
    }

    #[test]
    fn inserts_pair_around_caret() {
        let mut doc = Document::from_text("输出");
        let caret = Selection::caret(Position::new(0, 2));
        let next = apply_auto_pair(&mut doc, &caret, '(').unwrap().unwrap();
        assert_eq!(doc.line(0), Some("输出()"));
        assert_eq!(next, Selection::caret(Position::new(0, 3)));
    }

    #[test]
    fn wraps_selection() {
        let mut doc = Document::from_text("a + b");
        let selection = Selection::new(Position::new(0, 0), Position::new(0, 5));
        let next = apply_auto_pair(&mut doc, &selection, '[').unwrap().unwrap();
        assert_eq!(doc.line(0), Some("[a + b]"));
        assert_eq!(next, Selection::caret(Position::new(0, 7)));
    }

    #[test]
    fn nothing_is_paired_inside_strings_or_for_other_keys() {
        let mut doc = Document::from_text("输出(\"ab");
        let caret = Selection::caret(Position::new(0, 5));
        assert_eq!(apply_auto_pair(&mut doc, &caret, '(').unwrap(), None);
        assert_eq!(apply_auto_pair(&mut doc, &caret, 'x').unwrap(), None);
        assert_eq!(doc.line(0), Some("输出(\"ab"));
    }
}
