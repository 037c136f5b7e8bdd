use crate::document::{Document, EditError};
use crate::scan::LINE_COMMENT;
use crate::selection::{LineRange, Position, Selection};

/// 指定要進行大小寫轉換的模式。 / Enumerates supported case conversion transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTransform {
    Upper,
    Lower,
}

/// 切換註解時實際執行的動作。 / What a comment toggle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Commented,
    Uncommented,
}

/// 在選取行之後插入一份複本，回傳複本所在範圍。 / Inserts a copy right after the range and returns the copy's range.
pub fn duplicate_lines(document: &mut Document, range: LineRange) -> Result<LineRange, EditError> {
    let copy = document.slice(range)?.to_vec();
    let insert_at = range.end() + 1;
    document.lines_mut().splice(insert_at..insert_at, copy);
    Ok(range.shifted(range.len() as isize))
}

/// 刪除選取行，回傳游標應落在的行。 / Removes the lines and returns the line the caret should land on.
pub fn delete_lines(document: &mut Document, range: LineRange) -> Result<usize, EditError> {
    document.check_range(range)?;
    document.lines_mut().drain(range.start()..=range.end());
    document.ensure_non_empty();
    Ok(range.start().min(document.last_line()))
}

/// 與上一行交換；已在首行時不動作並回傳 `None`。 / Swaps the block with the line above; `None` at the top.
pub fn move_lines_up(
    document: &mut Document,
    range: LineRange,
) -> Result<Option<LineRange>, EditError> {
    document.check_range(range)?;
    if range.start() == 0 {
        return Ok(None);
    }
    let lines = document.lines_mut();
    let above = lines.remove(range.start() - 1);
    lines.insert(range.end(), above);
    Ok(Some(range.shifted(-1)))
}

/// 與下一行交換；已在末行時不動作並回傳 `None`。 / Swaps the block with the line below; `None` at the bottom.
pub fn move_lines_down(
    document: &mut Document,
    range: LineRange,
) -> Result<Option<LineRange>, EditError> {
    document.check_range(range)?;
    if range.end() == document.last_line() {
        return Ok(None);
    }
    let lines = document.lines_mut();
    let below = lines.remove(range.end() + 1);
    lines.insert(range.start(), below);
    Ok(Some(range.shifted(1)))
}

/// 行（去除前導空白後）是否以 `//` 開頭。 / Whether the line starts with `//` after leading whitespace.
pub fn is_commented(line: &str) -> bool {
    line.trim_start().starts_with(LINE_COMMENT)
}

/// 全部已註解則取消註解，否則補上註解。 / Uncomments when every line is commented, comments otherwise.
pub fn toggle_comment(
    document: &mut Document,
    range: LineRange,
) -> Result<CommentAction, EditError> {
    let all_commented = document
        .slice(range)?
        .iter()
        .all(|line| is_commented(line));
    if all_commented {
        uncomment_lines(document, range)?;
        Ok(CommentAction::Uncommented)
    } else {
        comment_lines(document, range)?;
        Ok(CommentAction::Commented)
    }
}

/// 在尚未註解的行首插入 `//`，回傳變更行數。 / Prepends `//` to lines lacking it; returns the number changed.
pub fn comment_lines(document: &mut Document, range: LineRange) -> Result<usize, EditError> {
    document.check_range(range)?;
    let mut changed = 0;
    for line in &mut document.lines_mut()[range.start()..=range.end()] {
        if !is_commented(line) {
            line.insert_str(0, LINE_COMMENT);
            changed += 1;
        }
    }
    Ok(changed)
}

/// 移除已註解行的第一個 `//`，回傳變更行數。 / Removes the first `//` of commented lines; returns the number changed.
pub fn uncomment_lines(document: &mut Document, range: LineRange) -> Result<usize, EditError> {
    document.check_range(range)?;
    let mut changed = 0;
    for line in &mut document.lines_mut()[range.start()..=range.end()] {
        if !is_commented(line) {
            continue;
        }
        if let Some(marker) = line.find(LINE_COMMENT) {
            line.replace_range(marker..marker + LINE_COMMENT.len(), "");
            changed += 1;
        }
    }
    Ok(changed)
}

/// 對選取文字進行大小寫轉換；無選取時不動作。 / Converts the case of the selected text only.
///
/// Returns the selection covering the converted text, or `None` when nothing
/// changed. Mappings such as `ß` to `SS` change the length of the text.
pub fn convert_case(
    document: &mut Document,
    selection: &Selection,
    transform: CaseTransform,
) -> Result<Option<Selection>, EditError> {
    if selection.is_empty() {
        return Ok(None);
    }
    let (start, end) = (selection.start(), selection.end());
    document.offset_of(start)?;
    document.offset_of(end)?;

    let mut changed = false;
    let mut end_column = end.column;
    for index in start.line..=end.line {
        let line = &mut document.lines_mut()[index];
        let chars: Vec<char> = line.chars().collect();
        let from = if index == start.line { start.column } else { 0 };
        let to = if index == end.line {
            end.column
        } else {
            chars.len()
        };
        let target: String = chars[from..to].iter().collect();
        let converted = match transform {
            CaseTransform::Upper => target.to_uppercase(),
            CaseTransform::Lower => target.to_lowercase(),
        };
        if converted != target {
            if index == end.line {
                end_column = end_column + converted.chars().count() - (to - from);
            }
            let rebuilt: String = chars[..from]
                .iter()
                .copied()
                .chain(converted.chars())
                .chain(chars[to..].iter().copied())
                .collect();
            *line = rebuilt;
            changed = true;
        }
    }
    Ok(changed.then(|| Selection::new(start, Position::new(end.line, end_column))))
}

/// 修剪所有行末尾的空白，回傳變更行數。 / Removes trailing whitespace on every line; returns lines changed.
pub fn trim_trailing_whitespace(document: &mut Document) -> usize {
    let mut trimmed = 0;
    for line in document.lines_mut().iter_mut() {
        let keep = line.trim_end().len();
        if keep < line.len() {
            line.truncate(keep);
            trimmed += 1;
        }
    }
    trimmed
}

/// 連續空白行只保留第一行，回傳刪除行數。 / Keeps the first line of each blank run; returns lines removed.
pub fn collapse_blank_lines(document: &mut Document) -> usize {
    let lines = document.lines_mut();
    let before = lines.len();
    let mut previous_blank = false;
    lines.retain(|line| {
        let blank = line.trim().is_empty();
        let keep = !(blank && previous_blank);
        previous_blank = blank;
        keep
    });
    before - lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: &[&str]) -> Document {
        Document::from_lines(lines.iter().copied())
    }

    #[test]
    fn duplicate_appends_copy_after_selection() {
        let mut document = doc(&["a", "b", "c"]);
        let copy = duplicate_lines(&mut document, LineRange::new(0, 1)).unwrap();
        assert_eq!(document.lines(), ["a", "b", "a", "b", "c"]);
        assert_eq!(copy, LineRange::new(2, 3));
    }

    #[test]
    fn delete_keeps_one_line() {
        let mut document = doc(&["a", "b"]);
        assert_eq!(delete_lines(&mut document, LineRange::new(0, 1)).unwrap(), 0);
        assert_eq!(document.lines(), [""]);
        assert!(delete_lines(&mut document, LineRange::single(3)).is_err());
    }

    #[test]
    fn move_lines_respects_boundaries() {
        let mut document = doc(&["a", "b", "c"]);
        assert_eq!(move_lines_up(&mut document, LineRange::single(0)).unwrap(), None);
        assert_eq!(move_lines_down(&mut document, LineRange::single(2)).unwrap(), None);
        assert_eq!(document.lines(), ["a", "b", "c"]);

        let moved = move_lines_down(&mut document, LineRange::new(0, 1)).unwrap();
        assert_eq!(document.lines(), ["c", "a", "b"]);
        assert_eq!(moved, Some(LineRange::new(1, 2)));

        let moved = move_lines_up(&mut document, LineRange::new(1, 2)).unwrap();
        assert_eq!(document.lines(), ["a", "b", "c"]);
        assert_eq!(moved, Some(LineRange::new(0, 1)));
    }

    #[test]
    fn toggle_comment_all_or_nothing() {
        let mut document = doc(&["  //a", "b"]);
        let action = toggle_comment(&mut document, LineRange::new(0, 1)).unwrap();
        assert_eq!(action, CommentAction::Commented);
        assert_eq!(document.lines(), ["  //a", "//b"]);

        let action = toggle_comment(&mut document, LineRange::new(0, 1)).unwrap();
        assert_eq!(action, CommentAction::Uncommented);
        assert_eq!(document.lines(), ["  a", "b"]);
    }

    #[test]
    fn toggle_comment_twice_restores_text() {
        let original = ["如果 (x) {", "    输出(x);", "}"];
        let mut document = doc(&original);
        let range = LineRange::new(0, 2);
        toggle_comment(&mut document, range).unwrap();
        assert!(document.lines().iter().all(|line| line.starts_with("//")));
        toggle_comment(&mut document, range).unwrap();
        assert_eq!(document.lines(), original);
    }

    #[test]
    fn case_conversion_touches_selection_only() {
        let mut document = doc(&["hello world", "abc"]);
        let selection = Selection::new(Position::new(0, 6), Position::new(1, 1));
        let converted = convert_case(&mut document, &selection, CaseTransform::Upper).unwrap();
        assert_eq!(converted, Some(selection));
        assert_eq!(document.lines(), ["hello WORLD", "Abc"]);

        let caret = Selection::caret(Position::new(0, 2));
        assert_eq!(
            convert_case(&mut document, &caret, CaseTransform::Lower).unwrap(),
            None
        );
    }

    #[test]
    fn case_conversion_reports_grown_selection() {
        let mut document = doc(&["straße ok"]);
        let selection = Selection::new(Position::new(0, 0), Position::new(0, 6));
        let converted = convert_case(&mut document, &selection, CaseTransform::Upper).unwrap();
        assert_eq!(document.lines(), ["STRASSE ok"]);
        assert_eq!(
            converted,
            Some(Selection::new(Position::new(0, 0), Position::new(0, 7)))
        );
    }

    #[test]
    fn trims_trailing_whitespace_including_full_width_space() {
        let mut document = doc(&["foo \t", "bar\u{3000}", "baz"]);
        assert_eq!(trim_trailing_whitespace(&mut document), 2);
        assert_eq!(document.lines(), ["foo", "bar", "baz"]);
    }

    #[test]
    fn collapses_blank_runs() {
        let mut document = doc(&["a", "", "", "b"]);
        assert_eq!(collapse_blank_lines(&mut document), 1);
        assert_eq!(document.lines(), ["a", "", "b"]);

        let mut untouched = doc(&["a", "b"]);
        assert_eq!(collapse_blank_lines(&mut untouched), 0);
        assert_eq!(untouched.lines(), ["a", "b"]);

        let mut spaces = doc(&["a", "  ", "\t", "", "b", " "]);
        collapse_blank_lines(&mut spaces);
        assert_eq!(spaces.lines(), ["a", "  ", "b", " "]);
    }
}
