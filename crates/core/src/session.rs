use std::collections::VecDeque;
use std::ops::Range;

use tracing::{debug, trace};

use crate::auto_pair::apply_auto_pair;
use crate::brackets::{find_matching_bracket, BracketMatch};
use crate::document::{Document, EditError};
use crate::folding::{FoldOutcome, FoldState};
use crate::line_ops::{self, CaseTransform, CommentAction};
use crate::punctuation::{normalize_on_enter, ConversionOptions};
use crate::search;
use crate::selection::{LineRange, Position, Selection};

/// 復原歷史的最大步數。 / Maximum number of undo steps kept.
pub const UNDO_DEPTH: usize = 100;

#[derive(Debug, Clone)]
struct Snapshot {
    document: Document,
    selection: Selection,
}

/// 單一文件的編輯工作階段。 / One document together with its selection, folds and history.
///
/// Every mutating call is a single undoable step. Any change to the text drops
/// all fold records, since their line numbers no longer describe the document.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    document: Document,
    selection: Selection,
    folds: FoldState,
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(Document::from_text(text))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn folds(&self) -> &FoldState {
        &self.folds
    }

    /// 設定選取範圍，位置必須在文件內。 / Sets the selection; both ends must lie inside the document.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditError> {
        self.document.offset_of(selection.start())?;
        self.document.offset_of(selection.end())?;
        self.selection = selection;
        Ok(())
    }

    /// 全選。 / Selects the whole document.
    pub fn select_all(&mut self) {
        let last = self.document.last_line();
        let end = Position::new(last, self.document.line_len(last).unwrap_or(0));
        self.selection = Selection::new(Position::default(), end);
    }

    /// 移動游標到指定行首。 / Moves the caret to the start of a line.
    pub fn goto_line(&mut self, line: usize) -> Result<(), EditError> {
        if line >= self.document.line_count() {
            return Err(EditError::LineOutOfRange {
                line,
                line_count: self.document.line_count(),
            });
        }
        self.selection = Selection::caret(Position::new(line, 0));
        Ok(())
    }

    /// 目前操作的行範圍：有選取時為選取行，否則為游標行。 / Lines an action applies to.
    pub fn target_lines(&self) -> LineRange {
        self.selection.line_range()
    }

    /// 游標旁的配對括號。 / Bracket pair next to the caret.
    pub fn matching_bracket(&self) -> Option<BracketMatch> {
        let cursor = self.document.offset_of(self.selection.end()).ok()?;
        find_matching_bracket(&self.document.text(), cursor)
    }

    /// 從游標（或選取終點）往後尋找並選取符合處，到底後從頭再找。
    /// Selects the next occurrence after the caret, wrapping to the top.
    pub fn find_next(&mut self, needle: &str) -> Option<Range<usize>> {
        let from = self.document.offset_of(self.selection.end()).ok()?;
        let found = search::find_next(&self.document.text(), from, needle)?;
        self.selection = Selection::new(
            self.document.position_of(found.start),
            self.document.position_of(found.end),
        );
        Some(found)
    }

    /// 全部取代，整體為一個復原步驟。 / Replaces every occurrence as one undoable step; returns the count.
    pub fn replace_all(&mut self, needle: &str, replacement: &str) -> Result<usize, EditError> {
        self.apply(|document, _| {
            let text = document.text();
            let count = search::find_all(&text, needle).len();
            if count == 0 {
                return Ok((0, None));
            }
            let last = document.last_line();
            let end = Position::new(last, document.line_len(last).unwrap_or(0));
            document.replace_range(Position::default(), end, &text.replace(needle, replacement))?;
            debug!(count, "replaced all occurrences");
            Ok((count, Some(Selection::default())))
        })
    }

    /// 以文字取代選取範圍。 / Replaces the selection with text.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        self.apply(|document, selection| {
            let caret = document.replace_range(selection.start(), selection.end(), text)?;
            Ok(((), Some(Selection::caret(caret))))
        })
    }

    /// 輸入單一字元，括號與引號會自動配對。 / Types one character, auto-pairing brackets and quotes.
    pub fn type_char(&mut self, typed: char) -> Result<(), EditError> {
        self.apply(|document, selection| {
            if let Some(next) = apply_auto_pair(document, selection, typed)? {
                return Ok(((), Some(next)));
            }
            let mut buffer = [0u8; 4];
            let caret = document.replace_range(
                selection.start(),
                selection.end(),
                typed.encode_utf8(&mut buffer),
            )?;
            Ok(((), Some(Selection::caret(caret))))
        })
    }

    /// 按下 Enter：視設定轉換目前行的標點，再換行。 / Enter key: optionally normalises the finished line, then breaks it.
    pub fn press_enter(&mut self, options: &ConversionOptions) -> Result<(), EditError> {
        self.apply(|document, selection| {
            let mut caret = selection.end();
            let line_text = document.line(caret.line).unwrap_or_default().to_string();
            if let Some(converted) = normalize_on_enter(&line_text, options) {
                document.set_line(caret.line, converted)?;
                caret = Position::new(caret.line, document.line_len(caret.line).unwrap_or(0));
            } else {
                caret = document.replace_range(selection.start(), selection.end(), "")?;
            }
            let caret = document.replace_range(caret, caret, "\n")?;
            Ok(((), Some(Selection::caret(caret))))
        })
    }

    pub fn duplicate_lines(&mut self) -> Result<LineRange, EditError> {
        self.apply(|document, selection| {
            let range = selection.line_range();
            let copy = line_ops::duplicate_lines(document, range)?;
            let delta = (copy.start() - range.start()) as isize;
            Ok((copy, Some(shift(selection, delta))))
        })
    }

    pub fn delete_lines(&mut self) -> Result<(), EditError> {
        self.apply(|document, selection| {
            let line = line_ops::delete_lines(document, selection.line_range())?;
            Ok(((), Some(Selection::caret(Position::new(line, 0)))))
        })
    }

    /// 上移選取行；已在首行時回傳 `false`。 / Moves the lines up; `false` at the top.
    pub fn move_lines_up(&mut self) -> Result<bool, EditError> {
        self.apply(|document, selection| {
            let moved = line_ops::move_lines_up(document, selection.line_range())?;
            Ok((moved.is_some(), moved.map(|_| shift(selection, -1))))
        })
    }

    /// 下移選取行；已在末行時回傳 `false`。 / Moves the lines down; `false` at the bottom.
    pub fn move_lines_down(&mut self) -> Result<bool, EditError> {
        self.apply(|document, selection| {
            let moved = line_ops::move_lines_down(document, selection.line_range())?;
            Ok((moved.is_some(), moved.map(|_| shift(selection, 1))))
        })
    }

    pub fn toggle_comment(&mut self) -> Result<CommentAction, EditError> {
        self.apply(|document, selection| {
            let action = line_ops::toggle_comment(document, selection.line_range())?;
            Ok((action, None))
        })
    }

    /// 轉換選取文字大小寫並重新選取結果。 / Converts the selection's case and reselects the result.
    pub fn convert_case(&mut self, transform: CaseTransform) -> Result<bool, EditError> {
        self.apply(|document, selection| {
            let converted = line_ops::convert_case(document, selection, transform)?;
            Ok((converted.is_some(), converted))
        })
    }

    pub fn trim_trailing_whitespace(&mut self) -> Result<usize, EditError> {
        self.apply(|document, _| Ok((line_ops::trim_trailing_whitespace(document), None)))
    }

    pub fn collapse_blank_lines(&mut self) -> Result<usize, EditError> {
        self.apply(|document, _| Ok((line_ops::collapse_blank_lines(document), None)))
    }

    /// 切換折疊；不影響復原歷史。 / Toggles a fold; folds are not part of the undo history.
    pub fn toggle_fold(&mut self, line: usize) -> FoldOutcome {
        let outcome = self.folds.toggle(&self.document, line);
        trace!(line, ?outcome, "toggled fold");
        outcome
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// 復原上一步；沒有歷史時回傳 `false`。 / Reverts the last step; `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        let current = self.restore(previous);
        self.redo.push(current);
        debug!(remaining = self.undo.len(), "undo");
        true
    }

    /// 重做。 / Re-applies the last undone step.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = self.restore(next);
        self.undo.push_back(current);
        debug!(remaining = self.redo.len(), "redo");
        true
    }

    fn restore(&mut self, snapshot: Snapshot) -> Snapshot {
        self.folds.clear();
        let document = std::mem::replace(&mut self.document, snapshot.document);
        let selection = std::mem::replace(&mut self.selection, snapshot.selection);
        Snapshot {
            document,
            selection,
        }
    }

    fn apply<T>(
        &mut self,
        operation: impl FnOnce(&mut Document, &Selection) -> Result<(T, Option<Selection>), EditError>,
    ) -> Result<T, EditError> {
        let before = Snapshot {
            document: self.document.clone(),
            selection: self.selection,
        };
        let (value, selection) = match operation(&mut self.document, &self.selection) {
            Ok(result) => result,
            Err(err) => {
                self.document = before.document;
                return Err(err);
            }
        };
        self.selection = clamp(&self.document, selection.unwrap_or(self.selection));
        if self.document != before.document {
            self.folds.clear();
            self.redo.clear();
            self.undo.push_back(before);
            if self.undo.len() > UNDO_DEPTH {
                self.undo.pop_front();
            }
            trace!(depth = self.undo.len(), "recorded edit");
        }
        Ok(value)
    }
}

fn shift(selection: &Selection, delta: isize) -> Selection {
    let move_line = |position: Position| {
        Position::new(
            (position.line as isize + delta).max(0) as usize,
            position.column,
        )
    };
    Selection::new(move_line(selection.start()), move_line(selection.end()))
}

fn clamp(document: &Document, selection: Selection) -> Selection {
    let clamp_position = |position: Position| {
        let line = position.line.min(document.last_line());
        let column = position.column.min(document.line_len(line).unwrap_or(0));
        Position::new(line, column)
    };
    Selection::new(
        clamp_position(selection.start()),
        clamp_position(selection.end()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_restores_text_after_each_transform() {
        let original = "如果 (x) {  \n\n\n    输出(x);\n}";
        let mut session = EditorSession::from_text(original);
        session.trim_trailing_whitespace().unwrap();
        session.collapse_blank_lines().unwrap();
        session.select_all();
        session.toggle_comment().unwrap();
        session.duplicate_lines().unwrap();

        while session.undo() {}
        assert_eq!(session.text(), original);
        assert!(session.redo());
        assert_eq!(session.text(), "如果 (x) {\n\n\n    输出(x);\n}");
    }

    #[test]
    fn history_is_bounded() {
        let mut session = EditorSession::from_text("");
        for _ in 0..UNDO_DEPTH + 5 {
            session.type_char('a').unwrap();
        }
        let mut steps = 0;
        while session.undo() {
            steps += 1;
        }
        assert_eq!(steps, UNDO_DEPTH);
        assert_eq!(session.text(), "a".repeat(5));
    }

    #[test]
    fn edits_clear_folds_but_no_op_moves_do_not() {
        let mut session = EditorSession::from_text("如果 (x) {\n    输出(x);\n}");
        assert!(matches!(session.toggle_fold(0), FoldOutcome::Folded(_)));
        session.goto_line(0).unwrap();
        assert!(!session.move_lines_up().unwrap());
        assert_eq!(session.folds().len(), 1);
        assert!(!session.can_undo());

        session.type_char('x').unwrap();
        assert!(session.folds().is_empty());
    }

    #[test]
    fn moving_lines_carries_selection() {
        let mut session = EditorSession::from_text("a\nb\nc");
        session.goto_line(1).unwrap();
        assert!(session.move_lines_down().unwrap());
        assert_eq!(session.text(), "a\nc\nb");
        assert_eq!(session.selection().start().line, 2);
        assert!(!session.move_lines_down().unwrap());
    }

    #[test]
    fn enter_normalises_finished_line() {
        let mut session = EditorSession::from_text("输出（1）；");
        session
            .set_selection(Selection::caret(Position::new(0, 6)))
            .unwrap();
        let options = ConversionOptions {
            enabled: true,
            exclude_strings: true,
        };
        session.press_enter(&options).unwrap();
        assert_eq!(session.text(), "输出(1);\n");
        assert_eq!(session.selection(), Selection::caret(Position::new(1, 0)));
        assert!(session.undo());
        assert_eq!(session.text(), "输出（1）；");
    }

    #[test]
    fn case_conversion_reselects_grown_text() {
        let mut session = EditorSession::from_text("straße;");
        session
            .set_selection(Selection::new(Position::new(0, 0), Position::new(0, 6)))
            .unwrap();
        assert!(session.convert_case(CaseTransform::Upper).unwrap());
        assert_eq!(session.text(), "STRASSE;");
        assert_eq!(
            session.selection(),
            Selection::new(Position::new(0, 0), Position::new(0, 7))
        );
        assert!(!session.convert_case(CaseTransform::Upper).unwrap());
    }

    #[test]
    fn find_next_walks_matches_and_wraps() {
        let mut session = EditorSession::from_text("输出(a);\n输出(b);");
        assert_eq!(session.find_next("输出"), Some(0..2));
        assert_eq!(session.find_next("输出"), Some(7..9));
        assert_eq!(
            session.selection(),
            Selection::new(Position::new(1, 0), Position::new(1, 2))
        );
        assert_eq!(session.find_next("输出"), Some(0..2));
        assert_eq!(session.find_next("否则"), None);
        assert_eq!(session.selection().start(), Position::new(0, 0));
    }

    #[test]
    fn replace_all_is_one_undo_step() {
        let original = "输出(a);\n输出(b);";
        let mut session = EditorSession::from_text(original);
        session.goto_line(1).unwrap();
        assert_eq!(session.replace_all("输出", "打印\n").unwrap(), 2);
        assert_eq!(session.text(), "打印\n(a);\n打印\n(b);");
        assert_eq!(session.selection(), Selection::default());
        assert!(session.undo());
        assert_eq!(session.text(), original);
        assert!(!session.can_undo());

        assert_eq!(session.replace_all("否则", "x").unwrap(), 0);
        assert_eq!(session.replace_all("", "x").unwrap(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn typing_pairs_and_matching() {
        let mut session = EditorSession::from_text("输出");
        session
            .set_selection(Selection::caret(Position::new(0, 2)))
            .unwrap();
        session.type_char('(').unwrap();
        assert_eq!(session.text(), "输出()");
        let found = session.matching_bracket().unwrap();
        assert_eq!(found, BracketMatch { anchor: 2, partner: 3 });
        assert!(session.goto_line(4).is_err());
    }
}
