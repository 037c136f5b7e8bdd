use thiserror::Error;

use crate::selection::{LineRange, Position};

/// 編輯操作錯誤。 / Error conditions raised by document edits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("line {line} is out of bounds for document with {line_count} lines")]
    LineOutOfRange { line: usize, line_count: usize },
    #[error("position {line}:{column} is outside the document")]
    PositionOutOfRange { line: usize, column: usize },
}

/// 檔案的行尾格式。 / Line terminator used when the document is written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// 依第一個換行判斷。 / Decided by the first line break of the text.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(index) if text[..index].ends_with('\r') => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }
}

/// 以行為單位的文件模型，至少保留一行。 / Line-oriented document that always holds at least one line.
///
/// Lines are held without terminators; offsets and [`Document::text`] always
/// use `\n`. The detected [`LineEnding`] only matters for [`Document::to_file_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    line_ending: LineEnding,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            line_ending: LineEnding::Lf,
        }
    }
}

impl Document {
    /// 由原始文字建立文件，以 `\n` 分行並移除行尾 `\r`。 / Splits text on `\n`, dropping a trailing `\r` per line.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self {
            lines,
            line_ending: LineEnding::detect(text),
        }
    }

    /// 由行集合建立文件。 / Builds a document from owned lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self {
            lines,
            line_ending: LineEnding::Lf,
        }
    }

    /// 以 `\n` 串接所有行。 / Joins all lines with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// 以原檔行尾串接，供寫回檔案。 / Joins lines with the detected line ending, for writing back to disk.
    pub fn to_file_text(&self) -> String {
        self.lines.join(self.line_ending.as_str())
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, ending: LineEnding) {
        self.line_ending = ending;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// 最後一行的索引。 / Index of the last line.
    pub fn last_line(&self) -> usize {
        self.lines.len() - 1
    }

    /// 行的字元長度。 / Length of a line in characters.
    pub fn line_len(&self, index: usize) -> Option<usize> {
        self.lines.get(index).map(|line| line.chars().count())
    }

    /// 整份文件的字元數（含換行）。 / Total character count, newlines included.
    pub fn char_len(&self) -> usize {
        self.lines.iter().map(|line| line.chars().count()).sum::<usize>() + self.lines.len() - 1
    }

    /// 將行列位置轉為絕對字元偏移。 / Converts a position into an absolute character offset.
    pub fn offset_of(&self, position: Position) -> Result<usize, EditError> {
        let line_len = self.line_len(position.line).ok_or(EditError::PositionOutOfRange {
            line: position.line,
            column: position.column,
        })?;
        if position.column > line_len {
            return Err(EditError::PositionOutOfRange {
                line: position.line,
                column: position.column,
            });
        }
        let before: usize = self.lines[..position.line]
            .iter()
            .map(|line| line.chars().count() + 1)
            .sum();
        Ok(before + position.column)
    }

    /// 將絕對字元偏移轉為行列位置；超出範圍時夾到文件結尾。 / Converts an offset into a position, clamping to the end.
    pub fn position_of(&self, offset: usize) -> Position {
        let mut remaining = offset;
        for (index, line) in self.lines.iter().enumerate() {
            let len = line.chars().count();
            if remaining <= len {
                return Position::new(index, remaining);
            }
            remaining -= len + 1;
        }
        let last = self.last_line();
        Position::new(last, self.lines[last].chars().count())
    }

    /// 確認行範圍有效。 / Validates that the range lies within the document.
    pub fn check_range(&self, range: LineRange) -> Result<(), EditError> {
        if range.end() >= self.lines.len() {
            return Err(EditError::LineOutOfRange {
                line: range.end(),
                line_count: self.lines.len(),
            });
        }
        Ok(())
    }

    /// 取得範圍內的行。 / Returns the lines covered by the range.
    pub fn slice(&self, range: LineRange) -> Result<&[String], EditError> {
        self.check_range(range)?;
        Ok(&self.lines[range.start()..=range.end()])
    }

    pub fn set_line(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditError> {
        let line_count = self.lines.len();
        let slot = self.lines.get_mut(index).ok_or(EditError::LineOutOfRange {
            line: index,
            line_count,
        })?;
        *slot = text.into();
        Ok(())
    }

    /// 取出兩個位置之間的文字。 / Text between two positions, joined with `\n`.
    pub fn text_between(&self, start: Position, end: Position) -> Result<String, EditError> {
        let (start, end) = self.ordered(start, end)?;
        let text = self.text();
        let from = self.offset_of(start)?;
        let to = self.offset_of(end)?;
        Ok(text.chars().skip(from).take(to - from).collect())
    }

    /// 以新文字取代範圍，回傳插入文字結尾的位置。 / Replaces a range and returns the position right after the inserted text.
    pub fn replace_range(
        &mut self,
        start: Position,
        end: Position,
        replacement: &str,
    ) -> Result<Position, EditError> {
        let (start, end) = self.ordered(start, end)?;
        let head: String = self.lines[start.line].chars().take(start.column).collect();
        let tail: String = self.lines[end.line].chars().skip(end.column).collect();

        let mut inserted: Vec<String> = replacement
            .split('\n')
            .map(|part| part.strip_suffix('\r').unwrap_or(part).to_string())
            .collect();
        let last = inserted.len() - 1;
        let caret = Position::new(
            start.line + last,
            if last == 0 {
                start.column + inserted[0].chars().count()
            } else {
                inserted[last].chars().count()
            },
        );
        inserted[0].insert_str(0, &head);
        inserted[last].push_str(&tail);
        self.lines.splice(start.line..=end.line, inserted);
        Ok(caret)
    }

    fn ordered(&self, a: Position, b: Position) -> Result<(Position, Position), EditError> {
        self.offset_of(a)?;
        self.offset_of(b)?;
        Ok(if a <= b { (a, b) } else { (b, a) })
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    /// 還原「至少一行」的不變量。 / Restores the at-least-one-line invariant.
    pub(crate) fn ensure_non_empty(&mut self) {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_one_empty_line() {
        let doc = Document::from_text("");
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.line(0), Some(""));
        assert_eq!(Document::from_lines(Vec::<String>::new()).line_count(), 1);
    }

    #[test]
    fn crlf_is_normalized() {
        let doc = Document::from_text("如果 (x) {\r\n    输出(x);\r\n}");
        assert_eq!(doc.lines(), ["如果 (x) {", "    输出(x);", "}"]);
        assert_eq!(doc.text(), "如果 (x) {\n    输出(x);\n}");
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        assert_eq!(doc.to_file_text(), "如果 (x) {\r\n    输出(x);\r\n}");
    }

    #[test]
    fn line_ending_defaults_to_lf() {
        assert_eq!(LineEnding::detect("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("单行"), LineEnding::Lf);
        let mut doc = Document::from_text("a\nb");
        assert_eq!(doc.to_file_text(), "a\nb");
        doc.set_line_ending(LineEnding::CrLf);
        assert_eq!(doc.to_file_text(), "a\r\nb");
    }

    #[test]
    fn offsets_count_characters() {
        let doc = Document::from_text("定义 a\nb");
        assert_eq!(doc.offset_of(Position::new(1, 0)).unwrap(), 5);
        assert_eq!(doc.position_of(5), Position::new(1, 0));
        assert_eq!(doc.position_of(99), Position::new(1, 1));
        assert_eq!(doc.char_len(), 6);
        assert!(doc.offset_of(Position::new(0, 9)).is_err());
    }

    #[test]
    fn replace_range_spans_lines() {
        let mut doc = Document::from_text("abc\ndef\nghi");
        let caret = doc
            .replace_range(Position::new(0, 1), Position::new(2, 1), "X\nY")
            .unwrap();
        assert_eq!(doc.lines(), ["aX", "Yhi"]);
        assert_eq!(caret, Position::new(1, 1));

        let caret = doc
            .replace_range(Position::new(0, 2), Position::new(0, 2), "()")
            .unwrap();
        assert_eq!(doc.line(0), Some("aX()"));
        assert_eq!(caret, Position::new(0, 4));
    }

    #[test]
    fn text_between_orders_positions() {
        let doc = Document::from_text("如果 x\n输出");
        let text = doc
            .text_between(Position::new(1, 1), Position::new(0, 3))
            .unwrap();
        assert_eq!(text, "x\n输");
    }
}
