/// 行列位置（欄位以字元計）。 / Line/column position; columns count characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// 已排序的選取範圍，可為空（僅游標）。 / Ordered selection; an empty one is just a caret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    start: Position,
    end: Position,
}

impl Selection {
    /// 建立選取範圍，會自動排序兩端。 / Creates a selection with automatically ordered bounds.
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// 無選取的游標。 / A caret without selected text.
    pub fn caret(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 選取涵蓋的行；空選取時為游標所在行。 / Lines touched by the selection, or the caret line.
    pub fn line_range(&self) -> LineRange {
        LineRange::new(self.start.line, self.end.line)
    }
}

/// 含頭尾的行範圍。 / Inclusive range of line indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineRange {
    start: usize,
    end: usize,
}

impl LineRange {
    /// 建立行範圍，自動排序。 / Creates an ordered inclusive range.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// 單行範圍。 / Range covering a single line.
    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }

    /// 平移整個範圍。 / Shifts the range by a signed amount of lines.
    pub(crate) fn shifted(&self, delta: isize) -> Self {
        let start = (self.start as isize + delta).max(0) as usize;
        Self {
            start,
            end: start + self.len() - 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_orders_bounds() {
        let selection = Selection::new(Position::new(3, 1), Position::new(1, 4));
        assert_eq!(selection.start(), Position::new(1, 4));
        assert_eq!(selection.line_range(), LineRange::new(1, 3));
        assert!(Selection::caret(Position::new(2, 0)).is_empty());
    }

    #[test]
    fn line_range_shift_keeps_length() {
        let range = LineRange::new(2, 4);
        assert_eq!(range.shifted(-1), LineRange::new(1, 3));
        assert_eq!(range.shifted(2).len(), 3);
    }
}
