use std::collections::BTreeMap;

use crate::brackets::partner_of;
use crate::document::Document;
use crate::scan::LineScan;
use crate::selection::Position;

/// 可作為折疊起點的行尾符號。 / Trailing tokens that make a line foldable.
pub const FOLD_OPENERS: [char; 2] = ['{', '（'];

/// 已折疊的區塊：隱藏 `start_line + 1 ..= end_line`。 / A collapsed block hiding `start_line + 1 ..= end_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRecord {
    pub start_line: usize,
    pub end_line: usize,
}

impl FoldRecord {
    /// 此區塊是否隱藏指定行。 / Whether this record hides the given line.
    pub fn hides(&self, line: usize) -> bool {
        line > self.start_line && line <= self.end_line
    }
}

/// 切換折疊的結果。 / Result of a fold toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Folded(FoldRecord),
    Unfolded(FoldRecord),
    /// 行尾不是開括號。 / The line does not end with an opening brace.
    NotFoldable,
    /// 找不到對應的閉括號。 / No closing brace balances the header.
    Unmatched,
}

/// 文件的折疊狀態。 / Fold state of one document.
///
/// Records are independent of each other: a line is hidden while any record
/// covers it. Unfolding an outer block therefore leaves inner blocks that were
/// folded on their own still folded, with their header lines visible again.
#[derive(Debug, Default, Clone)]
pub struct FoldState {
    records: BTreeMap<usize, FoldRecord>,
}

impl FoldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 判斷行是否可折疊。 / A line is foldable when its trimmed text ends with an opening brace.
    pub fn is_foldable(line: &str) -> bool {
        line.trim_end()
            .chars()
            .last()
            .is_some_and(|ch| FOLD_OPENERS.contains(&ch))
    }

    /// 切換指定行的折疊狀態。 / Folds or unfolds the block headed by `line`.
    pub fn toggle(&mut self, document: &Document, line: usize) -> FoldOutcome {
        let Some(text) = document.line(line) else {
            return FoldOutcome::NotFoldable;
        };
        if !Self::is_foldable(text) {
            return FoldOutcome::NotFoldable;
        }
        if let Some(record) = self.records.remove(&line) {
            return FoldOutcome::Unfolded(record);
        }
        match closing_line(document, line) {
            Some(end_line) if end_line > line => {
                let record = FoldRecord {
                    start_line: line,
                    end_line,
                };
                self.records.insert(line, record);
                FoldOutcome::Folded(record)
            }
            _ => FoldOutcome::Unmatched,
        }
    }

    /// 指定行是否為已折疊區塊的起點。 / Whether a fold record starts at this line.
    pub fn is_folded(&self, line: usize) -> bool {
        self.records.contains_key(&line)
    }

    /// 檢查行是否可見。 / Checks whether the given line should be visible.
    pub fn is_line_visible(&self, line: usize) -> bool {
        !self.records.values().any(|record| record.hides(line))
    }

    /// 列出可見行。 / Enumerates visible lines up to the provided total.
    pub fn visible_lines(&self, total_lines: usize) -> Vec<usize> {
        (0..total_lines)
            .filter(|&line| self.is_line_visible(line))
            .collect()
    }

    /// 依起始行排序的折疊區塊。 / Fold records ordered by header line.
    pub fn records(&self) -> impl Iterator<Item = &FoldRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 展開全部。 / Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn closing_line(document: &Document, line: usize) -> Option<usize> {
    let text = document.text();
    let header = LineScan::new(document.line(line)?);
    let column = (0..header.len())
        .rev()
        .find(|&i| header.is_code(i) && FOLD_OPENERS.contains(&header.chars()[i]))?;
    let offset = document.offset_of(Position::new(line, column)).ok()?;
    let partner = partner_of(&text, offset)?;
    Some(document.position_of(partner).line)
}
