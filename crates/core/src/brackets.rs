use crate::scan::{code_mask, is_quote, LineScan};

/// 成對括號表。 / Paired bracket table.
pub const BRACKET_PAIRS: [(char, char); 4] = [('(', ')'), ('[', ']'), ('{', '}'), ('（', '）')];

/// 游標旁的分隔符及其配對位置（字元偏移）。 / A delimiter next to the cursor and its partner, as character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
    pub anchor: usize,
    pub partner: usize,
}

/// 依游標位置尋找配對括號：先看左側字元，再看右側。 / Finds the partner of the delimiter left of the cursor, else right of it.
///
/// Brackets inside string literals or comments are neither anchors nor counted
/// while scanning. A quote resolves to the other end of its literal.
pub fn find_matching_bracket(text: &str, cursor: usize) -> Option<BracketMatch> {
    let scan = DocumentScan::new(text);
    let anchor = if cursor > 0 && scan.is_delimiter(cursor - 1) {
        cursor - 1
    } else if scan.is_delimiter(cursor) {
        cursor
    } else {
        return None;
    };
    let partner = scan.partner(anchor)?;
    Some(BracketMatch { anchor, partner })
}

/// 解析指定位置上分隔符的配對位置。 / Resolves the partner of the delimiter at an exact index.
pub fn partner_of(text: &str, index: usize) -> Option<usize> {
    let scan = DocumentScan::new(text);
    if !scan.is_delimiter(index) {
        return None;
    }
    scan.partner(index)
}

/// 開括號對應的閉括號。 / Closing bracket for an opening one.
pub fn closing_for(open: char) -> Option<char> {
    BRACKET_PAIRS
        .iter()
        .find(|(candidate, _)| *candidate == open)
        .map(|(_, close)| *close)
}

/// 閉括號對應的開括號。 / Opening bracket for a closing one.
pub fn opening_for(close: char) -> Option<char> {
    BRACKET_PAIRS
        .iter()
        .find(|(_, candidate)| *candidate == close)
        .map(|(open, _)| *open)
}

struct DocumentScan {
    chars: Vec<char>,
    code: Vec<bool>,
    quote_partner: Vec<Option<usize>>,
}

impl DocumentScan {
    fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut quote_partner = Vec::with_capacity(text.len());
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                chars.push('\n');
                quote_partner.push(None);
            }
            let base = chars.len();
            let scan = LineScan::new(line);
            chars.extend_from_slice(scan.chars());
            quote_partner.resize(chars.len(), None);
            for span in scan.string_spans() {
                if scan.in_comment(span.start) {
                    continue;
                }
                let open = base + span.start;
                let close = base + span.end - 1;
                quote_partner[open] = Some(close);
                quote_partner[close] = Some(open);
            }
        }
        Self {
            chars,
            code: code_mask(text),
            quote_partner,
        }
    }

    fn is_delimiter(&self, index: usize) -> bool {
        let Some(&ch) = self.chars.get(index) else {
            return false;
        };
        if is_quote(ch) {
            return self.quote_partner[index].is_some();
        }
        self.code[index] && (closing_for(ch).is_some() || opening_for(ch).is_some())
    }

    fn partner(&self, index: usize) -> Option<usize> {
        let ch = self.chars[index];
        if is_quote(ch) {
            return self.quote_partner[index];
        }
        if let Some(close) = closing_for(ch) {
            return self.scan(index, ch, close, true);
        }
        let open = opening_for(ch)?;
        self.scan(index, ch, open, false)
    }

    fn scan(&self, from: usize, same: char, target: char, forward: bool) -> Option<usize> {
        let mut depth = 1usize;
        let mut step = |index: usize| -> Option<usize> {
            if !self.code[index] {
                return None;
            }
            let ch = self.chars[index];
            if ch == same {
                depth += 1;
            } else if ch == target {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            None
        };
        if forward {
            (from + 1..self.chars.len()).find_map(&mut step)
        } else {
            (0..from).rev().find_map(&mut step)
        }
    }
}
