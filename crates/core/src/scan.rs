//! Line-level lexical scanning shared by the highlighter and the bracket matcher.
//! （高亮器與括號比對共用的單行詞法掃描。）
//!
//! String literals never span lines. A literal opens at `"` or `'`, honours
//! `\` escapes and closes at the next unescaped quote of the same kind; a quote
//! that never closes on its line does not produce a literal. A line comment
//! starts at the first `//` outside every literal and runs to end of line.

use std::ops::Range;

/// 行註解標記。 / Line comment marker.
pub const LINE_COMMENT: &str = "//";

/// 字串常值的引號。 / Characters that open and close a string literal.
pub const QUOTE_DELIMITERS: [char; 2] = ['"', '\''];

/// 單行掃描結果（索引皆以字元計）。 / Scan result of one line; all indices count characters.
#[derive(Debug, Clone)]
pub struct LineScan {
    chars: Vec<char>,
    strings: Vec<Range<usize>>,
    comment_start: Option<usize>,
}

impl LineScan {
    pub fn new(line: &str) -> Self {
        let chars: Vec<char> = line.chars().collect();
        let strings = string_spans_in(&chars);
        let comment_start = comment_start_in(&chars, &strings);
        Self {
            chars,
            strings,
            comment_start,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// 字串常值範圍（含引號）。 / String literal spans, quotes included.
    pub fn string_spans(&self) -> &[Range<usize>] {
        &self.strings
    }

    pub fn comment_start(&self) -> Option<usize> {
        self.comment_start
    }

    pub fn in_string(&self, index: usize) -> bool {
        self.string_at(index).is_some()
    }

    /// 包含該字元的字串範圍。 / The literal containing the character, if any.
    pub fn string_at(&self, index: usize) -> Option<Range<usize>> {
        self.strings
            .iter()
            .find(|span| span.contains(&index))
            .cloned()
    }

    pub fn in_comment(&self, index: usize) -> bool {
        self.comment_start.is_some_and(|start| index >= start)
    }

    /// 字元位於字串與註解之外。 / True when the character is outside literals and comments.
    pub fn is_code(&self, index: usize) -> bool {
        !self.in_string(index) && !self.in_comment(index)
    }
}

/// 找出一行中的字串常值範圍。 / Returns the string literal spans of one line.
pub fn string_spans(line: &str) -> Vec<Range<usize>> {
    let chars: Vec<char> = line.chars().collect();
    string_spans_in(&chars)
}

/// 找出字串外第一個 `//` 的位置。 / Index of the first `//` outside string literals.
pub fn comment_start(line: &str) -> Option<usize> {
    LineScan::new(line).comment_start()
}

/// 為整份文字建立「程式碼」遮罩；換行字元視為程式碼。 / Per-character code mask over a whole text.
pub fn code_mask(text: &str) -> Vec<bool> {
    let mut mask = Vec::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            mask.push(true);
        }
        let scan = LineScan::new(line);
        mask.extend((0..scan.len()).map(|i| scan.is_code(i)));
    }
    mask
}

fn string_spans_in(chars: &[char]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        if !is_quote(chars[index]) {
            index += 1;
            continue;
        }
        match closing_quote(chars, index) {
            Some(end) => {
                spans.push(index..end + 1);
                index = end + 1;
            }
            None => index += 1,
        }
    }
    spans
}

fn closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = chars[open];
    let mut cursor = open + 1;
    while cursor < chars.len() {
        match chars[cursor] {
            '\\' => cursor += 2,
            ch if ch == quote => return Some(cursor),
            _ => cursor += 1,
        }
    }
    None
}

fn comment_start_in(chars: &[char], strings: &[Range<usize>]) -> Option<usize> {
    chars.windows(2).enumerate().find_map(|(index, pair)| {
        let is_marker = pair[0] == '/' && pair[1] == '/';
        let inside = strings.iter().any(|span| span.contains(&index));
        (is_marker && !inside).then_some(index)
    })
}

pub(crate) fn is_quote(ch: char) -> bool {
    QUOTE_DELIMITERS.contains(&ch)
}
