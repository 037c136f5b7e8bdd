use std::ops::Range;

use chplus_core::scan::LineScan;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::keywords::KeywordSet;

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9]+(?:\.[0-9]+)?\b").expect("built-in number regex must compile")
});

static OPERATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[=+\-*/<>!&|]+").expect("built-in operator regex must compile"));

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("built-in identifier regex must compile")
});

/// 語法分類。 / Syntax category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Keyword,
    Comment,
    String,
    Number,
    Operator,
    Identifier,
    Plain,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Comment => "comment",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Operator => "operator",
            TokenKind::Identifier => "identifier",
            TokenKind::Plain => "plain",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一段已分類的文字（字元偏移）。 / A classified run of one line, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub len: usize,
    pub kind: TokenKind,
}

impl TokenSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// 單行語法高亮器，保存目前的關鍵字設定。 / Per-line highlighter holding the active keyword configuration.
#[derive(Debug, Clone)]
pub struct Highlighter {
    keywords: KeywordSet,
    patterns: Vec<Vec<char>>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(KeywordSet::builtin())
    }
}

impl Highlighter {
    pub fn new(keywords: KeywordSet) -> Self {
        let patterns = keyword_patterns(&keywords);
        Self { keywords, patterns }
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// 更換關鍵字集合。 / Swaps the keyword configuration.
    pub fn set_keywords(&mut self, keywords: KeywordSet) {
        self.patterns = keyword_patterns(&keywords);
        self.keywords = keywords;
    }

    /// 高亮一行，省略一般文字。 / Classifies one line; plain text is left out.
    pub fn highlight_line(&self, line: &str) -> Vec<TokenSpan> {
        let mut spans = self.segments(line);
        spans.retain(|span| span.kind != TokenKind::Plain);
        spans
    }

    /// 完整覆蓋整行的分段，包含一般文字。 / Runs covering the whole line, plain text included.
    pub fn segments(&self, line: &str) -> Vec<TokenSpan> {
        merge_runs(&classify(line, &self.patterns))
    }
}

/// 以指定關鍵字集合高亮一行。 / Stateless entry point: highlights one line against a keyword set.
pub fn highlight(line: &str, keywords: &KeywordSet) -> Vec<TokenSpan> {
    let patterns = keyword_patterns(keywords);
    let mut spans = merge_runs(&classify(line, &patterns));
    spans.retain(|span| span.kind != TokenKind::Plain);
    spans
}

fn keyword_patterns(keywords: &KeywordSet) -> Vec<Vec<char>> {
    let mut patterns: Vec<Vec<char>> = keywords
        .keywords()
        .iter()
        .map(|keyword| keyword.chars().collect())
        .collect();
    // Longer keywords are applied later so they win on overlap.
    patterns.sort_by_key(Vec::len);
    patterns
}

struct LineText {
    scan: LineScan,
    byte_starts: Vec<usize>,
}

impl LineText {
    fn new(line: &str) -> Self {
        Self {
            scan: LineScan::new(line),
            byte_starts: line.char_indices().map(|(byte, _)| byte).collect(),
        }
    }

    fn char_range(&self, bytes: Range<usize>) -> Range<usize> {
        let at = |byte: usize| self.byte_starts.partition_point(|&start| start < byte);
        at(bytes.start)..at(bytes.end)
    }

    fn is_word(&self, index: usize) -> bool {
        self.scan
            .chars()
            .get(index)
            .is_some_and(|ch| ch.is_alphanumeric() || *ch == '_')
    }

    fn is_alphanumeric(&self, index: usize) -> bool {
        self.scan
            .chars()
            .get(index)
            .is_some_and(|ch| ch.is_alphanumeric())
    }
}

fn classify(line: &str, keywords: &[Vec<char>]) -> Vec<TokenKind> {
    let text = LineText::new(line);
    let scan = &text.scan;
    let mut kinds = vec![TokenKind::Plain; scan.len()];

    for span in scan.string_spans() {
        paint(&mut kinds, span.clone(), TokenKind::String);
    }

    for (regex, kind) in [
        (&*NUMBER_REGEX, TokenKind::Number),
        (&*OPERATOR_REGEX, TokenKind::Operator),
    ] {
        for found in regex.find_iter(line) {
            let range = text.char_range(found.range());
            if scan.is_code(range.start) {
                paint(&mut kinds, range, kind);
            }
        }
    }

    let chars = scan.chars();
    for keyword in keywords.iter().filter(|keyword| !keyword.is_empty()) {
        let width = keyword.len();
        if width > chars.len() {
            continue;
        }
        for start in 0..=chars.len() - width {
            if chars[start..start + width] != keyword[..] || !scan.is_code(start) {
                continue;
            }
            let bounded = (start == 0 || !text.is_alphanumeric(start - 1))
                && !text.is_alphanumeric(start + width);
            if bounded {
                paint(&mut kinds, start..start + width, TokenKind::Keyword);
            }
        }
    }

    for found in IDENTIFIER_REGEX.find_iter(line) {
        let range = text.char_range(found.range());
        let bounded =
            (range.start == 0 || !text.is_word(range.start - 1)) && !text.is_word(range.end);
        if !bounded || !scan.is_code(range.start) {
            continue;
        }
        if kinds[range.clone()].contains(&TokenKind::Keyword) {
            continue;
        }
        paint(&mut kinds, range, TokenKind::Identifier);
    }

    if let Some(start) = scan.comment_start() {
        paint(&mut kinds, start..scan.len(), TokenKind::Comment);
    }
    kinds
}

fn paint(kinds: &mut [TokenKind], range: Range<usize>, kind: TokenKind) {
    let end = range.end.min(kinds.len());
    let start = range.start.min(end);
    kinds[start..end].fill(kind);
}

fn merge_runs(kinds: &[TokenKind]) -> Vec<TokenSpan> {
    let mut spans: Vec<TokenSpan> = Vec::new();
    for (index, kind) in kinds.iter().enumerate() {
        match spans.last_mut() {
            Some(last) if last.kind == *kind => last.len += 1,
            _ => spans.push(TokenSpan {
                start: index,
                len: 1,
                kind: *kind,
            }),
        }
    }
    spans
}
