//! Full-width punctuation normalisation（中文標點轉換）.

use crate::scan::is_quote;

/// 固定的標點對照表。 / Fixed punctuation table; full-width letters and digits are mapped arithmetically.
pub const PUNCTUATION_TABLE: [(char, char); 20] = [
    ('，', ','),
    ('。', '.'),
    ('；', ';'),
    ('：', ':'),
    ('！', '!'),
    ('？', '?'),
    ('（', '('),
    ('）', ')'),
    ('【', '['),
    ('】', ']'),
    ('｛', '{'),
    ('｝', '}'),
    ('《', '<'),
    ('》', '>'),
    ('、', ','),
    ('「', '\''),
    ('」', '\''),
    ('『', '"'),
    ('』', '"'),
    ('\u{3000}', ' '),
];

const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

/// 轉換開關。 / Switches controlling the Enter-key conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    pub enabled: bool,
    pub exclude_strings: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            exclude_strings: true,
        }
    }
}

/// 查詢單一字元的 ASCII 對應。 / ASCII replacement for one character, if it has one.
pub fn ascii_equivalent(ch: char) -> Option<char> {
    if let Some((_, ascii)) = PUNCTUATION_TABLE.iter().find(|(wide, _)| *wide == ch) {
        return Some(*ascii);
    }
    match ch {
        '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => char::from_u32(ch as u32 - FULL_WIDTH_OFFSET),
        _ => None,
    }
}

/// 將一行中的全形標點轉為 ASCII。 / Converts full-width punctuation on one line to ASCII.
///
/// With `exclude_strings`, characters inside `"`/`'` literals are copied through
/// untouched. A literal honours `\` escapes; an unterminated one extends to the
/// end of the line.
pub fn normalize_punctuation(line: &str, exclude_strings: bool) -> String {
    if !exclude_strings {
        return line
            .chars()
            .map(|ch| ascii_equivalent(ch).unwrap_or(ch))
            .collect();
    }

    let mut output = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(open) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == open {
                    quote = None;
                }
                output.push(ch);
            }
            None => {
                if is_quote(ch) {
                    quote = Some(ch);
                }
                output.push(ascii_equivalent(ch).unwrap_or(ch));
            }
        }
    }
    output
}

/// 按下 Enter 時的轉換：未啟用或無變化時回傳 `None`。 / Conversion applied on Enter; `None` when disabled or unchanged.
pub fn normalize_on_enter(line: &str, options: &ConversionOptions) -> Option<String> {
    if !options.enabled {
        return None;
    }
    let converted = normalize_punctuation(line, options.exclude_strings);
    (converted != line).then_some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_table_entries() {
        assert_eq!(normalize_punctuation("，", true), ",");
        assert_eq!(
            normalize_punctuation("如果（ａ＞１）｛输出《Ｘ》；｝", true),
            "如果(a＞1){输出<X>;}"
        );
        assert_eq!(normalize_punctuation("a\u{3000}b、c", false), "a b,c");
    }

    #[test]
    fn string_contents_are_preserved() {
        assert_eq!(normalize_punctuation("\"，\"", true), "\"，\"");
        assert_eq!(normalize_punctuation("\"，\"", false), "\",\"");
        assert_eq!(
            normalize_punctuation(r#"输出("a\"，"，'；')；"#, true),
            r#"输出("a\"，",'；');"#
        );
    }

    #[test]
    fn unterminated_string_runs_to_end_of_line() {
        assert_eq!(normalize_punctuation("x，\"abc，", true), "x,\"abc，");
    }

    #[test]
    fn quote_produced_by_mapping_does_not_open_a_string() {
        assert_eq!(normalize_punctuation("「，」", true), "','");
    }

    #[test]
    fn enter_policy_respects_switch() {
        let disabled = ConversionOptions::default();
        assert_eq!(normalize_on_enter("，", &disabled), None);

        let enabled = ConversionOptions {
            enabled: true,
            exclude_strings: true,
        };
        assert_eq!(normalize_on_enter("，", &enabled).as_deref(), Some(","));
        assert_eq!(normalize_on_enter("plain", &enabled), None);
    }
}
