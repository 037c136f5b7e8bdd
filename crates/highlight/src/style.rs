use crate::highlighter::{TokenKind, TokenSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// 以 `#RRGGBB` 表示。 / Formats the colour as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("missing leading '#'")]
    MissingHash,
    #[error("expected 6 or 8 hex digits")]
    InvalidLength,
    #[error("contains non-hex digits")]
    InvalidHex,
}

/// 解析 `#RRGGBB` 或 `#RRGGBBAA`。 / Parses `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_color(input: &str) -> Result<Color, ColorParseError> {
    let hex = input
        .trim()
        .strip_prefix('#')
        .ok_or(ColorParseError::MissingHash)?;
    if !hex.is_ascii() {
        return Err(ColorParseError::InvalidHex);
    }
    if hex.len() != 6 && hex.len() != 8 {
        return Err(ColorParseError::InvalidLength);
    }
    let mut components = [255u8; 4];
    for (index, slot) in components.iter_mut().take(hex.len() / 2).enumerate() {
        let pair = &hex[index * 2..index * 2 + 2];
        *slot = u8::from_str_radix(pair, 16).map_err(|_| ColorParseError::InvalidHex)?;
    }
    Ok(Color {
        r: components[0],
        g: components[1],
        b: components[2],
        a: components[3],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStyle {
    pub foreground: Color,
    pub bold: bool,
    pub italic: bool,
}

impl TokenStyle {
    fn plain(foreground: Color) -> Self {
        Self {
            foreground,
            bold: false,
            italic: false,
        }
    }
}

/// 各語法分類的顯示樣式。 / Display style per token kind.
///
/// Keywords are bold and comments italic regardless of their colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    keyword: TokenStyle,
    comment: TokenStyle,
    string: TokenStyle,
    number: TokenStyle,
    operator: TokenStyle,
    identifier: TokenStyle,
    plain: TokenStyle,
}

impl Default for Palette {
    fn default() -> Self {
        let black = Color::rgb(0, 0, 0);
        Self {
            keyword: TokenStyle {
                bold: true,
                ..TokenStyle::plain(Color::rgb(0x00, 0x00, 0xFF))
            },
            comment: TokenStyle {
                italic: true,
                ..TokenStyle::plain(Color::rgb(0x80, 0x80, 0x80))
            },
            string: TokenStyle::plain(Color::rgb(0xFF, 0x00, 0x00)),
            number: TokenStyle::plain(Color::rgb(0xFF, 0x8C, 0x00)),
            operator: TokenStyle::plain(black),
            identifier: TokenStyle::plain(black),
            plain: TokenStyle::plain(black),
        }
    }
}

impl Palette {
    pub fn style_for(&self, kind: TokenKind) -> &TokenStyle {
        match kind {
            TokenKind::Keyword => &self.keyword,
            TokenKind::Comment => &self.comment,
            TokenKind::String => &self.string,
            TokenKind::Number => &self.number,
            TokenKind::Operator => &self.operator,
            TokenKind::Identifier => &self.identifier,
            TokenKind::Plain => &self.plain,
        }
    }

    /// 只替換前景色，保留粗體／斜體。 / Replaces the foreground of a kind, keeping its weight and slant.
    pub fn set_foreground(&mut self, kind: TokenKind, color: Color) {
        let style = match kind {
            TokenKind::Keyword => &mut self.keyword,
            TokenKind::Comment => &mut self.comment,
            TokenKind::String => &mut self.string,
            TokenKind::Number => &mut self.number,
            TokenKind::Operator => &mut self.operator,
            TokenKind::Identifier => &mut self.identifier,
            TokenKind::Plain => &mut self.plain,
        };
        style.foreground = color;
    }

    /// 以 ANSI 真彩色輸出一行。 / Renders one highlighted line with 24-bit ANSI escapes.
    pub fn render_ansi(&self, line: &str, segments: &[TokenSpan]) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut output = String::with_capacity(line.len() * 2);
        for segment in segments {
            let end = segment.end().min(chars.len());
            let start = segment.start.min(end);
            let text: String = chars[start..end].iter().collect();
            if segment.kind == TokenKind::Plain {
                output.push_str(&text);
                continue;
            }
            let style = self.style_for(segment.kind);
            let Color { r, g, b, .. } = style.foreground;
            output.push_str(&format!("\x1b[38;2;{r};{g};{b}m"));
            if style.bold {
                output.push_str("\x1b[1m");
            }
            if style.italic {
                output.push_str("\x1b[3m");
            }
            output.push_str(&text);
            output.push_str("\x1b[0m");
        }
        output
    }
}
