mod highlighter;
mod keywords;
mod library;
mod style;

pub use highlighter::{highlight, Highlighter, TokenKind, TokenSpan};
pub use keywords::{KeywordMode, KeywordSet, DEFAULT_KEYWORDS};
pub use library::{find_node, insertion_text, library_catalog, CatalogNode};
pub use style::{parse_color, Color, ColorParseError, Palette, TokenStyle};
