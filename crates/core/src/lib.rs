pub mod auto_pair;
pub mod brackets;
pub mod document;
pub mod folding;
pub mod line_ops;
pub mod punctuation;
pub mod scan;
pub mod search;
pub mod selection;
pub mod session;

pub use auto_pair::{apply_auto_pair, is_in_string, pair_for, AUTO_PAIRS};
pub use brackets::{find_matching_bracket, partner_of, BracketMatch, BRACKET_PAIRS};
pub use document::{Document, EditError, LineEnding};
pub use folding::{FoldOutcome, FoldRecord, FoldState};
pub use line_ops::{
    collapse_blank_lines, comment_lines, convert_case, delete_lines, duplicate_lines,
    move_lines_down, move_lines_up, toggle_comment, trim_trailing_whitespace, uncomment_lines,
    CaseTransform, CommentAction,
};
pub use punctuation::{normalize_on_enter, normalize_punctuation, ConversionOptions};
pub use scan::{code_mask, LineScan, LINE_COMMENT, QUOTE_DELIMITERS};
pub use search::{find_all, find_next};
pub use selection::{LineRange, Position, Selection};
pub use session::{EditorSession, UNDO_DEPTH};
