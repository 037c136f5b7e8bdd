//! CH+ IDE 偏好設定與其 JSON 儲存。 / IDE preferences and their JSON-backed store.

pub mod preferences;
pub mod recent;

pub use preferences::{
    ColorPreferences, ConversionPreferences, EditorPreferences, KeywordPreferences, Preferences,
    PreferencesError, PreferencesStore, RecentFilesPreferences, RunPreferences,
    DEFAULT_RECENT_LIMIT, MAX_FONT_SIZE, MIN_FONT_SIZE,
};
pub use recent::RecentFiles;
