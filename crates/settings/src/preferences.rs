use chplus_core::ConversionOptions;
use chplus_highlight::{parse_color, KeywordMode, KeywordSet, Palette, TokenKind};
use chplus_runexec::{RunRequest, DEFAULT_INTERPRETER};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::recent::RecentFiles;

const PREFERENCES_VERSION: u32 = 1;

pub const MIN_FONT_SIZE: u32 = 6;
pub const MAX_FONT_SIZE: u32 = 72;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// IDE 偏好設定。 / Persisted IDE preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub editor: EditorPreferences,
    #[serde(default)]
    pub conversion: ConversionPreferences,
    #[serde(default)]
    pub run: RunPreferences,
    #[serde(default)]
    pub keywords: KeywordPreferences,
    #[serde(default)]
    pub colors: ColorPreferences,
    #[serde(default)]
    pub recent_files: RecentFilesPreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            editor: EditorPreferences::default(),
            conversion: ConversionPreferences::default(),
            run: RunPreferences::default(),
            keywords: KeywordPreferences::default(),
            colors: ColorPreferences::default(),
            recent_files: RecentFilesPreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.editor.sanitize();
        self.run.sanitize();
        self.keywords.sanitize();
        self.colors.sanitize();
        self.recent_files.sanitize();
    }

    /// 依設定建立關鍵字集合。 / Keyword set after applying the custom list.
    pub fn keyword_set(&self) -> KeywordSet {
        if self.keywords.custom_enabled {
            KeywordSet::with_custom(&self.keywords.custom, self.keywords.mode)
        } else {
            KeywordSet::builtin()
        }
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            enabled: self.conversion.enabled,
            exclude_strings: self.conversion.exclude_strings,
        }
    }

    /// 以設定的顏色覆寫預設配色。 / Default palette with the configured token colours.
    pub fn palette(&self) -> Palette {
        let mut palette = Palette::default();
        for (kind, hex) in self.colors.token_colors() {
            if let Ok(color) = parse_color(hex) {
                palette.set_foreground(kind, color);
            }
        }
        palette
    }

    /// 為指定腳本建立執行請求。 / Run request for a script using the run section.
    pub fn run_request(&self, script: Option<&Path>) -> RunRequest {
        let mut request = RunRequest::new(self.run.interpreter.clone())
            .with_pause_on_exit(self.run.pause_on_exit);
        if let Some(script) = script {
            request = request.with_script(script);
        }
        if let Some(timeout_ms) = self.run.timeout_ms {
            request = request.with_timeout(Duration::from_millis(timeout_ms));
        }
        request
    }

    pub fn recent_files(&self) -> RecentFiles {
        RecentFiles::with_entries(
            self.recent_files.max_entries,
            self.recent_files.entries.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPreferences {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_tab_width")]
    pub tab_width: u32,
    #[serde(default = "default_true")]
    pub highlight_bracket: bool,
    #[serde(default)]
    pub auto_save_enabled: bool,
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_font_family() -> String {
    "Microsoft YaHei UI".to_string()
}

fn default_font_size() -> u32 {
    11
}

fn default_tab_width() -> u32 {
    4
}

fn default_auto_save_interval() -> u64 {
    300_000
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            tab_width: default_tab_width(),
            highlight_bracket: true,
            auto_save_enabled: false,
            auto_save_interval_ms: default_auto_save_interval(),
        }
    }
}

impl EditorPreferences {
    fn sanitize(&mut self) {
        if self.font_family.trim().is_empty() {
            self.font_family = default_font_family();
        }
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if self.tab_width == 0 {
            self.tab_width = default_tab_width();
        }
        self.tab_width = self.tab_width.min(16);
        if self.auto_save_interval_ms == 0 {
            self.auto_save_interval_ms = default_auto_save_interval();
        }
    }
}

/// 中文標點轉換。 / Chinese punctuation conversion on Enter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPreferences {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub exclude_strings: bool,
}

impl Default for ConversionPreferences {
    fn default() -> Self {
        Self {
            enabled: false,
            exclude_strings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPreferences {
    #[serde(default = "default_true")]
    pub clear_output: bool,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_true")]
    pub pause_on_exit: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

impl Default for RunPreferences {
    fn default() -> Self {
        Self {
            clear_output: true,
            interpreter: default_interpreter(),
            pause_on_exit: true,
            timeout_ms: None,
        }
    }
}

impl RunPreferences {
    fn sanitize(&mut self) {
        if self.interpreter.trim().is_empty() {
            self.interpreter = default_interpreter();
        }
        if self.timeout_ms == Some(0) {
            self.timeout_ms = None;
        }
    }
}

/// 自訂關鍵字。 / Custom keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPreferences {
    #[serde(default)]
    pub custom_enabled: bool,
    #[serde(default)]
    pub mode: KeywordMode,
    #[serde(default)]
    pub custom: Vec<String>,
}

impl KeywordPreferences {
    fn sanitize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.custom = self
            .custom
            .iter()
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty() && seen.insert(keyword.clone()))
            .collect();
    }
}

/// 顏色以 `#RRGGBB` 字串保存。 / Colours stored as `#RRGGBB` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPreferences {
    pub keyword: String,
    pub comment: String,
    pub string: String,
    pub number: String,
    pub operator: String,
    pub identifier: String,
    pub background: String,
    pub line_number: String,
    pub current_line: String,
    pub selection: String,
    pub cursor: String,
}

impl Default for ColorPreferences {
    fn default() -> Self {
        Self {
            keyword: "#0000FF".to_string(),
            comment: "#808080".to_string(),
            string: "#FF0000".to_string(),
            number: "#FF8C00".to_string(),
            operator: "#000000".to_string(),
            identifier: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            line_number: "#808080".to_string(),
            current_line: "#F0F8FF".to_string(),
            selection: "#ADD8E6".to_string(),
            cursor: "#000000".to_string(),
        }
    }
}

impl ColorPreferences {
    fn token_colors(&self) -> [(TokenKind, &str); 6] {
        [
            (TokenKind::Keyword, self.keyword.as_str()),
            (TokenKind::Comment, self.comment.as_str()),
            (TokenKind::String, self.string.as_str()),
            (TokenKind::Number, self.number.as_str()),
            (TokenKind::Operator, self.operator.as_str()),
            (TokenKind::Identifier, self.identifier.as_str()),
        ]
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        let fields = [
            (&mut self.keyword, defaults.keyword),
            (&mut self.comment, defaults.comment),
            (&mut self.string, defaults.string),
            (&mut self.number, defaults.number),
            (&mut self.operator, defaults.operator),
            (&mut self.identifier, defaults.identifier),
            (&mut self.background, defaults.background),
            (&mut self.line_number, defaults.line_number),
            (&mut self.current_line, defaults.current_line),
            (&mut self.selection, defaults.selection),
            (&mut self.cursor, defaults.cursor),
        ];
        for (value, fallback) in fields {
            match parse_color(value) {
                Ok(color) => *value = color.to_hex(),
                Err(err) => {
                    debug!(value = %value, %err, "invalid colour, using default");
                    *value = fallback;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFilesPreferences {
    #[serde(default = "default_recent_limit")]
    pub max_entries: usize,
    #[serde(default)]
    pub entries: Vec<PathBuf>,
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

impl Default for RecentFilesPreferences {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_RECENT_LIMIT,
            entries: Vec::new(),
        }
    }
}

impl RecentFilesPreferences {
    fn sanitize(&mut self) {
        if self.max_entries == 0 {
            self.max_entries = DEFAULT_RECENT_LIMIT;
        }
        let recent = RecentFiles::with_entries(self.max_entries, std::mem::take(&mut self.entries));
        self.entries = recent.iter().cloned().collect();
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, using defaults");
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let data = read_preferences(&path)?;
        info!(path = %path.display(), "loaded preferences");
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    /// 記錄最近開啟的檔案並儲存。 / Promotes a path in the recent list and saves.
    pub fn record_recent(&mut self, path: impl Into<PathBuf>) -> Result<(), PreferencesError> {
        let mut recent = self.data.recent_files();
        recent.add(path);
        self.data.recent_files.entries = recent.iter().cloned().collect();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        write_preferences(&self.path, &self.data, true)?;
        debug!(path = %self.path.display(), "saved preferences");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        write_preferences(path.as_ref(), &self.data, false)
    }

    pub fn import_from(&mut self, source: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let data = read_preferences(source.as_ref())?;
        self.backup_existing()?;
        self.data = data;
        self.save()
    }

    fn backup_existing(&self) -> Result<(), PreferencesError> {
        if self.path.exists() {
            let backup = self.path.with_extension("bak");
            fs::copy(&self.path, &backup).map_err(|source| PreferencesError::Write {
                path: backup,
                source,
            })?;
        }
        Ok(())
    }
}

fn read_preferences(path: &Path) -> Result<Preferences, PreferencesError> {
    let contents = fs::read_to_string(path).map_err(|source| PreferencesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut data: Preferences =
        serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    data.sanitize();
    Ok(data)
}

fn write_preferences(
    path: &Path,
    data: &Preferences,
    atomic: bool,
) -> Result<(), PreferencesError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let payload =
        serde_json::to_string_pretty(data).map_err(|source| PreferencesError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

    if !atomic {
        return fs::write(path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| PreferencesError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_colors_fall_back_to_defaults() {
        let mut prefs = Preferences::default();
        prefs.colors.keyword = "blue".to_string();
        prefs.colors.number = "#ff8c01".to_string();
        prefs.sanitize();
        assert_eq!(prefs.colors.keyword, "#0000FF");
        assert_eq!(prefs.colors.number, "#FF8C01");
    }

    #[test]
    fn font_size_is_clamped() {
        let mut prefs = Preferences::default();
        prefs.editor.font_size = 200;
        prefs.sanitize();
        assert_eq!(prefs.editor.font_size, MAX_FONT_SIZE);
        prefs.editor.font_size = 1;
        prefs.sanitize();
        assert_eq!(prefs.editor.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn custom_keywords_extend_or_replace() {
        let mut prefs = Preferences::default();
        prefs.keywords.custom = vec![" 循环 ".into(), "".into(), "循环".into()];
        assert!(!prefs.keyword_set().contains("循环"));

        prefs.keywords.custom_enabled = true;
        prefs.sanitize();
        assert_eq!(prefs.keywords.custom, vec!["循环".to_string()]);
        let extended = prefs.keyword_set();
        assert!(extended.contains("循环") && extended.contains("如果"));

        prefs.keywords.mode = KeywordMode::Replace;
        let replaced = prefs.keyword_set();
        assert_eq!(replaced.keywords(), ["循环".to_string()]);
    }

    #[test]
    fn run_request_follows_run_section() {
        let mut prefs = Preferences::default();
        prefs.run.pause_on_exit = false;
        prefs.run.timeout_ms = Some(500);
        let request = prefs.run_request(Some(Path::new("a.ch")));
        assert_eq!(request.command_line().unwrap(), ["chplus", "a.ch"]);
        assert_eq!(request.timeout_ms, Some(500));
        assert!(prefs.run_request(None).command_line().is_err());
    }

    #[test]
    fn palette_uses_configured_colors() {
        let mut prefs = Preferences::default();
        prefs.colors.string = "#123456".to_string();
        let palette = prefs.palette();
        assert_eq!(
            palette.style_for(TokenKind::String).foreground.to_hex(),
            "#123456"
        );
        assert!(palette.style_for(TokenKind::Keyword).bold);
    }
}
