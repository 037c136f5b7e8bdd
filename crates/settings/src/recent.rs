use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// 「最近打開」選單的檔案清單，最新者在前。 / Recently opened scripts, newest first, bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentFiles {
    limit: usize,
    entries: VecDeque<PathBuf>,
}

impl RecentFiles {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            entries: VecDeque::with_capacity(limit),
        }
    }

    /// 從設定檔還原；重複路徑只保留第一次出現。 / Restores persisted entries, keeping the first of any duplicates.
    pub fn with_entries(limit: usize, entries: Vec<PathBuf>) -> Self {
        let mut recent = Self::new(limit);
        for path in entries {
            if recent.entries.len() == recent.limit {
                break;
            }
            if !recent.contains(&path) {
                recent.entries.push_back(path);
            }
        }
        recent
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.entries.truncate(self.limit);
    }

    /// 開啟檔案時呼叫：移到最前面。 / Called when a file is opened; moves it to the front.
    pub fn add(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.entries.retain(|existing| existing != &path);
        self.entries.push_front(path);
        self.entries.truncate(self.limit);
    }

    /// 移除失效的路徑。 / Drops a path, e.g. one that no longer exists on disk.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|existing| existing.as_path() != path);
        before != self.entries.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|existing| existing.as_path() == path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(recent: &RecentFiles) -> Vec<&str> {
        recent.iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn reopening_moves_to_front_and_limit_evicts_oldest() {
        let mut recent = RecentFiles::new(3);
        for name in ["a.ch", "b.ch", "c.ch", "b.ch"] {
            recent.add(name);
        }
        assert_eq!(names(&recent), ["b.ch", "c.ch", "a.ch"]);

        recent.add("d.ch");
        assert_eq!(names(&recent), ["d.ch", "b.ch", "c.ch"]);
    }

    #[test]
    fn shrinking_limit_truncates() {
        let mut recent = RecentFiles::new(5);
        for name in ["a", "b", "c", "d"] {
            recent.add(name);
        }
        recent.set_limit(2);
        assert_eq!(names(&recent), ["d", "c"]);
        recent.set_limit(0);
        assert_eq!(recent.limit(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut recent = RecentFiles::new(3);
        recent.add("x");
        recent.add("y");
        assert!(recent.remove(Path::new("x")));
        assert!(!recent.remove(Path::new("missing")));
        assert!(recent.contains(Path::new("y")));
        recent.clear();
        assert!(recent.is_empty());
    }

    #[test]
    fn restoring_skips_duplicates_and_respects_limit() {
        let paths = ["a", "a", "b", "c"].into_iter().map(PathBuf::from).collect();
        let recent = RecentFiles::with_entries(2, paths);
        assert_eq!(names(&recent), ["a", "b"]);
        assert_eq!(recent.len(), 2);
    }
}
