//! Diff engine toggles, in the teacher's builder-method style
//! (`CompareConfig::without_comments()`).

/// Controls which entity categories the engine compares. All categories
/// are on by default; callers narrow the comparison for specialized flows
/// (e.g. a CI hook that only cares about destructive table changes).
#[derive(Debug, Clone)]
pub struct DiffConfig {
    pub compare_indexes: bool,
    pub compare_foreign_keys: bool,
    pub compare_checks: bool,
    pub compare_attrs: bool,
    pub compare_views: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            compare_indexes: true,
            compare_foreign_keys: true,
            compare_checks: true,
            compare_attrs: true,
            compare_views: true,
        }
    }
}

impl DiffConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_indexes(mut self) -> Self {
        self.compare_indexes = false;
        self
    }

    pub fn without_foreign_keys(mut self) -> Self {
        self.compare_foreign_keys = false;
        self
    }

    pub fn without_checks(mut self) -> Self {
        self.compare_checks = false;
        self
    }

    pub fn without_attrs(mut self) -> Self {
        self.compare_attrs = false;
        self
    }

    pub fn without_views(mut self) -> Self {
        self.compare_views = false;
        self
    }
}
