use pimsync_core::ExclusionsFile;

/// Case-insensitive substring denylist applied to upstream titles before
/// any persistence decision.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    needles: Vec<String>,
}

impl ExclusionFilter {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = entries
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { needles }
    }

    #[must_use]
    pub fn from_file(file: &ExclusionsFile) -> Self {
        Self::new(&file.exclusions)
    }

    #[must_use]
    pub fn should_exclude(&self, title: &str) -> bool {
        if self.needles.is_empty() {
            return false;
        }
        let haystack = title.to_lowercase();
        self.needles
            .iter()
            .any(|needle| haystack.contains(needle.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.needles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }
}
