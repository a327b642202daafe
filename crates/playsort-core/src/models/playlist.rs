use crate::normalize::normalize;

#[derive(Debug, Clone)]
struct Entry {
    title: String,
    normalized: String,
    id: String,
}

/// Playlist title → playlist id, in insertion order.
///
/// Iteration order is observable: [`PlaylistIndex::resolve`] returns the
/// first playlist whose title contains the keyword, so the index keeps the
/// order in which the catalog returned playlists. Titles are unique keys;
/// inserting an existing title replaces its id but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct PlaylistIndex {
    entries: Vec<Entry>,
}

impl PlaylistIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a playlist. Returns the previous id for `title`.
    pub fn insert(&mut self, title: impl Into<String>, id: impl Into<String>) -> Option<String> {
        let title = title.into();
        let id = id.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.title == title) {
            return Some(std::mem::replace(&mut entry.id, id));
        }
        self.entries.push(Entry {
            normalized: normalize(&title),
            title,
            id,
        });
        None
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.title == title)
            .map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(title, id)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.title.as_str(), e.id.as_str()))
    }

    /// Id of the first playlist whose normalized title contains the
    /// normalized `keyword`.
    pub fn resolve(&self, keyword: &str) -> Option<&str> {
        let needle = normalize(keyword);
        self.entries
            .iter()
            .find(|e| e.normalized.contains(&needle))
            .map(|e| e.id.as_str())
    }
}

impl<T: Into<String>, I: Into<String>> FromIterator<(T, I)> for PlaylistIndex {
    fn from_iter<It: IntoIterator<Item = (T, I)>>(iter: It) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<T: Into<String>, I: Into<String>> Extend<(T, I)> for PlaylistIndex {
    fn extend<It: IntoIterator<Item = (T, I)>>(&mut self, iter: It) {
        for (title, id) in iter {
            self.insert(title, id);
        }
    }
}
