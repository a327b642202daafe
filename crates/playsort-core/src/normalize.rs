//! Title normalization shared by rule matching and playlist resolution.
//!
//! Both sides of every substring comparison go through [`normalize`], so
//! "주일 2부" matches "주일2부" and "praise" matches "PRAISE".

/// Strip every Unicode whitespace character and lowercase the rest.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
