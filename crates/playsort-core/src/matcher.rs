use crate::models::PlaylistIndex;
use crate::rules::RuleSet;

/// Result of classifying a video title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    /// A rule matched and its keyword resolved to a playlist.
    Matched { playlist_id: String, keyword: String },
    /// No rule matched, or the matched keyword has no destination playlist.
    Unmatched,
}

impl ClassificationResult {
    pub fn playlist_id(&self) -> Option<&str> {
        match self {
            Self::Matched { playlist_id, .. } => Some(playlist_id),
            Self::Unmatched => None,
        }
    }

    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::Matched { keyword, .. } => Some(keyword),
            Self::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Classify a video title into a playlist.
///
/// Only the most specific matching keyword is resolved. If that keyword is
/// not contained in any playlist title the video stays unclassified.
pub fn classify_video(title: &str, rules: &RuleSet, playlists: &PlaylistIndex) -> ClassificationResult {
    let Some(rule) = rules.match_title(title) else {
        return ClassificationResult::Unmatched;
    };

    match playlists.resolve(&rule.keyword) {
        Some(playlist_id) => ClassificationResult::Matched {
            playlist_id: playlist_id.to_string(),
            keyword: rule.keyword.clone(),
        },
        None => {
            tracing::debug!(keyword = %rule.keyword, "Keyword matched but no playlist contains it");
            ClassificationResult::Unmatched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn rules(keywords: &[&str]) -> RuleSet {
        RuleSet::new(keywords.iter().map(|k| Rule::new(*k)))
    }

    fn index(entries: &[(&str, &str)]) -> PlaylistIndex {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_match() {
        let result = classify_video(
            "2026년 1월 14일 새벽예배 실황",
            &rules(&["새벽"]),
            &index(&[("2026 새벽예배 리스트", "PL_DAWN_ID"), ("주일예배", "PL_SUNDAY_ID")]),
        );
        assert_eq!(
            result,
            ClassificationResult::Matched {
                playlist_id: "PL_DAWN_ID".into(),
                keyword: "새벽".into(),
            }
        );
    }

    #[test]
    fn test_no_match() {
        let result = classify_video(
            "수요기도회 영상",
            &rules(&["주일"]),
            &index(&[("새벽예배", "PL_DAWN_ID")]),
        );
        assert_eq!(result, ClassificationResult::Unmatched);
        assert_eq!(result.playlist_id(), None);
        assert_eq!(result.keyword(), None);
    }

    #[test]
    fn test_keyword_without_playlist_is_unmatched() {
        let result = classify_video(
            "금요철야 성령집회",
            &rules(&["금요"]),
            &index(&[("새벽예배", "PL_DAWN_ID")]),
        );
        assert_eq!(result, ClassificationResult::Unmatched);
    }

    #[test]
    fn test_specific_keyword_without_playlist_does_not_fall_back() {
        // "주일 1부" wins the rule match; it has no playlist, so the video is
        // left alone rather than filed under the broader "주일" list.
        let result = classify_video(
            "주일1부예배",
            &rules(&["주일", "주일 1부"]),
            &index(&[("주일예배", "PL_GENERAL_ID")]),
        );
        assert_eq!(result, ClassificationResult::Unmatched);
    }

    #[test]
    fn test_whitespace_handling() {
        let result = classify_video(
            "예수산소망교회 주일2부예배(2026.01.11)",
            &rules(&["주일 2부"]),
            &index(&[("2026 주일 2부 예배", "PL_SUNDAY_2_ID")]),
        );
        assert_eq!(result.playlist_id(), Some("PL_SUNDAY_2_ID"));
        assert_eq!(result.keyword(), Some("주일 2부"));
    }

    #[test]
    fn test_case_insensitivity() {
        let result = classify_video(
            "Sunday Morning PRAISE",
            &rules(&["praise"]),
            &index(&[("Praise and Worship", "PL_PRAISE_ID")]),
        );
        assert_eq!(result.playlist_id(), Some("PL_PRAISE_ID"));
        assert_eq!(result.keyword(), Some("praise"));
    }

    #[test]
    fn test_longest_keyword_priority() {
        let result = classify_video(
            "예수산소망교회 주일1부예배",
            &rules(&["주일", "주일 1부"]),
            &index(&[("주일예배", "PL_GENERAL_ID"), ("2026 주일 1부 예배", "PL_PART1_ID")]),
        );
        assert_eq!(result.playlist_id(), Some("PL_PART1_ID"));
        assert_eq!(result.keyword(), Some("주일 1부"));
    }

    #[test]
    fn test_empty_rules() {
        let result = classify_video("새벽예배", &RuleSet::default(), &index(&[("새벽예배", "PL")]));
        assert!(!result.is_matched());
    }

    #[test]
    fn test_empty_index() {
        let result = classify_video("새벽예배", &rules(&["새벽"]), &PlaylistIndex::new());
        assert_eq!(result, ClassificationResult::Unmatched);
    }

    #[test]
    fn test_large_rule_set() {
        let rules = RuleSet::new((0..500).map(|i| Rule::new(format!("Keyword_{i}"))));
        let index: PlaylistIndex = (0..500)
            .map(|i| (format!("Playlist Title Keyword_{i}"), format!("PL_ID_{i}")))
            .collect();

        let result = classify_video("This video matches Keyword_499 specifically", &rules, &index);
        assert_eq!(result.playlist_id(), Some("PL_ID_499"));
        assert_eq!(result.keyword(), Some("Keyword_499"));
    }
}
