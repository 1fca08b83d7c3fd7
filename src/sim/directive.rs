//! Unlock-directive tokenizer.
//!
//! Patient replies may embed fixed bracketed markers that unlock clinical
//! data panels. [`extract`] scans the text once, collects the matched
//! categories, and strips every marker occurrence; the trimmed remainder is
//! what gets displayed and spoken. Pure function, no I/O.

use crate::sim::store::DataCategory;

/// Categories that can be unlocked mid-conversation. History is absent:
/// it is populated at session start, not via directive.
const UNLOCKABLE: [DataCategory; 3] = [
    DataCategory::Exam,
    DataCategory::Labs,
    DataCategory::Imaging,
];

/// Strip all directive markers from `raw`.
///
/// Returns the cleaned, trimmed text and the matched categories in order
/// of first appearance (duplicate markers are collapsed). A reply made of
/// markers only yields an empty clean text.
pub fn extract(raw: &str) -> (String, Vec<DataCategory>) {
    let mut clean = String::with_capacity(raw.len());
    let mut matched: Vec<DataCategory> = Vec::new();

    let mut rest = raw;
    'scan: while !rest.is_empty() {
        if rest.starts_with('[') {
            for category in UNLOCKABLE {
                let token = category
                    .unlock_token()
                    .expect("unlockable categories carry a token");
                if let Some(tail) = rest.strip_prefix(token) {
                    if !matched.contains(&category) {
                        matched.push(category);
                    }
                    rest = tail;
                    continue 'scan;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            clean.push(c);
            rest = chars.as_str();
        }
    }

    (clean.trim().to_string(), matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_passes_through_trimmed() {
        let (clean, matched) = extract("  It started near my belly button.  ");
        assert_eq!(clean, "It started near my belly button.");
        assert!(matched.is_empty());
    }

    #[test]
    fn directive_only_reply_yields_empty_text() {
        let (clean, matched) = extract("[UNLOCK_EXAM]");
        assert_eq!(clean, "");
        assert_eq!(matched, vec![DataCategory::Exam]);
    }

    #[test]
    fn trailing_directive_is_stripped() {
        let (clean, matched) = extract("It hurts on my lower right side. [UNLOCK_IMAGING]");
        assert_eq!(clean, "It hurts on my lower right side.");
        assert_eq!(matched, vec![DataCategory::Imaging]);
    }

    #[test]
    fn multiple_directives_in_one_reply() {
        let (clean, matched) = extract("[UNLOCK_LABS] Of course. [UNLOCK_IMAGING]");
        assert_eq!(clean, "Of course.");
        assert_eq!(matched, vec![DataCategory::Labs, DataCategory::Imaging]);
    }

    #[test]
    fn duplicate_markers_collapse() {
        let (clean, matched) = extract("[UNLOCK_EXAM][UNLOCK_EXAM] go ahead");
        assert_eq!(clean, "go ahead");
        assert_eq!(matched, vec![DataCategory::Exam]);
    }

    #[test]
    fn order_of_first_appearance_is_preserved() {
        let (_, matched) = extract("[UNLOCK_IMAGING] then [UNLOCK_EXAM] then [UNLOCK_IMAGING]");
        assert_eq!(matched, vec![DataCategory::Imaging, DataCategory::Exam]);
    }

    #[test]
    fn unknown_bracketed_text_is_kept() {
        let (clean, matched) = extract("[sighs] it really hurts");
        assert_eq!(clean, "[sighs] it really hurts");
        assert!(matched.is_empty());
    }

    #[test]
    fn marker_embedded_mid_sentence() {
        let (clean, matched) = extract("Sure, [UNLOCK_LABS] the nurse took blood earlier.");
        assert_eq!(clean, "Sure,  the nurse took blood earlier.");
        assert_eq!(matched, vec![DataCategory::Labs]);
    }

    #[test]
    fn strip_then_trim_equals_displayed_text() {
        // Clean text is exactly the raw reply with every token removed,
        // then trimmed.
        let raw = " [UNLOCK_EXAM]You can check.[UNLOCK_LABS] ";
        let (clean, _) = extract(raw);
        let manual = raw
            .replace("[UNLOCK_EXAM]", "")
            .replace("[UNLOCK_LABS]", "")
            .replace("[UNLOCK_IMAGING]", "");
        assert_eq!(clean, manual.trim());
    }

    #[test]
    fn empty_input() {
        let (clean, matched) = extract("");
        assert_eq!(clean, "");
        assert!(matched.is_empty());
    }
}
