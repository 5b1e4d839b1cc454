//! Personal-task classifier
//!
//! Pure pattern matching that decides whether a task needs research at all.
//! Runs before any network call so personal reminders never spend quota.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Title patterns for tasks that need no research, checked in order
static PERSONAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^call\s+(mom|dad|mum|mother|father|family|friend)",
        r"(?i)^text\s+",
        r"(?i)^remind\s+me\s+to\s+(breathe|relax|meditate)",
        r"(?i)^drink\s+water",
        r"(?i)^take\s+a\s+break",
        r"(?i)^go\s+to\s+(bed|sleep)",
        r"(?i)^eat\s+(breakfast|lunch|dinner)",
        r"(?i)^exercise",
        r"(?i)^workout",
        r"(?i)^think\s+about",
        r"(?i)^remember\s+to\s+(breathe|relax)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("personal-task pattern must compile"))
    .collect()
});

/// True if the trimmed title matches a personal-task pattern
pub fn is_personal_task(title: &str) -> bool {
    let title = title.trim();
    let personal = PERSONAL_PATTERNS.iter().any(|pattern| pattern.is_match(title));
    debug!(%title, personal, "is_personal_task: called");
    personal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_titles() {
        for title in [
            "Call mom tonight",
            "call Dad",
            "  CALL FAMILY about sunday",
            "Text Sarah",
            "Remind me to breathe",
            "remind me to meditate at noon",
            "Drink water",
            "Take a break",
            "go to sleep early",
            "Eat lunch",
            "Exercise",
            "workout 30 min",
            "Think about career",
            "Remember to relax",
        ] {
            assert!(is_personal_task(title), "expected personal: {title}");
        }
    }

    #[test]
    fn test_research_titles() {
        for title in [
            "Book dentist appointment",
            "Call the DMV",
            "Find flights to Denver",
            "Buy water filter",
            "I should call mom",
            "texting etiquette",
            "",
        ] {
            assert!(!is_personal_task(title), "expected research: {title}");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn personal_prefix_wins_regardless_of_suffix(suffix in "[a-zA-Z0-9 ]{0,40}") {
                let title = format!("call mom {}", suffix);
                prop_assert!(is_personal_task(&title));
            }

            #[test]
            fn case_and_padding_do_not_matter(pad in " {0,5}", upper in any::<bool>()) {
                let base = if upper { "DRINK WATER" } else { "drink water" };
                let title = format!("{}{}{}", pad, base, pad);
                prop_assert!(is_personal_task(&title));
            }
        }
    }
}
