use std::collections::BTreeSet;

use fillkit_aliases::normalize_text;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now",
    "old", "see", "two", "who", "did", "she", "use", "way", "what", "your", "with", "this",
    "that", "from", "have", "they", "will", "would", "there", "their", "please", "select",
    "choose", "enter", "other",
];

/// Lowercased content words of `text`: longer than two characters, not a
/// stopword and not purely numeric.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    normalize_text(text)
        .split(' ')
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .filter(|word| !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_content_words_only() {
        let words = extract_keywords("Please select your Senior (6-10) level in the team");
        let expected: BTreeSet<String> = ["senior", "level", "team"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract_keywords("  -- ").is_empty());
    }
}
