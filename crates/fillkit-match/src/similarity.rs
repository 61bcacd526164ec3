//! String similarity scores in `[0, 1]`. All inputs are normalized with
//! [`normalize_text`] first, so case and punctuation never matter.

use std::collections::BTreeSet;

use fillkit_aliases::normalize_text;
use fillkit_profile::keywords::extract_keywords;

/// Classic edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// `(longer - distance) / longer` on normalized text; 1.0 for equal strings.
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let longer = a.chars().count().max(b.chars().count());
    (longer - levenshtein(&a, &b)) as f64 / longer as f64
}

fn tokens(text: &str) -> BTreeSet<String> {
    normalize_text(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token-set overlap: `|A ∩ B| / |A ∪ B|`.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Share of the option's content words that also occur in `known`.
pub fn keyword_overlap(option_text: &str, known: &BTreeSet<String>) -> f64 {
    let words = extract_keywords(option_text);
    if words.is_empty() {
        return 0.0;
    }
    words.iter().filter(|w| known.contains(*w)).count() as f64 / words.len() as f64
}

/// Best of edit ratio and Jaccard between two strings.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    edit_ratio(a, b).max(jaccard(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn ratio_ignores_case_and_punctuation() {
        assert_eq!(edit_ratio("U.S.A.", "usa"), 1.0);
        assert_eq!(edit_ratio("", "usa"), 0.0);
        let r = edit_ratio("Canada", "Canadian");
        assert!(r > 0.7 && r < 0.8, "{r}");
    }

    #[test]
    fn jaccard_counts_shared_tokens() {
        assert_eq!(jaccard("full time", "Full-time"), 1.0);
        assert_eq!(jaccard("part time", "full time"), 1.0 / 3.0);
        assert_eq!(jaccard("", ""), 0.0);
    }

    #[test]
    fn keyword_overlap_is_relative_to_option() {
        let known: BTreeSet<String> = ["senior", "engineer"].iter().map(|s| s.to_string()).collect();
        assert_eq!(keyword_overlap("Senior (6-10)", &known), 1.0);
        assert_eq!(keyword_overlap("Senior staff", &known), 0.5);
        assert_eq!(keyword_overlap("--", &known), 0.0);
    }

    #[test]
    fn scores_are_repeatable() {
        let a = text_similarity("Information Technology", "Technology");
        let b = text_similarity("Information Technology", "Technology");
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
