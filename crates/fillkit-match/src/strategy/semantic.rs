use fillkit_profile::keywords::extract_keywords;
use fillkit_profile::{CanonicalProfile, LeafValue};
use fillkit_protocol::{FieldDescriptor, MatchMethod};

use super::direct::leaf_values;
use super::{best_candidate, detect_category, selectable, Candidate, Strategy};
use crate::similarity::{edit_ratio, jaccard, keyword_overlap};

/// Ceiling for semantic scores, keeping them below any exact category match.
const SEMANTIC_WEIGHT: f64 = 0.8;

/// Corpus-wide fallback for fields without a recognizable category: compare
/// every profile value with every option.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticStrategy;

impl Strategy for SemanticStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Semantic
    }

    fn attempt(&self, field: &FieldDescriptor, profile: &CanonicalProfile) -> Option<Candidate> {
        if let Some(category) = detect_category(field) {
            tracing::debug!(
                target: "fillkit::match",
                field = %field.key(),
                category = category.as_str(),
                "semantic stage skipped for categorized field"
            );
            return None;
        }

        let mut candidates = Vec::new();
        for (path, leaf) in profile.present() {
            if matches!(leaf.value, LeafValue::Bool(_)) {
                continue;
            }
            for value in leaf_values(leaf) {
                let keywords = extract_keywords(&value);
                for (index, option) in selectable(field) {
                    let ratio = edit_ratio(&value, &option.text);
                    let tokens = jaccard(&value, &option.text);
                    let overlap = keyword_overlap(&option.text, &keywords);
                    let sim = ratio.max(tokens).max(overlap);
                    if sim <= 0.0 {
                        continue;
                    }
                    candidates.push(Candidate::new(
                        index,
                        SEMANTIC_WEIGHT * sim * leaf.confidence,
                        format!(
                            "{path} = \"{value}\" resembles option \"{}\" (edit {ratio:.2}, tokens {tokens:.2}, keywords {overlap:.2})",
                            option.text
                        ),
                    ));
                }
            }
        }
        let best = best_candidate(candidates, &field.options);
        tracing::debug!(
            target: "fillkit::match",
            field = %field.key(),
            stage = "semantic",
            confidence = best.as_ref().map(|c| c.confidence).unwrap_or(0.0),
            "stage evaluated"
        );
        best
    }
}
