//! Symptom index over the knowledge base
//!
//! Built once per knowledge base. Backs symptom autocompletion and the
//! symptom → disease lookups.

use super::KnowledgeBase;
use std::collections::BTreeMap;

/// Maximum suggestions returned when the caller does not ask for a limit
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Partial input shorter than this produces no suggestions
pub const MIN_SUGGESTION_CHARS: usize = 3;

/// Lookup tables derived from the knowledge base symptom text
#[derive(Debug, Clone, Default)]
pub struct SymptomIndex {
    /// Lower-cased phrase → diseases listing it, in knowledge base order
    symptom_map: BTreeMap<String, Vec<String>>,
}

impl SymptomIndex {
    pub fn build(kb: &KnowledgeBase) -> Self {
        let mut symptom_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in kb.entries() {
            for phrase in entry.symptom_phrases() {
                let diseases = symptom_map.entry(phrase).or_default();
                if !diseases.contains(&entry.disease) {
                    diseases.push(entry.disease.clone());
                }
            }
        }

        tracing::debug!(
            symptoms = symptom_map.len(),
            diseases = kb.len(),
            "Symptom index built"
        );

        Self { symptom_map }
    }

    /// Every distinct symptom phrase, sorted
    pub fn all_symptoms(&self) -> impl Iterator<Item = &str> {
        self.symptom_map.keys().map(String::as_str)
    }

    pub fn symptom_count(&self) -> usize {
        self.symptom_map.len()
    }

    /// Diseases whose symptom list contains exactly this phrase
    pub fn diseases_for(&self, symptom: &str) -> &[String] {
        self.symptom_map
            .get(&symptom.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Known symptoms containing `partial`, case-insensitively
    ///
    /// Input shorter than [`MIN_SUGGESTION_CHARS`] or containing a comma (a
    /// list, not a partial word) yields nothing.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let partial = partial.trim().to_lowercase();
        if partial.chars().count() < MIN_SUGGESTION_CHARS || partial.contains(',') {
            return Vec::new();
        }

        self.all_symptoms()
            .filter(|symptom| symptom.contains(&partial))
            .take(limit)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::fixtures::{entry, sample_kb};

    #[test]
    fn test_all_symptoms_unique_and_sorted() {
        let index = SymptomIndex::build(&sample_kb());
        let all: Vec<_> = index.all_symptoms().collect();

        let mut sorted = all.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(all, sorted);
        assert!(all.contains(&"cough"));
        assert!(all.contains(&"sensitivity to light"));
    }

    #[test]
    fn test_diseases_for_shared_symptom() {
        let index = SymptomIndex::build(&sample_kb());
        assert_eq!(index.diseases_for("Cough"), ["Flu", "Common Cold"]);
        assert!(index.diseases_for("itching").is_empty());
    }

    #[test]
    fn test_suggest_substring_case_insensitive() {
        let index = SymptomIndex::build(&sample_kb());
        let suggestions = index.suggest("THRO", DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(suggestions, vec!["sore throat"]);
    }

    #[test]
    fn test_suggest_respects_limit() {
        let kb = KnowledgeBase::from_entries(vec![entry(
            "Pains",
            "General",
            "back pain, chest pain, ear pain, joint pain, leg pain, neck pain, arm pain",
        )]);
        let index = SymptomIndex::build(&kb);

        assert_eq!(index.suggest("pain", DEFAULT_SUGGESTION_LIMIT).len(), 5);
        assert_eq!(index.suggest("pain", 2).len(), 2);
    }

    #[test]
    fn test_suggest_ignores_short_or_list_input() {
        let index = SymptomIndex::build(&sample_kb());
        assert!(index.suggest("co", DEFAULT_SUGGESTION_LIMIT).is_empty());
        assert!(index.suggest("cough, fev", DEFAULT_SUGGESTION_LIMIT).is_empty());
    }
}
