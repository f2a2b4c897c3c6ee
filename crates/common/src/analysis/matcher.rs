//! Disease matching
//!
//! Scores every knowledge base entry by the share of user symptoms it
//! mentions. Matching is substring based in both directions, so "pain"
//! matches "joint pain" and "severe headache" matches "headache". Short
//! inputs can produce false positives ("ear" inside "tear").

use crate::knowledge::{split_symptom_text, DiseaseEntry};
use serde::{Deserialize, Serialize};

/// One scored disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseMatch {
    pub disease: String,

    /// Percentage of user symptoms matched, in (0, 100]
    pub score: f64,

    pub category: String,

    /// Symptom text as recorded in the knowledge base
    pub full_symptoms: String,
}

/// Diseases ranked best-first
///
/// Ties keep knowledge base order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchResults(Vec<DiseaseMatch>);

impl MatchResults {
    pub fn iter(&self) -> std::slice::Iter<'_, DiseaseMatch> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, disease: &str) -> Option<&DiseaseMatch> {
        self.0.iter().find(|m| m.disease == disease)
    }

    pub fn contains(&self, disease: &str) -> bool {
        self.get(disease).is_some()
    }

    /// The best `n` matches
    pub fn top(&self, n: usize) -> &[DiseaseMatch] {
        &self.0[..n.min(self.0.len())]
    }
}

impl<'a> IntoIterator for &'a MatchResults {
    type Item = &'a DiseaseMatch;
    type IntoIter = std::slice::Iter<'a, DiseaseMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Score `entries` against user symptoms and rank the diseases that match
///
/// Symptoms are compared lower-cased and trimmed. Each user symptom counts at
/// most once per disease, so scores never exceed 100. An empty symptom list
/// yields no results.
pub fn find_diseases<S: AsRef<str>>(entries: &[DiseaseEntry], symptoms: &[S]) -> MatchResults {
    if symptoms.is_empty() {
        return MatchResults::default();
    }

    let user_symptoms: Vec<String> = symptoms
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .collect();
    let total = user_symptoms.len() as f64;

    let mut matches: Vec<DiseaseMatch> = entries
        .iter()
        .filter_map(|entry| {
            let matched = count_matches(entry, &user_symptoms);
            if matched == 0 {
                return None;
            }

            Some(DiseaseMatch {
                disease: entry.disease.clone(),
                score: matched as f64 / total * 100.0,
                category: entry.category.clone(),
                full_symptoms: entry.symptoms.clone(),
            })
        })
        .collect();

    // sort_by is stable: equal scores keep knowledge base order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));

    MatchResults(matches)
}

/// Number of user symptoms found in one entry's symptom text
fn count_matches(entry: &DiseaseEntry, user_symptoms: &[String]) -> usize {
    let text = entry.symptoms.to_lowercase();
    let phrases = split_symptom_text(&text);

    user_symptoms
        .iter()
        .filter(|symptom| {
            text.contains(symptom.as_str())
                || phrases
                    .iter()
                    .any(|phrase| phrase.contains(symptom.as_str()) || symptom.contains(phrase.as_str()))
        })
        .count()
}
