//! Static disease knowledge base
//!
//! The knowledge base is a JSON array of disease records loaded once at
//! startup and shared read-only afterwards. Disease names are the primary key:
//! when a name repeats, the first record wins and later ones are dropped.

mod index;

pub use index::{SymptomIndex, DEFAULT_SUGGESTION_LIMIT, MIN_SUGGESTION_CHARS};

use crate::errors::{AppError, Result};
use crate::treatment::{TreatmentInfo, TreatmentParadigm};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// One disease record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseEntry {
    #[serde(rename = "Disease")]
    pub disease: String,

    #[serde(rename = "Category")]
    pub category: String,

    /// Comma/semicolon-delimited symptom description
    #[serde(rename = "Symptoms")]
    pub symptoms: String,

    #[serde(rename = "Ayurvedic_Treatment")]
    pub treatment_ayurvedic: String,

    #[serde(rename = "Homeopathic_Treatment")]
    pub treatment_homeopathic: String,

    #[serde(rename = "Allopathic_Treatment")]
    pub treatment_allopathic: String,
}

impl DiseaseEntry {
    /// Treatment text for one paradigm
    pub fn treatment(&self, paradigm: TreatmentParadigm) -> &str {
        match paradigm {
            TreatmentParadigm::Ayurvedic => &self.treatment_ayurvedic,
            TreatmentParadigm::Homeopathic => &self.treatment_homeopathic,
            TreatmentParadigm::Allopathic => &self.treatment_allopathic,
        }
    }

    /// Lower-cased symptom phrases, split on `,` and `;`, trimmed, empties removed
    pub fn symptom_phrases(&self) -> Vec<String> {
        split_symptom_text(&self.symptoms.to_lowercase())
    }
}

/// Split a symptom description into trimmed, non-empty phrases
pub(crate) fn split_symptom_text(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Immutable collection of disease records
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<DiseaseEntry>,
}

impl KnowledgeBase {
    /// Build from records, keeping the first record for each disease name
    pub fn from_entries(entries: Vec<DiseaseEntry>) -> Self {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut unique = Vec::with_capacity(entries.len());

        for entry in entries {
            if seen.insert(entry.disease.clone()) {
                unique.push(entry);
            } else {
                warn!(disease = %entry.disease, "Duplicate disease in knowledge base, keeping first");
            }
        }

        Self { entries: unique }
    }

    /// Parse a knowledge base from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<DiseaseEntry> = serde_json::from_str(json).map_err(|e| {
            AppError::KnowledgeBase {
                message: format!("Malformed knowledge base: {}", e),
            }
        })?;

        Ok(Self::from_entries(entries))
    }

    /// Load the knowledge base from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let json = std::fs::read_to_string(path).map_err(|e| AppError::KnowledgeBase {
            message: format!(
                "Knowledge base file not found or unreadable at {}: {}",
                path.display(),
                e
            ),
        })?;

        let kb = Self::from_json(&json)?;
        info!(path = %path.display(), diseases = kb.len(), "Knowledge base loaded");
        Ok(kb)
    }

    pub fn entries(&self) -> &[DiseaseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First record with exactly this disease name
    pub fn find(&self, disease: &str) -> Option<&DiseaseEntry> {
        self.entries.iter().find(|e| e.disease == disease)
    }

    /// Treatment information for a disease, if known
    pub fn treatment_info(&self, disease: &str) -> Option<TreatmentInfo> {
        self.find(disease).map(TreatmentInfo::from_entry)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(disease: &str, category: &str, symptoms: &str) -> DiseaseEntry {
        DiseaseEntry {
            disease: disease.to_string(),
            category: category.to_string(),
            symptoms: symptoms.to_string(),
            treatment_ayurvedic: format!("Ayurvedic care for {}", disease),
            treatment_homeopathic: format!("Homeopathic care for {}", disease),
            treatment_allopathic: format!("Allopathic care for {}", disease),
        }
    }

    pub fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::from_entries(vec![
            entry("Flu", "Respiratory", "Fever, Cough, Fatigue"),
            entry("Migraine", "Neurological", "Headache; Nausea; Sensitivity to light"),
            entry("Arthritis", "Musculoskeletal", "Joint pain, Swelling, Stiffness"),
            entry("Common Cold", "Respiratory", "Runny nose, Sore throat, Cough, Sneezing"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{entry, sample_kb};
    use super::*;
    use std::io::Write;

    const KB_JSON: &str = r#"[
        {
            "Disease": "Flu",
            "Category": "Respiratory",
            "Symptoms": "Fever, Cough, Fatigue",
            "Ayurvedic_Treatment": "Tulsi tea",
            "Homeopathic_Treatment": "Oscillococcinum",
            "Allopathic_Treatment": "Rest and paracetamol"
        }
    ]"#;

    #[test]
    fn test_parse_json_field_names() {
        let kb = KnowledgeBase::from_json(KB_JSON).unwrap();
        assert_eq!(kb.len(), 1);

        let flu = kb.find("Flu").unwrap();
        assert_eq!(flu.category, "Respiratory");
        assert_eq!(flu.treatment(TreatmentParadigm::Ayurvedic), "Tulsi tea");
        assert_eq!(flu.treatment(TreatmentParadigm::Allopathic), "Rest and paracetamol");
    }

    #[test]
    fn test_malformed_json_is_knowledge_base_error() {
        let err = KnowledgeBase::from_json(r#"[{"Disease": "Flu"}]"#).unwrap_err();
        assert!(matches!(err, AppError::KnowledgeBase { .. }));
    }

    #[test]
    fn test_missing_file_is_knowledge_base_error() {
        let err = KnowledgeBase::load("/definitely/not/here/kb.json").unwrap_err();
        assert!(matches!(err, AppError::KnowledgeBase { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KB_JSON.as_bytes()).unwrap();

        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert!(kb.find("Flu").is_some());
    }

    #[test]
    fn test_duplicate_disease_keeps_first() {
        let kb = KnowledgeBase::from_entries(vec![
            entry("Flu", "Respiratory", "fever"),
            entry("Flu", "Other", "rash"),
            entry("Migraine", "Neurological", "headache"),
        ]);

        assert_eq!(kb.len(), 2);
        assert_eq!(kb.find("Flu").unwrap().category, "Respiratory");
    }

    #[test]
    fn test_symptom_phrases() {
        let e = entry("X", "Y", "Fever ; Dry Cough,, fatigue ,");
        assert_eq!(e.symptom_phrases(), vec!["fever", "dry cough", "fatigue"]);
    }

    #[test]
    fn test_treatment_info_lookup() {
        let kb = sample_kb();
        let info = kb.treatment_info("Migraine").unwrap();
        assert_eq!(info.category, "Neurological");
        assert_eq!(info.treatment(TreatmentParadigm::Homeopathic), "Homeopathic care for Migraine");
        assert!(kb.treatment_info("migraine").is_none(), "lookup is exact");
    }
}
