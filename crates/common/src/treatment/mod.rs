//! Treatment paradigms, views and disclaimers

use crate::errors::AppError;
use crate::knowledge::DiseaseEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shown next to every analysis result
pub const GENERAL_NOTICE: &str = "These potential conditions are based on symptom matching. \
The percentage shows how many of your symptoms match with the condition. \
This is not a medical diagnosis. Please consult a healthcare professional for proper diagnosis.";

/// The three medicine systems tracked per disease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentParadigm {
    Ayurvedic,
    Homeopathic,
    Allopathic,
}

impl TreatmentParadigm {
    pub const ALL: [TreatmentParadigm; 3] = [
        TreatmentParadigm::Ayurvedic,
        TreatmentParadigm::Homeopathic,
        TreatmentParadigm::Allopathic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TreatmentParadigm::Ayurvedic => "Ayurvedic",
            TreatmentParadigm::Homeopathic => "Homeopathic",
            TreatmentParadigm::Allopathic => "Allopathic",
        }
    }

    /// Paradigm-specific note displayed with the treatment text
    pub fn disclaimer(&self) -> &'static str {
        match self {
            TreatmentParadigm::Ayurvedic => {
                "These are general suggestions based on traditional Ayurvedic practices. \
                 The severity and duration of your symptoms matter, and if they persist or worsen, \
                 you should consult with a qualified healthcare professional or an Ayurvedic \
                 practitioner for personalized advice."
            }
            TreatmentParadigm::Homeopathic => {
                "These are general suggestions based on homeopathic principles. \
                 Homeopathic remedies are highly individualized, and their effectiveness may vary. \
                 If symptoms persist or worsen, please consult with a qualified homeopathic \
                 practitioner for a personalized treatment plan."
            }
            TreatmentParadigm::Allopathic => {
                "These are common over-the-counter recommendations. \
                 For proper diagnosis and treatment, especially if symptoms are severe or persistent, \
                 please consult with a qualified healthcare professional. \
                 Never self-medicate with prescription drugs."
            }
        }
    }
}

impl fmt::Display for TreatmentParadigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which paradigms to show for a selected disease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentView {
    #[default]
    All,
    Ayurvedic,
    Homeopathic,
    Allopathic,
}

impl TreatmentView {
    pub fn paradigms(&self) -> &'static [TreatmentParadigm] {
        match self {
            TreatmentView::All => &TreatmentParadigm::ALL,
            TreatmentView::Ayurvedic => &[TreatmentParadigm::Ayurvedic],
            TreatmentView::Homeopathic => &[TreatmentParadigm::Homeopathic],
            TreatmentView::Allopathic => &[TreatmentParadigm::Allopathic],
        }
    }
}

impl FromStr for TreatmentView {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TreatmentView::All),
            "ayurvedic" => Ok(TreatmentView::Ayurvedic),
            "homeopathic" => Ok(TreatmentView::Homeopathic),
            "allopathic" => Ok(TreatmentView::Allopathic),
            other => Err(AppError::InvalidFormat {
                message: format!(
                    "unknown treatment view '{}', expected all, ayurvedic, homeopathic or allopathic",
                    other
                ),
            }),
        }
    }
}

/// Treatment texts for one disease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentInfo {
    pub disease: String,
    pub category: String,
    pub symptoms: String,
    pub ayurvedic: String,
    pub homeopathic: String,
    pub allopathic: String,
}

impl TreatmentInfo {
    pub fn from_entry(entry: &DiseaseEntry) -> Self {
        Self {
            disease: entry.disease.clone(),
            category: entry.category.clone(),
            symptoms: entry.symptoms.clone(),
            ayurvedic: entry.treatment_ayurvedic.clone(),
            homeopathic: entry.treatment_homeopathic.clone(),
            allopathic: entry.treatment_allopathic.clone(),
        }
    }

    pub fn treatment(&self, paradigm: TreatmentParadigm) -> &str {
        match paradigm {
            TreatmentParadigm::Ayurvedic => &self.ayurvedic,
            TreatmentParadigm::Homeopathic => &self.homeopathic,
            TreatmentParadigm::Allopathic => &self.allopathic,
        }
    }
}
