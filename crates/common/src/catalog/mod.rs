//! Fixed symptom lists offered to users before they type anything

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quick-pick checklist
pub const COMMON_SYMPTOMS: [&str; 17] = [
    "Fever",
    "Headache",
    "Cough",
    "Fatigue",
    "Sore throat",
    "Runny nose",
    "Nausea",
    "Joint pain",
    "Abdominal pain",
    "Chest pain",
    "Shortness of breath",
    "Dizziness",
    "Rash",
    "Swelling",
    "Anxiety",
    "Depression",
    "Insomnia",
];

/// Body areas with a short list of likely symptoms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyRegion {
    Head,
    Throat,
    Chest,
    Abdomen,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Back,
}

impl BodyRegion {
    pub const ALL: [BodyRegion; 9] = [
        BodyRegion::Head,
        BodyRegion::Throat,
        BodyRegion::Chest,
        BodyRegion::Abdomen,
        BodyRegion::LeftArm,
        BodyRegion::RightArm,
        BodyRegion::LeftLeg,
        BodyRegion::RightLeg,
        BodyRegion::Back,
    ];

    /// Kebab-case identifier
    pub fn id(&self) -> &'static str {
        match self {
            BodyRegion::Head => "head",
            BodyRegion::Throat => "throat",
            BodyRegion::Chest => "chest",
            BodyRegion::Abdomen => "abdomen",
            BodyRegion::LeftArm => "left-arm",
            BodyRegion::RightArm => "right-arm",
            BodyRegion::LeftLeg => "left-leg",
            BodyRegion::RightLeg => "right-leg",
            BodyRegion::Back => "back",
        }
    }

    /// Title-cased label, e.g. "Left Arm"
    pub fn display_name(&self) -> String {
        self.id()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn suggested_symptoms(&self) -> &'static [&'static str] {
        match self {
            BodyRegion::Head => &["Headache", "Migraine", "Dizziness"],
            BodyRegion::Throat => &["Sore throat", "Difficulty swallowing"],
            BodyRegion::Chest => &["Chest pain", "Cough", "Shortness of breath"],
            BodyRegion::Abdomen => &["Abdominal pain", "Nausea", "Bloating"],
            BodyRegion::LeftArm | BodyRegion::RightArm => &["Arm pain", "Weakness", "Joint pain"],
            BodyRegion::LeftLeg | BodyRegion::RightLeg => &["Leg pain", "Swelling", "Joint pain"],
            BodyRegion::Back => &["Back pain", "Spinal issues"],
        }
    }
}

impl FromStr for BodyRegion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '_'], "-");

        BodyRegion::ALL
            .into_iter()
            .find(|region| region.id() == wanted)
            .ok_or_else(|| AppError::NotFound {
                resource_type: "body region".to_string(),
                id: s.to_string(),
            })
    }
}
