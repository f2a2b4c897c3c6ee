//! Remedy Common Library
//!
//! Shared code for the Remedy symptom assistant including:
//! - Knowledge base loading and symptom indexing
//! - Symptom segmentation and disease matching
//! - Treatment paradigms and disclaimers
//! - Language model client and assisted features
//! - Consultation sessions
//! - Error types, configuration and metrics

pub mod analysis;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod knowledge;
pub mod llm;
pub mod metrics;
pub mod session;
pub mod treatment;

// Re-export commonly used types
pub use analysis::{find_diseases, segment_symptoms, DiseaseMatch, MatchResults};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use knowledge::{DiseaseEntry, KnowledgeBase, SymptomIndex};
pub use llm::LanguageModel;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
