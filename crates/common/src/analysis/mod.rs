//! Symptom analysis core
//!
//! Pure, synchronous functions: segmentation of raw symptom entries and
//! ranking of knowledge base diseases against a symptom list.

mod matcher;
mod segmenter;

pub use matcher::{find_diseases, DiseaseMatch, MatchResults};
pub use segmenter::segment_symptoms;
