//! Treatment enhancement
//!
//! Asks the language model to expand a knowledge base treatment text. The
//! enhancer never fails: without a model, or when the call errors or returns
//! nothing, the base text is returned unchanged.

use super::generate_timed;
use crate::llm::LanguageModel;
use crate::metrics;
use crate::treatment::{TreatmentInfo, TreatmentParadigm};
use futures::future::join_all;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cached enhancements kept before new ones stop being stored
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Inputs for one enhancement
#[derive(Debug, Clone, Copy)]
pub struct EnhancementRequest<'a> {
    pub paradigm: TreatmentParadigm,
    pub base_treatment: &'a str,
    pub disease: &'a str,
    pub symptoms: &'a str,
}

impl EnhancementRequest<'_> {
    fn prompt(&self) -> String {
        format!(
            "Enhance this {} treatment description for {} with more detailed explanations, \
             including potential benefits and considerations. Keep the response under 250 words, \
             be factual, and maintain a professional tone.\n\n\
             Disease: {}\n\
             Symptoms: {}\n\
             Base treatment: {}\n\n\
             Enhanced treatment explanation:",
            self.paradigm.label(),
            self.disease,
            self.disease,
            self.symptoms,
            self.base_treatment
        )
    }

    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.paradigm.label());
        hasher.update([0u8]);
        hasher.update(self.disease);
        hasher.update([0u8]);
        hasher.update(self.symptoms);
        hasher.update([0u8]);
        hasher.update(self.base_treatment);
        format!("enhance:{}", hex::encode(hasher.finalize()))
    }
}

/// One paradigm's treatment text after enhancement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancedTreatment {
    pub paradigm: TreatmentParadigm,
    pub text: String,

    /// False when the base text was returned
    pub enhanced: bool,
}

/// Enhances treatment texts, caching successful results in memory
pub struct TreatmentEnhancer {
    model: Option<Arc<dyn LanguageModel>>,
    cache: RwLock<HashMap<String, String>>,
    capacity: usize,
}

impl TreatmentEnhancer {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self::with_capacity(model, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(model: Option<Arc<dyn LanguageModel>>, capacity: usize) -> Self {
        Self {
            model,
            cache: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Whether a language model is available
    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Enhanced text for one paradigm, or the base text on any failure
    pub async fn enhance(&self, request: EnhancementRequest<'_>) -> EnhancedTreatment {
        let fallback = || EnhancedTreatment {
            paradigm: request.paradigm,
            text: request.base_treatment.to_string(),
            enhanced: false,
        };

        let Some(model) = &self.model else {
            return fallback();
        };

        let key = request.cache_key();
        if let Some(text) = self.cache.read().await.get(&key) {
            metrics::record_cache(true, "enhancement");
            return EnhancedTreatment {
                paradigm: request.paradigm,
                text: text.clone(),
                enhanced: true,
            };
        }
        metrics::record_cache(false, "enhancement");

        match generate_timed(model.as_ref(), "enhance", &request.prompt()).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                let mut cache = self.cache.write().await;
                if cache.len() < self.capacity {
                    cache.insert(key, text.clone());
                }
                EnhancedTreatment {
                    paradigm: request.paradigm,
                    text,
                    enhanced: true,
                }
            }
            _ => {
                metrics::record_enhancement_fallback(request.paradigm.label());
                tracing::info!(
                    disease = request.disease,
                    paradigm = %request.paradigm,
                    "Enhancement unavailable, using base treatment"
                );
                fallback()
            }
        }
    }

    /// Enhance several paradigms of one disease concurrently, in the order given
    pub async fn enhance_all(
        &self,
        info: &TreatmentInfo,
        paradigms: &[TreatmentParadigm],
    ) -> Vec<EnhancedTreatment> {
        let requests = paradigms.iter().map(|&paradigm| {
            self.enhance(EnhancementRequest {
                paradigm,
                base_treatment: info.treatment(paradigm),
                disease: &info.disease,
                symptoms: &info.symptoms,
            })
        });

        join_all(requests).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::fixtures::sample_kb;
    use crate::llm::MockLanguageModel;

    fn request(paradigm: TreatmentParadigm) -> EnhancementRequest<'static> {
        EnhancementRequest {
            paradigm,
            base_treatment: "Ginger tea",
            disease: "Flu",
            symptoms: "fever, cough",
        }
    }

    #[tokio::test]
    async fn test_no_model_returns_base() {
        let enhancer = TreatmentEnhancer::new(None);
        let result = enhancer.enhance(request(TreatmentParadigm::Ayurvedic)).await;

        assert_eq!(result.text, "Ginger tea");
        assert!(!result.enhanced);
        assert!(!enhancer.is_enabled());
    }

    #[tokio::test]
    async fn test_failure_returns_base() {
        let model = Arc::new(MockLanguageModel::new().with_failure("timeout"));
        let enhancer = TreatmentEnhancer::new(Some(model));
        let result = enhancer.enhance(request(TreatmentParadigm::Ayurvedic)).await;

        assert_eq!(result.text, "Ginger tea");
        assert!(!result.enhanced);
        assert_eq!(enhancer.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_reply_returns_base() {
        let model = Arc::new(MockLanguageModel::new().with_reply("   "));
        let enhancer = TreatmentEnhancer::new(Some(model));
        let result = enhancer.enhance(request(TreatmentParadigm::Allopathic)).await;
        assert_eq!(result.text, "Ginger tea");
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let model = Arc::new(MockLanguageModel::new().with_reply("Ginger tea soothes the throat."));
        let enhancer = TreatmentEnhancer::new(Some(model.clone()));

        let first = enhancer.enhance(request(TreatmentParadigm::Ayurvedic)).await;
        let second = enhancer.enhance(request(TreatmentParadigm::Ayurvedic)).await;

        assert!(first.enhanced);
        assert_eq!(first, second);
        assert_eq!(model.call_count(), 1);
        assert!(model.prompts()[0].contains("Enhance this Ayurvedic treatment description for Flu"));
    }

    #[test]
    fn test_cache_key_depends_on_every_input() {
        let base = request(TreatmentParadigm::Ayurvedic);
        let other_paradigm = request(TreatmentParadigm::Homeopathic);
        let other_text = EnhancementRequest {
            base_treatment: "Tulsi",
            ..base
        };

        assert_ne!(base.cache_key(), other_paradigm.cache_key());
        assert_ne!(base.cache_key(), other_text.cache_key());
        assert_eq!(base.cache_key(), request(TreatmentParadigm::Ayurvedic).cache_key());
    }

    #[tokio::test]
    async fn test_enhance_all_keeps_order() {
        let kb = sample_kb();
        let info = kb.treatment_info("Flu").unwrap();
        let enhancer = TreatmentEnhancer::new(None);

        let results = enhancer.enhance_all(&info, &TreatmentParadigm::ALL).await;
        let paradigms: Vec<_> = results.iter().map(|r| r.paradigm).collect();

        assert_eq!(paradigms, TreatmentParadigm::ALL.to_vec());
        assert_eq!(results[2].text, "Allopathic care for Flu");
    }

    #[tokio::test]
    async fn test_capacity_bounds_cache() {
        let model = Arc::new(
            MockLanguageModel::new()
                .with_reply("one")
                .with_reply("two"),
        );
        let enhancer = TreatmentEnhancer::with_capacity(Some(model), 1);

        enhancer.enhance(request(TreatmentParadigm::Ayurvedic)).await;
        enhancer.enhance(request(TreatmentParadigm::Homeopathic)).await;

        assert_eq!(enhancer.cached_len().await, 1);
    }
}
