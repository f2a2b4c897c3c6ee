//! Language-model assisted features
//!
//! Provides:
//! - Symptom extraction from free text
//! - Treatment description enhancement with fallback and caching
//! - Follow-up question answering grounded in the consultation

mod enhancer;

pub use enhancer::{EnhancedTreatment, EnhancementRequest, TreatmentEnhancer};

use crate::errors::{AppError, Result};
use crate::llm::LanguageModel;
use crate::metrics;
use crate::treatment::TreatmentInfo;
use std::time::Instant;

/// Run one prompt and record latency under `operation`
pub(crate) async fn generate_timed(
    model: &dyn LanguageModel,
    operation: &str,
    prompt: &str,
) -> Result<String> {
    let start = Instant::now();
    let result = model.generate(prompt).await;
    metrics::record_llm(start.elapsed().as_secs_f64(), operation, result.is_ok());

    if let Err(e) = &result {
        tracing::warn!(operation, model = model.model_name(), error = %e, "Language model call failed");
    }
    result
}

fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract specific medical symptoms from the following text. \
         Return ONLY a comma-separated list of symptoms, without any additional text.\n\
         For example, if the input is \"I've been feeling dizzy and nauseous since yesterday\", \
         return \"dizziness, nausea\".\n\n\
         User text: {}\n\n\
         Symptoms:",
        text
    )
}

/// Extract symptoms from a natural-language description
///
/// The reply is read as a comma-separated list; pieces are trimmed and
/// empties dropped. Blank input returns no symptoms without calling the model.
pub async fn extract_symptoms(model: Option<&dyn LanguageModel>, text: &str) -> Result<Vec<String>> {
    let model = model.ok_or(AppError::LanguageModelNotConfigured)?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let reply = generate_timed(model, "extract", &extraction_prompt(text)).await?;

    let symptoms: Vec<String> = reply
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    tracing::debug!(count = symptoms.len(), "Symptoms extracted");
    Ok(symptoms)
}

/// What the assistant knows about the consultation when answering
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    /// Symptoms the user has reported
    pub symptoms: Vec<String>,

    /// Disease the user is looking at, if any
    pub viewing: Option<TreatmentInfo>,
}

impl ChatContext {
    pub fn render(&self) -> String {
        let mut context = String::new();

        if !self.symptoms.is_empty() {
            context.push_str(&format!("User Symptoms: {}\n", self.symptoms.join(", ")));
        }

        if let Some(info) = &self.viewing {
            context.push_str(&format!("Currently Viewing: {}\n", info.disease));
            context.push_str(&format!("Category: {}\n", info.category));
            context.push_str(&format!("Symptoms: {}\n", info.symptoms));
            context.push_str(&format!("Ayurvedic Treatment: {}\n", info.ayurvedic));
            context.push_str(&format!("Homeopathic Treatment: {}\n", info.homeopathic));
            context.push_str(&format!("Allopathic Treatment: {}\n", info.allopathic));
        }

        context
    }
}

fn question_prompt(context: &ChatContext, question: &str) -> String {
    format!(
        "You are a knowledgeable health assistant specializing in holistic medicine. \
         Use the following context to answer the user's question.\n\
         Provide helpful, accurate information while maintaining appropriate medical disclaimers.\n\n\
         Context:\n{}\n\
         User's question: {}\n\n\
         Provide a clear, informative response. If you don't have enough information or if the \
         question is beyond your capabilities, suggest that the user consult with a healthcare \
         professional.",
        context.render(),
        question
    )
}

/// Answer a follow-up question using the consultation context
pub async fn answer_question(
    model: Option<&dyn LanguageModel>,
    context: &ChatContext,
    question: &str,
) -> Result<String> {
    let model = model.ok_or(AppError::LanguageModelNotConfigured)?;

    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::MissingField {
            field: "question".to_string(),
        });
    }

    let answer = generate_timed(model, "chat", &question_prompt(context, question)).await?;
    if answer.is_empty() {
        return Err(AppError::LanguageModel {
            message: "Empty response from language model".to_string(),
        });
    }

    Ok(answer)
}
