//! Symptom segmentation
//!
//! Turns one raw symptom entry into discrete symptoms. Explicit delimiters win
//! in priority order (comma, semicolon, slash); without any, runs of
//! capitalized words such as `CoughFever` are treated as boundaries.

use regex_lite::Regex;
use std::sync::OnceLock;

/// An uppercase letter followed by one or more lowercase letters
fn capitalized_run() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Z][a-z]+").expect("static pattern compiles"))
}

/// Split a raw symptom entry into trimmed, non-empty symptoms
///
/// Only the first applicable rule is used:
/// 1. `,` present: split on commas
/// 2. `;` present: split on semicolons
/// 3. `/` present: split on slashes
/// 4. two or more capitalized runs: split at each run, keeping any text
///    between runs as its own symptom
/// 5. otherwise the trimmed input as a single symptom
pub fn segment_symptoms(raw: &str) -> Vec<String> {
    for delimiter in [',', ';', '/'] {
        if raw.contains(delimiter) {
            return split_trimmed(raw, delimiter);
        }
    }

    let runs: Vec<_> = capitalized_run().find_iter(raw).collect();
    if runs.len() > 1 {
        let mut symptoms = Vec::with_capacity(runs.len() + 1);
        let mut cursor = 0;

        for run in &runs {
            push_trimmed(&mut symptoms, &raw[cursor..run.start()]);
            symptoms.push(run.as_str().to_string());
            cursor = run.end();
        }
        push_trimmed(&mut symptoms, &raw[cursor..]);

        return symptoms;
    }

    let whole = raw.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}

fn split_trimmed(raw: &str, delimiter: char) -> Vec<String> {
    let mut symptoms = Vec::new();
    for piece in raw.split(delimiter) {
        push_trimmed(&mut symptoms, piece);
    }
    symptoms
}

fn push_trimmed(symptoms: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        symptoms.push(piece.to_string());
    }
}
