use crate::engine::SearchEngine;
use crate::error::Result;
use crate::result::ScoredMatch;
use hidaya_corpus::{Analyzer, RecordId};
use log::info;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

const NO_PASSAGES: &str = "No relevant passages were found for this question.";
const EXCERPT_CHARS: usize = 240;
const SUMMARY_PASSAGES: usize = 3;

/// A passage backing an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    /// `parent:sequence`
    pub reference: String,
    pub record_id: RecordId,
    pub score: f32,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub strategy_used: String,
}

/// Extractive question answering on top of hybrid search.
///
/// The lexical half gets the question's keywords joined with `OR`, the
/// semantic half the whole question. The answer quotes the best passages.
pub struct AnswerEngine {
    engine: Arc<SearchEngine>,
}

impl AnswerEngine {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self { engine }
    }

    pub async fn answer(&self, question: &str, language: &str, limit: usize) -> Result<Answer> {
        let question = question.trim();
        let language = language.trim().to_ascii_lowercase();
        self.engine.validate(question, &language, limit)?;

        let ctx = self.engine.context();
        let keywords = self.keywords(question, &language);
        let lexical_query = if keywords.is_empty() {
            question.to_string()
        } else {
            keywords.join(" OR ")
        };

        let outcome = self
            .engine
            .hybrid()
            .search_split(&lexical_query, question, &language, limit)
            .await?;

        let original = ctx.is_original_language(&language);
        let citations: Vec<Citation> = outcome
            .matches
            .iter()
            .map(|m| Citation {
                reference: m.reference(),
                record_id: m.record_id,
                score: m.score,
                excerpt: excerpt(passage(m, &language, original), EXCERPT_CHARS),
            })
            .collect();

        let answer = if citations.is_empty() {
            NO_PASSAGES.to_string()
        } else {
            summarize(&citations)
        };

        info!(
            "Answered '{question}' with {} citations ({})",
            citations.len(),
            outcome.strategy_used
        );
        Ok(Answer {
            question: question.to_string(),
            answer,
            citations,
            strategy_used: outcome.strategy_used,
        })
    }

    /// Question words, stop words and repeats removed, in order.
    fn keywords(&self, question: &str, language: &str) -> Vec<String> {
        let ctx = self.engine.context();
        let analyzer = Analyzer::for_scope(&ctx.scope(language));
        let question_words: HashSet<String> = ctx
            .config()
            .question_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        question
            .split_whitespace()
            .map(|token| {
                token
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| !word.is_empty() && !question_words.contains(word))
            .filter(|word| analyzer.term(word).is_some())
            .filter(|word| seen.insert(word.clone()))
            .collect()
    }
}

/// Text of the match in the asked language, falling back to the original.
fn passage<'a>(m: &'a ScoredMatch, language: &str, original: bool) -> &'a str {
    if original {
        return &m.text_original;
    }
    m.translation(language)
        .map(|t| t.text.as_str())
        .unwrap_or(&m.text_original)
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut chars = text.chars();
    let cut: String = chars.by_ref().take(max_chars).collect();
    let on_boundary = chars.next().is_none_or(char::is_whitespace);
    let cut = match cut.rfind(char::is_whitespace) {
        _ if on_boundary => cut.as_str(),
        Some(end) if end > cut.len() / 2 => &cut[..end],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}

fn summarize(citations: &[Citation]) -> String {
    let quoted: Vec<String> = citations
        .iter()
        .take(SUMMARY_PASSAGES)
        .map(|c| format!("[{}] {}", c.reference, c.excerpt))
        .collect();
    let noun = if citations.len() == 1 { "passage" } else { "passages" };
    format!(
        "Based on {} relevant {noun}: {}",
        citations.len(),
        quoted.join(" ")
    )
}
