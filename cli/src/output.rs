//! Terminal and JSON rendering of command results.

use anyhow::Result;
use hidaya_corpus::{ParentGroup, RecordView, Translation};
use hidaya_retrieval::{Answer, EmbedReport, ScoredMatch, SearchResponse};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn search(response: &SearchResponse, language: &str) -> String {
    if response.results.is_empty() {
        return format!(
            "{} No results for \"{}\" ({})",
            "✗".bright_red(),
            response.query,
            response.strategy_used
        );
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Found {} results via {} in {}ms{}\n",
        "✓".bright_green(),
        response.total.to_string().bright_cyan(),
        response.strategy_used.bright_cyan(),
        response.stats.total_time_ms,
        if response.stats.cache_hit { " (cached)" } else { "" }
    );
    for (i, m) in response.results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} {} {}",
            (i + 1).to_string().bright_yellow(),
            m.reference().bright_cyan(),
            m.parent_name,
            format!("score {:.3}", m.score).bright_black()
        );
        push_match_text(&mut out, m, language);
        out.push('\n');
    }
    out
}

fn push_match_text(out: &mut String, m: &ScoredMatch, language: &str) {
    let _ = writeln!(out, "   {}", m.text_original);
    if let Some(translation) = m.translation(language) {
        push_translation(out, translation);
    }
}

fn push_translation(out: &mut String, translation: &Translation) {
    let _ = writeln!(
        out,
        "   {} {}",
        translation.text,
        format!("({})", translation.translator).dimmed()
    );
}

pub fn answer(answer: &Answer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", answer.answer);
    if answer.citations.is_empty() {
        return out;
    }
    let _ = writeln!(out, "{}", "Sources:".bright_blue());
    for citation in &answer.citations {
        let _ = writeln!(
            out,
            "  [{}] {} {}",
            citation.reference.bright_cyan(),
            citation.excerpt,
            format!("{:.3}", citation.score).bright_black()
        );
    }
    out
}

pub fn embed_report(report: &EmbedReport, model: &str, language: &str) -> String {
    let mark = if report.error_count == 0 {
        "✓".bright_green().to_string()
    } else {
        "!".bright_yellow().to_string()
    };
    format!(
        "{mark} Embedded {} of {} records in {language} with {model} ({} errors)",
        report.success_count,
        report.total(),
        report.error_count
    )
}

pub fn record(view: &RecordView, language: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        view.record.reference().bright_cyan(),
        view.parent_name
    );
    let _ = writeln!(out, "   {}", view.record.text_original);
    if let Some(romanized) = &view.record.text_romanized {
        let _ = writeln!(out, "   {}", romanized.dimmed());
    }
    for translation in view
        .translations
        .iter()
        .filter(|t| language.is_none_or(|language| t.language == language))
    {
        push_translation(&mut out, translation);
    }
    out
}

pub fn parent(parent: &ParentGroup, views: &[RecordView], language: Option<&str>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{} {} {}",
        parent.number.to_string().bright_yellow(),
        parent.name_simple.bright_cyan(),
        parent.name_original
    );
    if let Some(translated) = &parent.name_translated {
        let _ = write!(out, " ({translated})");
    }
    let _ = writeln!(out, ", {} records\n", views.len());
    for view in views {
        out.push_str(&record(view, language));
    }
    out
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub model: Option<String>,
    pub language: String,
    pub model_vectors: usize,
    pub saved_index: Option<String>,
    pub semantic_index: String,
}

pub fn index_stats(stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} Embedding store", "▶".bright_blue());
    let _ = writeln!(out, "  Vectors: {}", stats.total_vectors.bright_cyan());
    match &stats.model {
        Some(model) => {
            let _ = writeln!(
                out,
                "  {model}/{}: {}",
                stats.language,
                stats.model_vectors.bright_cyan()
            );
        }
        None => {
            let _ = writeln!(out, "  Embedding backend: {}", "disabled".bright_red());
        }
    }
    let _ = writeln!(out, "  Similarity index: {}", stats.semantic_index);
    if let Some(path) = &stats.saved_index {
        let _ = writeln!(out, "  Saved index: {path}");
    }
    out
}
