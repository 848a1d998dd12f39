//! Language-aware text normalization shared by the in-memory search paths.

use crate::store::TextScope;

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "all", "am", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "can", "did", "do", "does", "for", "from", "had", "has", "have", "he", "her", "him", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "no", "not", "of", "on", "or",
    "our", "she", "so", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "to", "us", "was", "we", "were", "what", "when", "where", "which", "who",
    "whom", "why", "will", "with", "would", "you", "your",
];

/// How a piece of text is folded into comparable terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// Lowercase, English stopwords removed, light suffix stemming
    English,
    /// Diacritics stripped and letter variants unified
    OriginalScript,
    /// Lowercase only
    Simple,
}

impl Analyzer {
    pub fn for_scope(scope: &TextScope) -> Self {
        match scope {
            TextScope::Original => Analyzer::OriginalScript,
            TextScope::Translation(language) if language == "en" => Analyzer::English,
            TextScope::Translation(_) => Analyzer::Simple,
        }
    }

    /// Case- and diacritic-insensitive form of `text`, suitable for substring tests.
    pub fn fold(self, text: &str) -> String {
        match self {
            Analyzer::OriginalScript => fold_original_script(text),
            Analyzer::English | Analyzer::Simple => text.to_lowercase(),
        }
    }

    /// Analyze a single word. `None` when it is a stopword or has no letters.
    pub fn term(self, word: &str) -> Option<String> {
        let folded = self.fold(word);
        let folded: String = folded.chars().filter(|c| c.is_alphanumeric()).collect();
        if folded.is_empty() {
            return None;
        }
        match self {
            Analyzer::English => {
                if ENGLISH_STOPWORDS.contains(&folded.as_str()) {
                    None
                } else {
                    Some(stem_english(&folded))
                }
            }
            Analyzer::OriginalScript | Analyzer::Simple => Some(folded),
        }
    }

    /// Analyzed terms of `text`, in order.
    pub fn terms(self, text: &str) -> Vec<String> {
        words(&self.fold(text))
            .filter_map(|word| self.term(word))
            .collect()
    }
}

/// Split text into runs of alphanumeric characters.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

fn is_arabic_mark(c: char) -> bool {
    matches!(c,
        '\u{0610}'..='\u{061A}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06DC}'
        | '\u{06DF}'..='\u{06E8}'
        | '\u{06EA}'..='\u{06ED}'
        | '\u{0640}')
}

/// Strip Arabic diacritics and tatweel, unify alef / ya / ta marbuta variants.
pub fn fold_original_script(text: &str) -> String {
    text.chars()
        .filter(|c| !is_arabic_mark(*c))
        .map(|c| match c {
            '\u{0622}' | '\u{0623}' | '\u{0625}' | '\u{0671}' => '\u{0627}',
            '\u{0649}' => '\u{064A}',
            '\u{0629}' => '\u{0647}',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Conservative suffix stripping, applied identically to queries and documents.
fn stem_english(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies").filter(|_| len > 4) {
        return format!("{stem}y");
    }
    let sibilant = ["sses", "ches", "shes", "xes", "zes"]
        .iter()
        .any(|suffix| word.ends_with(suffix));
    if let Some(stem) = word.strip_suffix("es").filter(|_| sibilant) {
        return stem.to_string();
    }
    if let Some(stem) = word.strip_suffix("ing").filter(|_| len > 5) {
        return stem.to_string();
    }
    if let Some(stem) = word.strip_suffix("ed").filter(|_| len > 4) {
        return stem.to_string();
    }
    let keeps_s = ["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix));
    if let Some(stem) = word.strip_suffix('s').filter(|_| !keeps_s) {
        return stem.to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_english_terms() {
        let terms = Analyzer::English.terms("Charity purifies the wealth of believers");
        assert_eq!(terms, vec!["charity", "purify", "wealth", "believer"]);
    }

    #[test]
    fn test_stemming_is_consistent() {
        for (a, b) in [
            ("establishes", "establish"),
            ("prayers", "prayer"),
            ("virtues", "virtue"),
            ("praying", "pray"),
        ] {
            assert_eq!(Analyzer::English.term(a), Analyzer::English.term(b));
        }
        assert_eq!(Analyzer::English.term("patience"), Some("patience".to_string()));
        assert_eq!(Analyzer::English.term("is"), None);
    }

    #[test]
    fn test_original_script_folding() {
        let with_marks = "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ";
        let plain = "بسم الله الرحمن الرحيم";
        assert_eq!(fold_original_script(with_marks), fold_original_script(plain));
        assert_eq!(fold_original_script("أحمد"), "احمد");
    }

    #[test]
    fn test_simple_analyzer_keeps_stopwords() {
        assert_eq!(Analyzer::Simple.terms("La paciencia es"), vec!["la", "paciencia", "es"]);
    }

    #[test]
    fn test_analyzer_for_scope() {
        assert_eq!(Analyzer::for_scope(&TextScope::Original), Analyzer::OriginalScript);
        assert_eq!(
            Analyzer::for_scope(&TextScope::Translation("en".to_string())),
            Analyzer::English
        );
        assert_eq!(
            Analyzer::for_scope(&TextScope::Translation("id".to_string())),
            Analyzer::Simple
        );
    }
}
