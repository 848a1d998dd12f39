//! Boolean keyword queries for lexical-rank search.
//!
//! Supported syntax:
//!
//! - `patience prayer` and `patience AND prayer`: both terms required
//! - `patience OR gratitude`: either term
//! - `NOT wealth` and `-wealth`: exclude a term
//! - `"straight path"`: words adjacent and in order
//! - parentheses for grouping
//!
//! Terms are analyzed with the [`Analyzer`] of the searched text, so stopwords
//! disappear and inflected forms meet their stems. `OR` binds looser than `AND`.

use crate::text::{Analyzer, words};
use std::collections::HashMap;
use thiserror::Error;

/// Why a query string could not become a [`LexicalQuery`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("query is empty")]
    Empty,

    #[error("unterminated quoted phrase")]
    UnbalancedQuote,

    #[error("unbalanced parentheses")]
    UnbalancedParen,

    #[error("operator `{0}` is missing an operand")]
    DanglingOperator(&'static str),

    #[error("query only excludes terms")]
    OnlyNegative,

    #[error("query contains only stop words")]
    OnlyStopWords,

    #[error("query nests groups or negations deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Deepest allowed nesting of parentheses and negations combined
pub const MAX_DEPTH: usize = 32;

/// A query word: what the user typed and its analyzed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub surface: String,
    pub lexeme: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexicalNode {
    Term(Term),
    Phrase(Vec<Term>),
    And(Vec<LexicalNode>),
    Or(Vec<LexicalNode>),
    Not(Box<LexicalNode>),
}

/// A parsed and analyzed boolean query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalQuery {
    root: LexicalNode,
    analyzer: Analyzer,
}

impl LexicalQuery {
    pub fn parse(input: &str, analyzer: Analyzer) -> Result<Self, QueryParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(QueryParseError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            analyzer,
        };
        let root = parser.or_expr()?;
        if parser.pos < tokens.len() {
            return Err(QueryParseError::UnbalancedParen);
        }

        let root = root.ok_or(QueryParseError::OnlyStopWords)?;
        if !root.is_positive() {
            return Err(QueryParseError::OnlyNegative);
        }
        Ok(Self { root, analyzer })
    }

    pub fn root(&self) -> &LexicalNode {
        &self.root
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    /// Render as a PostgreSQL `to_tsquery` expression.
    pub fn to_tsquery(&self) -> String {
        self.root.to_tsquery()
    }

    /// Rank `text` against the query, `None` when it does not match.
    ///
    /// Cover-density style: rewards matching more of the query, repeated hits,
    /// and shorter passages. Scores fall in `(0, ~2]`.
    pub fn score(&self, text: &str) -> Option<f32> {
        let doc = Document::new(self.analyzer, text);
        if doc.len == 0 || !self.root.matches(&doc) {
            return None;
        }

        let mut total_weight = 0.0f32;
        let mut earned = 0.0f32;
        self.root.accumulate(&doc, &mut total_weight, &mut earned);
        if total_weight == 0.0 {
            return None;
        }

        let density = earned / total_weight;
        let length_norm = 1.0 + 0.1 * (doc.len as f32).ln_1p();
        Some(density / length_norm)
    }
}

impl LexicalNode {
    /// Whether the node can match on the strength of included terms.
    fn is_positive(&self) -> bool {
        match self {
            LexicalNode::Term(_) | LexicalNode::Phrase(_) => true,
            LexicalNode::And(children) => children.iter().any(LexicalNode::is_positive),
            LexicalNode::Or(children) => children.iter().all(LexicalNode::is_positive),
            LexicalNode::Not(_) => false,
        }
    }

    fn matches(&self, doc: &Document) -> bool {
        match self {
            LexicalNode::Term(term) => doc.positions.contains_key(&term.lexeme),
            LexicalNode::Phrase(terms) => doc.phrase_hits(terms) > 0,
            LexicalNode::And(children) => children.iter().all(|child| child.matches(doc)),
            LexicalNode::Or(children) => children.iter().any(|child| child.matches(doc)),
            LexicalNode::Not(inner) => !inner.matches(doc),
        }
    }

    fn accumulate(&self, doc: &Document, total: &mut f32, earned: &mut f32) {
        let (weight, hits) = match self {
            LexicalNode::Term(term) => (1.0, doc.positions.get(&term.lexeme).map_or(0, Vec::len)),
            LexicalNode::Phrase(terms) => (terms.len() as f32, doc.phrase_hits(terms)),
            LexicalNode::And(children) | LexicalNode::Or(children) => {
                for child in children {
                    child.accumulate(doc, total, earned);
                }
                return;
            }
            LexicalNode::Not(_) => return,
        };
        *total += weight;
        if hits > 0 {
            *earned += weight * (1.0 + (hits as f32).ln());
        }
    }

    fn to_tsquery(&self) -> String {
        match self {
            LexicalNode::Term(term) => term.surface.clone(),
            LexicalNode::Phrase(terms) => {
                let parts: Vec<&str> = terms.iter().map(|t| t.surface.as_str()).collect();
                format!("({})", parts.join(" <-> "))
            }
            LexicalNode::And(children) => join_tsquery(children, " & "),
            LexicalNode::Or(children) => join_tsquery(children, " | "),
            LexicalNode::Not(inner) => format!("!{}", inner.to_tsquery()),
        }
    }
}

fn join_tsquery(children: &[LexicalNode], op: &str) -> String {
    let parts: Vec<String> = children.iter().map(LexicalNode::to_tsquery).collect();
    format!("({})", parts.join(op))
}

/// Analyzed terms of a passage with their positions
struct Document {
    positions: HashMap<String, Vec<usize>>,
    len: usize,
}

impl Document {
    fn new(analyzer: Analyzer, text: &str) -> Self {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        let terms = analyzer.terms(text);
        for (index, term) in terms.iter().enumerate() {
            positions.entry(term.clone()).or_default().push(index);
        }
        Self {
            positions,
            len: terms.len(),
        }
    }

    fn phrase_hits(&self, terms: &[Term]) -> usize {
        let Some((first, rest)) = terms.split_first() else {
            return 0;
        };
        let Some(starts) = self.positions.get(&first.lexeme) else {
            return 0;
        };
        starts
            .iter()
            .filter(|&&start| {
                rest.iter().enumerate().all(|(offset, term)| {
                    self.positions
                        .get(&term.lexeme)
                        .is_some_and(|p| p.contains(&(start + offset + 1)))
                })
            })
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Phrase(Vec<String>),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, QueryParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(QueryParseError::UnbalancedQuote);
                }
                let parts: Vec<String> = words(&phrase).map(str::to_string).collect();
                if !parts.is_empty() {
                    tokens.push(Token::Phrase(parts));
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '-' | '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            _ => {
                let mut raw = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '"' | '(' | ')') {
                        break;
                    }
                    raw.push(c);
                    chars.next();
                }
                match raw.as_str() {
                    "AND" | "&" | "&&" => tokens.push(Token::And),
                    "OR" | "|" | "||" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => {
                        let mut parts: Vec<String> = words(&raw).map(str::to_string).collect();
                        match parts.len() {
                            0 => {}
                            1 => tokens.extend(parts.pop().map(Token::Word)),
                            _ => tokens.push(Token::Phrase(parts)),
                        }
                    }
                }
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    analyzer: Analyzer,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> Result<Option<LexicalNode>, QueryParseError> {
        let mut branches = vec![self.and_expr()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            if self.at_operand_end() {
                return Err(QueryParseError::DanglingOperator("OR"));
            }
            branches.push(self.and_expr()?);
        }
        Ok(combine(branches, LexicalNode::Or))
    }

    fn and_expr(&mut self) -> Result<Option<LexicalNode>, QueryParseError> {
        let mut parts = vec![self.unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    if self.at_operand_end() {
                        return Err(QueryParseError::DanglingOperator("AND"));
                    }
                    parts.push(self.unary()?);
                }
                Some(Token::Word(_) | Token::Phrase(_) | Token::Not | Token::Open) => {
                    parts.push(self.unary()?);
                }
                _ => break,
            }
        }
        Ok(combine(parts, LexicalNode::And))
    }

    fn unary(&mut self) -> Result<Option<LexicalNode>, QueryParseError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            if self.at_operand_end() {
                return Err(QueryParseError::DanglingOperator("NOT"));
            }
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(inner.map(|inner| LexicalNode::Not(Box::new(inner))));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Option<LexicalNode>, QueryParseError> {
        let token = self.peek().cloned();
        self.pos += 1;
        match token {
            Some(Token::Word(word)) => Ok(self.term(&word).map(LexicalNode::Term)),
            Some(Token::Phrase(parts)) => {
                let mut terms: Vec<Term> = parts.iter().filter_map(|w| self.term(w)).collect();
                Ok(match terms.len() {
                    0 => None,
                    1 => terms.pop().map(LexicalNode::Term),
                    _ => Some(LexicalNode::Phrase(terms)),
                })
            }
            Some(Token::Open) => {
                self.descend()?;
                let inner = self.or_expr()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(QueryParseError::UnbalancedParen);
                }
                self.pos += 1;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Close) => Err(QueryParseError::UnbalancedParen),
            Some(Token::And) => Err(QueryParseError::DanglingOperator("AND")),
            Some(Token::Or) => Err(QueryParseError::DanglingOperator("OR")),
            Some(Token::Not) => Err(QueryParseError::DanglingOperator("NOT")),
            None => Err(QueryParseError::Empty),
        }
    }

    fn descend(&mut self) -> Result<(), QueryParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryParseError::TooDeep);
        }
        Ok(())
    }

    fn at_operand_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Close | Token::And | Token::Or)
        )
    }

    fn term(&self, word: &str) -> Option<Term> {
        let lexeme = self.analyzer.term(word)?;
        Some(Term {
            surface: self.analyzer.fold(word),
            lexeme,
        })
    }
}

/// Collapse operands that vanished during analysis.
fn combine(
    parts: Vec<Option<LexicalNode>>,
    build: fn(Vec<LexicalNode>) -> LexicalNode,
) -> Option<LexicalNode> {
    let mut parts: Vec<LexicalNode> = parts.into_iter().flatten().collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(build(parts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn english(query: &str) -> Result<LexicalQuery, QueryParseError> {
        LexicalQuery::parse(query, Analyzer::English)
    }

    #[test]
    fn test_implicit_and() {
        let query = english("patience prayer").unwrap();
        assert_eq!(query.to_tsquery(), "(patience & prayer)");
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let query = english("patience prayer OR charity").unwrap();
        assert_eq!(query.to_tsquery(), "((patience & prayer) | charity)");
    }

    #[test]
    fn test_negation_forms() {
        assert_eq!(
            english("wealth -greed").unwrap().to_tsquery(),
            "(wealth & !greed)"
        );
        assert_eq!(
            english("wealth NOT greed").unwrap().to_tsquery(),
            "(wealth & !greed)"
        );
    }

    #[test]
    fn test_phrase_and_grouping() {
        let query = english("\"straight path\" (guidance OR light)").unwrap();
        assert_eq!(
            query.to_tsquery(),
            "((straight <-> path) & (guidance | light))"
        );
    }

    #[test]
    fn test_stopwords_vanish() {
        let query = english("the patience of").unwrap();
        assert_eq!(query.to_tsquery(), "patience");
        assert_eq!(english("the of and"), Err(QueryParseError::OnlyStopWords));
    }

    #[test]
    fn test_malformed_queries() {
        assert_eq!(english(""), Err(QueryParseError::Empty));
        assert_eq!(english("   "), Err(QueryParseError::Empty));
        assert_eq!(english("\"unterminated"), Err(QueryParseError::UnbalancedQuote));
        assert_eq!(english("(patience"), Err(QueryParseError::UnbalancedParen));
        assert_eq!(english("patience)"), Err(QueryParseError::UnbalancedParen));
        assert_eq!(
            english("patience OR"),
            Err(QueryParseError::DanglingOperator("OR"))
        );
        assert_eq!(
            english("AND patience"),
            Err(QueryParseError::DanglingOperator("AND"))
        );
        assert_eq!(english("-wealth"), Err(QueryParseError::OnlyNegative));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let nested = format!("{}prayer{}", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(english(&nested), Err(QueryParseError::TooDeep));

        let negations = format!("prayer {}patience", "-".repeat(50_000));
        assert_eq!(english(&negations), Err(QueryParseError::TooDeep));

        let at_limit = format!(
            "{}prayer{}",
            "(".repeat(MAX_DEPTH),
            ")".repeat(MAX_DEPTH)
        );
        assert_eq!(english(&at_limit).unwrap().to_tsquery(), "prayer");
    }

    #[test]
    fn test_scoring_matches_boolean_logic() {
        let query = english("wealth -greed").unwrap();
        assert!(query.score("charity purifies wealth").is_some());
        assert!(query.score("greed corrupts wealth").is_none());
        assert!(query.score("prayer establishes discipline").is_none());
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let query = english("\"patience virtue\"").unwrap();
        assert!(query.score("patience is a virtue").is_some());
        assert!(query.score("virtue and patience").is_none());
    }

    #[test]
    fn test_stemmed_match() {
        let query = english("purify").unwrap();
        assert!(query.score("charity purifies wealth").is_some());
    }

    #[test]
    fn test_coverage_ranks_higher() {
        let query = english("patience OR prayer").unwrap();
        let both = query.score("patience and prayer").unwrap();
        let one = query.score("patience and silence").unwrap();
        assert!(both > one);
    }

    #[test]
    fn test_original_script_query() {
        let query = LexicalQuery::parse("الرحمن", Analyzer::OriginalScript).unwrap();
        assert!(query.score("بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ").is_some());
    }
}
