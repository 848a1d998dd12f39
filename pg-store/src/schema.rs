//! Tables the store reads and writes.
//!
//! Records, parents and translations are owned by the ingestion side; the
//! schema is created here so a fresh database can be seeded from a corpus file.

use hidaya_corpus::Analyzer;

pub(crate) const EXTENSIONS: &str = "
CREATE EXTENSION IF NOT EXISTS vector;
CREATE EXTENSION IF NOT EXISTS pg_trgm;
";

pub(crate) const TABLES: &str = "
CREATE TABLE IF NOT EXISTS parent_groups (
    number INTEGER PRIMARY KEY,
    name_original TEXT NOT NULL,
    name_simple TEXT NOT NULL,
    name_translated TEXT,
    revelation_place TEXT,
    record_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS records (
    id BIGINT PRIMARY KEY,
    parent_number INTEGER NOT NULL REFERENCES parent_groups (number),
    sequence INTEGER NOT NULL,
    text_original TEXT NOT NULL CHECK (btrim(text_original) <> ''),
    text_simple TEXT,
    text_romanized TEXT,
    UNIQUE (parent_number, sequence)
);

CREATE TABLE IF NOT EXISTS translations (
    id BIGSERIAL PRIMARY KEY,
    record_id BIGINT NOT NULL REFERENCES records (id) ON DELETE CASCADE,
    language TEXT NOT NULL,
    translator TEXT NOT NULL,
    resource_id BIGINT,
    text TEXT NOT NULL,
    license TEXT,
    source TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS translations_resource_key
    ON translations (record_id, language, resource_id) WHERE resource_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS translations_translator_key
    ON translations (record_id, language, translator) WHERE resource_id IS NULL;
CREATE INDEX IF NOT EXISTS translations_language_idx ON translations (language, record_id);

CREATE TABLE IF NOT EXISTS embeddings (
    record_id BIGINT NOT NULL REFERENCES records (id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    language TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding vector NOT NULL,
    PRIMARY KEY (record_id, model, language)
);
";

/// Trigram and full-text indexes. Separate from [`TABLES`] because they need
/// `pg_trgm` and may be skipped on hosts without it.
pub(crate) const SEARCH_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS records_simple_trgm_idx
    ON records USING GIN (text_simple gin_trgm_ops);
CREATE INDEX IF NOT EXISTS translations_text_trgm_idx
    ON translations USING GIN (text gin_trgm_ops);
CREATE INDEX IF NOT EXISTS records_simple_tsv_idx
    ON records USING GIN (to_tsvector('simple', coalesce(text_simple, text_original)));
CREATE INDEX IF NOT EXISTS translations_english_tsv_idx
    ON translations USING GIN (to_tsvector('english', text)) WHERE language = 'en';
CREATE INDEX IF NOT EXISTS translations_simple_tsv_idx
    ON translations USING GIN (to_tsvector('simple', text));
";

/// Text search configuration matching the analyzer of the searched text.
pub(crate) fn ts_config(analyzer: Analyzer) -> &'static str {
    match analyzer {
        Analyzer::English => "english",
        Analyzer::OriginalScript | Analyzer::Simple => "simple",
    }
}

/// Approximate cosine index over one dimension's vectors.
///
/// The `embedding` column is untyped so models of different sizes share the
/// table; the index is partial on `dimension` and indexes the cast
/// expression that [`nearest_sql`] orders by.
pub(crate) fn vector_index_sql(dimension: usize, lists: usize) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS embeddings_ivfflat_{dimension}_idx \
         ON embeddings USING ivfflat ((embedding::vector({dimension})) vector_cosine_ops) \
         WITH (lists = {lists}) WHERE dimension = {dimension}"
    )
}

pub(crate) fn nearest_sql(dimension: usize) -> String {
    format!(
        "SELECT record_id, (embedding::vector({dimension}) <=> $1) AS distance \
         FROM embeddings \
         WHERE model = $2 AND language = $3 AND dimension = {dimension} \
         ORDER BY embedding::vector({dimension}) <=> $1 ASC, record_id ASC \
         LIMIT $4"
    )
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
