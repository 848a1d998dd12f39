use crate::schema::{contains_pattern, ts_config};
use crate::store::{
    PARENT_COLUMNS, PgStore, RECORD_COLUMNS, TRANSLATION_COLUMNS, parent_from_row,
    record_from_row, source_from_row, sql_int, sql_limit, translation_from_row,
};
use async_trait::async_trait;
use hidaya_corpus::{
    LexicalQuery, ParentGroup, RecordId, RecordStore, RecordView, Result, TextRecord, TextScope,
    Translation, TranslationSource, fold_original_script,
};
use log::debug;
use std::collections::HashMap;

/// Original-script searches run against the simplified column when present.
const ORIGINAL_TEXT: &str = "coalesce(text_simple, text_original)";

#[async_trait]
impl RecordStore for PgStore {
    async fn find_containing(
        &self,
        needle: &str,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<RecordId>> {
        let rows = match scope {
            TextScope::Original => {
                let folded = contains_pattern(&fold_original_script(needle));
                self.query_rows(
                    "SELECT id FROM records \
                     WHERE text_original ILIKE $1 OR coalesce(text_simple, '') ILIKE $2 \
                     ORDER BY id LIMIT $3",
                    &[&contains_pattern(needle), &folded, &sql_limit(limit)],
                    "containment search",
                )
                .await?
            }
            TextScope::Translation(language) => {
                self.query_rows(
                    "SELECT DISTINCT record_id AS id FROM translations \
                     WHERE language = $1 AND text ILIKE $2 \
                     ORDER BY id LIMIT $3",
                    &[language, &contains_pattern(needle), &sql_limit(limit)],
                    "containment search",
                )
                .await?
            }
        };
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn find_similar(
        &self,
        query: &str,
        scope: &TextScope,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>> {
        let rows = match scope {
            TextScope::Original => {
                let sql = format!(
                    "SELECT id, greatest(similarity({ORIGINAL_TEXT}, $1), \
                     word_similarity($1, {ORIGINAL_TEXT})) AS score \
                     FROM records \
                     WHERE greatest(similarity({ORIGINAL_TEXT}, $1), \
                     word_similarity($1, {ORIGINAL_TEXT})) >= $2 \
                     ORDER BY score DESC, id ASC LIMIT $3"
                );
                self.query_rows(
                    &sql,
                    &[&fold_original_script(query), &threshold, &sql_limit(limit)],
                    "trigram similarity",
                )
                .await?
            }
            TextScope::Translation(language) => {
                self.query_rows(
                    "SELECT record_id AS id, \
                     max(greatest(similarity(text, $1), word_similarity($1, text))) AS score \
                     FROM translations WHERE language = $2 \
                     GROUP BY record_id \
                     HAVING max(greatest(similarity(text, $1), word_similarity($1, text))) >= $3 \
                     ORDER BY score DESC, id ASC LIMIT $4",
                    &[&query, language, &threshold, &sql_limit(limit)],
                    "trigram similarity",
                )
                .await?
            }
        };
        debug!("Trigram search for '{query}' matched {} records", rows.len());
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("score")))
            .collect())
    }

    async fn find_lexical(
        &self,
        query: &LexicalQuery,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>> {
        let config = ts_config(query.analyzer());
        let tsquery = query.to_tsquery();
        let rows = match scope {
            TextScope::Original => {
                let sql = format!(
                    "SELECT id, ts_rank_cd(to_tsvector('{config}', {ORIGINAL_TEXT}), q) AS score \
                     FROM records, to_tsquery('{config}', $1) AS q \
                     WHERE to_tsvector('{config}', {ORIGINAL_TEXT}) @@ q \
                     ORDER BY score DESC, id ASC LIMIT $2"
                );
                let folded = fold_original_script(&tsquery);
                self.query_rows(&sql, &[&folded, &sql_limit(limit)], "full-text search")
                    .await?
            }
            TextScope::Translation(language) => {
                let sql = format!(
                    "SELECT record_id AS id, max(ts_rank_cd(to_tsvector('{config}', text), q)) AS score \
                     FROM translations, to_tsquery('{config}', $1) AS q \
                     WHERE language = $2 AND to_tsvector('{config}', text) @@ q \
                     GROUP BY record_id \
                     ORDER BY score DESC, id ASC LIMIT $3"
                );
                self.query_rows(
                    &sql,
                    &[&tsquery, language, &sql_limit(limit)],
                    "full-text search",
                )
                .await?
            }
        };
        debug!("Full-text query {tsquery} matched {} records", rows.len());
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("score")))
            .collect())
    }

    async fn hydrate(&self, ids: &[RecordId]) -> Result<Vec<RecordView>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .query_rows(
                &format!("{RECORD_COLUMNS} WHERE r.id = ANY($1)"),
                &[&ids],
                "hydration",
            )
            .await?;
        let mut found: HashMap<RecordId, (TextRecord, String)> = rows
            .iter()
            .map(|row| {
                let record = record_from_row(row);
                (record.id, (record, row.get("parent_name")))
            })
            .collect();

        let mut translations: HashMap<RecordId, Vec<Translation>> = HashMap::new();
        for translation in self.all_translations(ids).await? {
            translations
                .entry(translation.record_id)
                .or_default()
                .push(translation);
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                let (record, parent_name) = found.remove(id)?;
                Some(RecordView {
                    translations: translations.remove(id).unwrap_or_default(),
                    record,
                    parent_name,
                })
            })
            .collect())
    }

    async fn records(&self, ids: &[RecordId]) -> Result<Vec<TextRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .query_rows(
                &format!("{RECORD_COLUMNS} WHERE r.id = ANY($1)"),
                &[&ids],
                "record lookup",
            )
            .await?;
        let mut found: HashMap<RecordId, TextRecord> = rows
            .iter()
            .map(record_from_row)
            .map(|record| (record.id, record))
            .collect();
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn record_ids(&self) -> Result<Vec<RecordId>> {
        let rows = self
            .query_rows("SELECT id FROM records ORDER BY id", &[], "record lookup")
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn translations(
        &self,
        ids: &[RecordId],
        language: &str,
        translator: Option<&str>,
    ) -> Result<Vec<Translation>> {
        let rows = self
            .query_rows(
                &format!(
                    "{TRANSLATION_COLUMNS} \
                     WHERE record_id = ANY($1) AND language = $2 \
                     AND ($3::text IS NULL OR translator = $3) \
                     ORDER BY record_id, id"
                ),
                &[&ids, &language, &translator],
                "translation lookup",
            )
            .await?;
        Ok(rows.iter().map(translation_from_row).collect())
    }

    async fn parents(&self) -> Result<Vec<ParentGroup>> {
        let rows = self
            .query_rows(
                &format!("{PARENT_COLUMNS} ORDER BY number"),
                &[],
                "parent lookup",
            )
            .await?;
        Ok(rows.iter().map(parent_from_row).collect())
    }

    async fn parent(&self, number: u32) -> Result<Option<(ParentGroup, Vec<RecordView>)>> {
        let rows = self
            .query_rows(
                &format!("{PARENT_COLUMNS} WHERE number = $1"),
                &[&sql_int(number)],
                "parent lookup",
            )
            .await?;
        let Some(parent) = rows.first().map(parent_from_row) else {
            return Ok(None);
        };

        let rows = self
            .query_rows(
                "SELECT id FROM records WHERE parent_number = $1 ORDER BY sequence",
                &[&sql_int(number)],
                "parent lookup",
            )
            .await?;
        let ids: Vec<RecordId> = rows.iter().map(|row| row.get("id")).collect();
        let views = self.hydrate(&ids).await?;
        Ok(Some((parent, views)))
    }

    async fn record_by_reference(&self, parent: u32, sequence: u32) -> Result<Option<RecordView>> {
        let rows = self
            .query_rows(
                "SELECT id FROM records WHERE parent_number = $1 AND sequence = $2",
                &[&sql_int(parent), &sql_int(sequence)],
                "record lookup",
            )
            .await?;
        let Some(id) = rows.first().map(|row| row.get::<_, RecordId>("id")) else {
            return Ok(None);
        };
        Ok(self.hydrate(&[id]).await?.into_iter().next())
    }

    async fn translation_sources(&self) -> Result<Vec<TranslationSource>> {
        let rows = self
            .query_rows(
                "SELECT DISTINCT language, translator, source, license FROM translations \
                 ORDER BY language, translator, source, license",
                &[],
                "translation lookup",
            )
            .await?;
        Ok(rows.iter().map(source_from_row).collect())
    }
}
