use crate::error::store_error;
use crate::error::vector_error;
use crate::schema;
use hidaya_corpus::{
    CorpusData, ParentGroup, RecordId, Result, StoreError, TextRecord, Translation,
    TranslationSource,
};
use hidaya_vector_store::VectorStoreError;
use log::{error, info, warn};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

/// Record store and embedding store on one PostgreSQL database.
///
/// Trigram search needs `pg_trgm`, semantic search needs `pgvector`. Missing
/// extensions surface as [`StoreError::Unsupported`] from the affected
/// methods only.
pub struct PgStore {
    pub(crate) client: Client,
}

impl PgStore {
    /// Connect without TLS and drive the connection on a background task.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|err| {
                StoreError::Unavailable(format!("failed to connect to Postgres: {err}"))
            })?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!("postgres connection error: {err}");
            }
        });
        info!("Connected to Postgres");
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Create extensions, tables and search indexes when missing.
    ///
    /// Search indexes are best effort; their absence only slows queries down.
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .batch_execute(schema::EXTENSIONS)
            .await
            .map_err(|err| store_error(err, "vector and trigram extensions"))?;
        self.client
            .batch_execute(schema::TABLES)
            .await
            .map_err(|err| store_error(err, "schema"))?;
        if let Err(err) = self.client.batch_execute(schema::SEARCH_INDEXES).await {
            warn!("Search indexes not created: {err}");
        }
        info!("Schema ready");
        Ok(())
    }

    /// Approximate cosine index for vectors of one dimension.
    pub async fn create_vector_index(
        &self,
        dimension: usize,
        lists: usize,
    ) -> hidaya_vector_store::Result<()> {
        if dimension == 0 || lists == 0 {
            return Err(VectorStoreError::InvalidIndex(
                "dimension and lists must be positive".to_string(),
            ));
        }
        self.client
            .batch_execute(&schema::vector_index_sql(dimension, lists))
            .await
            .map_err(vector_error)?;
        info!("ivfflat index ready for {dimension}-dimensional vectors ({lists} lists)");
        Ok(())
    }

    /// Upsert a whole corpus in one transaction.
    ///
    /// Translations are keyed on (record, language, resource id) when a
    /// resource id is present, else on (record, language, translator).
    pub async fn ingest(&mut self, data: CorpusData) -> Result<()> {
        for record in &data.records {
            record.validate()?;
        }

        let tx = self
            .client
            .transaction()
            .await
            .map_err(|err| store_error(err, "transactions"))?;

        let parent_stmt = tx
            .prepare(
                "INSERT INTO parent_groups \
                 (number, name_original, name_simple, name_translated, revelation_place, record_count) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (number) DO UPDATE SET \
                 name_original = EXCLUDED.name_original, name_simple = EXCLUDED.name_simple, \
                 name_translated = EXCLUDED.name_translated, \
                 revelation_place = EXCLUDED.revelation_place, record_count = EXCLUDED.record_count",
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        for parent in &data.parents {
            tx.execute(
                &parent_stmt,
                &[
                    &sql_int(parent.number),
                    &parent.name_original,
                    &parent.name_simple,
                    &parent.name_translated,
                    &parent.revelation_place,
                    &sql_int(parent.record_count),
                ],
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        }

        let record_stmt = tx
            .prepare(
                "INSERT INTO records \
                 (id, parent_number, sequence, text_original, text_simple, text_romanized) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (id) DO UPDATE SET \
                 parent_number = EXCLUDED.parent_number, sequence = EXCLUDED.sequence, \
                 text_original = EXCLUDED.text_original, text_simple = EXCLUDED.text_simple, \
                 text_romanized = EXCLUDED.text_romanized",
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        for record in &data.records {
            tx.execute(
                &record_stmt,
                &[
                    &record.id,
                    &sql_int(record.parent_number),
                    &sql_int(record.sequence),
                    &record.text_original,
                    &record.text_simple,
                    &record.text_romanized,
                ],
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        }

        let by_resource = tx
            .prepare(
                "INSERT INTO translations \
                 (record_id, language, translator, resource_id, text, license, source) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (record_id, language, resource_id) WHERE resource_id IS NOT NULL \
                 DO UPDATE SET translator = EXCLUDED.translator, text = EXCLUDED.text, \
                 license = EXCLUDED.license, source = EXCLUDED.source",
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        let by_translator = tx
            .prepare(
                "INSERT INTO translations \
                 (record_id, language, translator, resource_id, text, license, source) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (record_id, language, translator) WHERE resource_id IS NULL \
                 DO UPDATE SET text = EXCLUDED.text, \
                 license = EXCLUDED.license, source = EXCLUDED.source",
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        for translation in &data.translations {
            let stmt = match translation.resource_id {
                Some(_) => &by_resource,
                None => &by_translator,
            };
            tx.execute(
                stmt,
                &[
                    &translation.record_id,
                    &translation.language,
                    &translation.translator,
                    &translation.resource_id,
                    &translation.text,
                    &translation.license,
                    &translation.source,
                ],
            )
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        }

        tx.commit()
            .await
            .map_err(|err| store_error(err, "ingestion"))?;
        info!(
            "Ingested {} parents, {} records, {} translations",
            data.parents.len(),
            data.records.len(),
            data.translations.len()
        );
        Ok(())
    }

    pub(crate) async fn query_rows(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        capability: &'static str,
    ) -> Result<Vec<Row>> {
        self.client
            .query(sql, params)
            .await
            .map_err(|err| store_error(err, capability))
    }

    /// Translations of `ids` in any language, by record then translation id.
    pub(crate) async fn all_translations(&self, ids: &[RecordId]) -> Result<Vec<Translation>> {
        let rows = self
            .query_rows(
                &format!("{TRANSLATION_COLUMNS} WHERE record_id = ANY($1) ORDER BY record_id, id"),
                &[&ids],
                "hydration",
            )
            .await?;
        Ok(rows.iter().map(translation_from_row).collect())
    }
}

pub(crate) const RECORD_COLUMNS: &str = "SELECT r.id, r.parent_number, r.sequence, r.text_original, \
     r.text_simple, r.text_romanized, coalesce(p.name_simple, '') AS parent_name \
     FROM records r LEFT JOIN parent_groups p ON p.number = r.parent_number";

pub(crate) const TRANSLATION_COLUMNS: &str = "SELECT id, record_id, language, translator, \
     resource_id, text, license, source FROM translations";

pub(crate) const PARENT_COLUMNS: &str = "SELECT number, name_original, name_simple, \
     name_translated, revelation_place, record_count FROM parent_groups";

pub(crate) fn record_from_row(row: &Row) -> TextRecord {
    TextRecord {
        id: row.get("id"),
        parent_number: from_sql_int(row.get("parent_number")),
        sequence: from_sql_int(row.get("sequence")),
        text_original: row.get("text_original"),
        text_simple: row.get("text_simple"),
        text_romanized: row.get("text_romanized"),
    }
}

pub(crate) fn translation_from_row(row: &Row) -> Translation {
    Translation {
        id: row.get("id"),
        record_id: row.get("record_id"),
        language: row.get("language"),
        translator: row.get("translator"),
        resource_id: row.get("resource_id"),
        text: row.get("text"),
        license: row.get("license"),
        source: row.get("source"),
    }
}

pub(crate) fn parent_from_row(row: &Row) -> ParentGroup {
    ParentGroup {
        number: from_sql_int(row.get("number")),
        name_original: row.get("name_original"),
        name_simple: row.get("name_simple"),
        name_translated: row.get("name_translated"),
        revelation_place: row.get("revelation_place"),
        record_count: from_sql_int(row.get("record_count")),
    }
}

pub(crate) fn source_from_row(row: &Row) -> TranslationSource {
    TranslationSource {
        language: row.get("language"),
        translator: row.get("translator"),
        source: row.get("source"),
        license: row.get("license"),
    }
}

pub(crate) fn sql_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn from_sql_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
