//! End-to-end runs of the `hidaya` binary over a JSON corpus with no
//! embedding backend.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const CORPUS: &str = r#"{
  "parents": [
    {"number": 2, "name_original": "البقرة", "name_simple": "Al-Baqarah", "name_translated": "The Cow", "record_count": 3}
  ],
  "records": [
    {"id": 1, "parent_number": 2, "sequence": 1, "text_original": "الم", "text_simple": "الم"},
    {"id": 2, "parent_number": 2, "sequence": 2, "text_original": "ذَٰلِكَ الْكِتَابُ لَا رَيْبَ", "text_simple": "ذلك الكتاب لا ريب"},
    {"id": 3, "parent_number": 2, "sequence": 3, "text_original": "الَّذِينَ يُؤْمِنُونَ بِالْغَيْبِ", "text_simple": "الذين يؤمنون بالغيب"}
  ],
  "translations": [
    {"record_id": 1, "language": "en", "translator": "Sahih International", "text": "Patience is a virtue of the faithful"},
    {"record_id": 2, "language": "en", "translator": "Sahih International", "text": "This is the Book about which there is no doubt"},
    {"record_id": 3, "language": "en", "translator": "Sahih International", "text": "Who believe in the unseen and establish prayer"},
    {"record_id": 3, "language": "fr", "translator": "Hamidullah", "text": "Qui croient à l'invisible"}
  ]
}"#;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("corpus.json"), CORPUS).unwrap();
    std::fs::write(
        dir.path().join("hidaya.toml"),
        r#"
corpus_path = "corpus.json"
vectors_path = "state/vectors.json"
index_dir = "state/indexes"

[embedding]
mode = "disabled"
"#,
    )
    .unwrap();
    dir
}

fn hidaya(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hidaya").unwrap();
    cmd.current_dir(dir)
        .env_remove("DATABASE_URL")
        .env_remove("EMBEDDING_BACKEND")
        .env_remove("EMBEDDING_MODEL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_exact_search_json() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["search", "virtue", "--strategy", "exact", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""strategy_used": "exact""#))
        .stdout(predicate::str::contains("Patience is a virtue"));
}

#[test]
fn test_search_without_matches_reports_none() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["search", "zakat", "-s", "exact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results"));
}

#[test]
fn test_semantic_search_falls_back_without_backend() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["search", "those who believe", "-s", "hybrid", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lexical only"));
}

#[test]
fn test_search_without_embeddings_skips_broken_backend() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("hidaya.toml"),
        r#"
corpus_path = "corpus.json"
vectors_path = "state/vectors.json"
index_dir = "state/indexes"

[embedding]
mode = "remote"
"#,
    )
    .unwrap();

    hidaya(dir.path())
        .args(["search", "virtue", "--strategy", "exact", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Patience is a virtue"));
    hidaya(dir.path())
        .args(["search", "virtue", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Patience is a virtue"));
    hidaya(dir.path())
        .args(["search", "virtue", "--strategy", "semantic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("embedding backend"));
}

#[test]
fn test_empty_query_is_rejected() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["search", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("query must not be empty"));
}

#[test]
fn test_show_verse_and_chapter() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["show", "2:3", "-l", "fr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Qui croient"))
        .stdout(predicate::str::contains("establish prayer").not());

    hidaya(dir.path())
        .args(["show", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Al-Baqarah"))
        .stdout(predicate::str::contains("3 records"));

    hidaya(dir.path())
        .args(["show", "9:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No record at 9:9"));
}

#[test]
fn test_embed_without_backend_counts_errors() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["embed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success_count": 0"#))
        .stdout(predicate::str::contains(r#""error_count": 3"#));
}

#[test]
fn test_ask_cites_passages() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["ask", "What is patience?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sources:"))
        .stdout(predicate::str::contains("2:1"));
}

#[test]
fn test_index_stats_and_build_without_backend() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["index", "stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total_vectors": 0"#))
        .stdout(predicate::str::contains(r#""model": null"#));

    hidaya(dir.path())
        .args(["index", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No embedding backend"));
}

#[test]
fn test_ingest_requires_database() {
    let dir = workspace();
    hidaya(dir.path())
        .args(["ingest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}
