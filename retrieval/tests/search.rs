mod common;

use common::{
    HashingEmbedder, UnreachableStore, engine_with, hashing, numbered_corpus, scenario_corpus,
};
use hidaya_corpus::{Capabilities, MemoryCorpus};
use hidaya_embeddings::Embedder;
use hidaya_retrieval::{
    AnswerEngine, ErrorKind, MatchKind, RetrievalConfig, RetrievalError, SearchStrategy,
    SemanticIndex,
};
use hidaya_vector_store::{EmbeddingVector, VectorStore, VectorStoreError};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;

fn ids(response: &hidaya_retrieval::SearchResponse) -> Vec<i64> {
    response.results.iter().map(|m| m.record_id).collect()
}

#[tokio::test]
async fn test_exact_search_finds_single_record() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let response = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Exact, 10)
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.strategy_used, "exact");
    let m = &response.results[0];
    assert_eq!(m.record_id, 1);
    assert_eq!(m.score, 1.0);
    assert_eq!(m.match_kind, MatchKind::Exact);
    assert_eq!(m.parent_name, "Al-Baqarah");
    assert_eq!(m.reference(), "2:1");
    assert_eq!(
        m.translation("en").map(|t| t.text.as_str()),
        Some("patience is a virtue")
    );
}

#[tokio::test]
async fn test_fuzzy_search_tolerates_typos() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let response = fixture
        .engine
        .search("pashience", "en", SearchStrategy::Fuzzy, 10)
        .await
        .unwrap();

    assert_eq!(response.strategy_used, "fuzzy");
    assert_eq!(response.results[0].record_id, 1);
    for m in &response.results {
        assert!(m.score >= 0.3, "score {} below threshold", m.score);
        assert!(m.score < 1.0);
    }
}

#[tokio::test]
async fn test_semantic_search_without_backend_is_empty() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let response = fixture
        .engine
        .search("patience in hardship", "en", SearchStrategy::Semantic, 10)
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.total, 0);
    assert_eq!(response.strategy_used, "semantic");
}

#[tokio::test]
async fn test_hybrid_search_without_backend_is_lexical_only() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let lexical = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Lexical, 10)
        .await
        .unwrap();
    let hybrid = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Hybrid, 10)
        .await
        .unwrap();

    assert_eq!(hybrid.strategy_used, "hybrid (lexical only)");
    assert_eq!(ids(&hybrid), vec![1]);
    assert_eq!(ids(&hybrid), ids(&lexical));
    assert_eq!(hybrid.results[0].match_kind, MatchKind::Hybrid);
}

#[tokio::test]
async fn test_result_count_never_exceeds_limit() {
    let fixture = engine_with(numbered_corpus(30).await, hashing(), RetrievalConfig::default());
    fixture.engine.embed_and_store(None, "en").await.unwrap();

    for strategy in SearchStrategy::ALL {
        for limit in [1, 5, 12] {
            let response = fixture
                .engine
                .search("prayer establishes discipline", "en", strategy, limit)
                .await
                .unwrap();
            assert!(
                response.total <= limit,
                "{strategy} returned {} for limit {limit}",
                response.total
            );
            assert_eq!(response.total, response.results.len());
        }
    }
}

#[tokio::test]
async fn test_exact_search_is_idempotent() {
    let fixture = engine_with(numbered_corpus(20).await, None, RetrievalConfig::default());

    let first = fixture
        .engine
        .search("discipline number 1", "en", SearchStrategy::Exact, 50)
        .await
        .unwrap();
    let second = fixture
        .engine
        .search("discipline number 1", "en", SearchStrategy::Exact, 50)
        .await
        .unwrap();

    // 1, 10..=19
    assert_eq!(first.total, 11);
    assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn test_hybrid_ids_come_from_both_halves_without_duplicates() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());
    fixture.engine.embed_and_store(None, "en").await.unwrap();

    let query = "patience virtue";
    let limit = 10;
    let hybrid = fixture
        .engine
        .search(query, "en", SearchStrategy::Hybrid, limit)
        .await
        .unwrap();
    let sub_limit = fixture.engine.hybrid().sub_limit(limit);
    let lexical = fixture
        .engine
        .search(query, "en", SearchStrategy::Lexical, sub_limit)
        .await
        .unwrap();
    let semantic = fixture
        .engine
        .search(query, "en", SearchStrategy::Semantic, sub_limit)
        .await
        .unwrap();

    assert_eq!(hybrid.strategy_used, "hybrid");
    let allowed: HashSet<i64> = ids(&lexical).into_iter().chain(ids(&semantic)).collect();
    let returned = ids(&hybrid);
    let unique: HashSet<i64> = returned.iter().copied().collect();
    assert_eq!(unique.len(), returned.len());
    assert!(unique.is_subset(&allowed));
    assert_eq!(returned[0], 1);
}

#[tokio::test]
async fn test_semantic_search_ranks_nearest_first() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());
    let report = fixture.engine.embed_and_store(None, "en").await.unwrap();
    assert_eq!(report.success_count, 3);

    let response = fixture
        .engine
        .search("charity purifies wealth", "en", SearchStrategy::Semantic, 3)
        .await
        .unwrap();

    assert_eq!(response.strategy_used, "semantic");
    assert_eq!(response.results[0].record_id, 2);
    assert!((response.results[0].score - 1.0).abs() < 1e-4);
    let scores: Vec<f32> = response.results.iter().map(|m| m.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_prebuilt_indexes_agree_with_relational_search() {
    let query = "prayer establishes discipline number 7";
    let mut rankings = Vec::new();
    for semantic_index in [SemanticIndex::Relational, SemanticIndex::Flat, SemanticIndex::Ivf] {
        let config = RetrievalConfig {
            semantic_index,
            ivf_lists: 2,
            ivf_probes: 2,
            ..Default::default()
        };
        let fixture = engine_with(numbered_corpus(12).await, hashing(), config);
        fixture.engine.embed_and_store(None, "en").await.unwrap();
        let response = fixture
            .engine
            .search(query, "en", SearchStrategy::Semantic, 5)
            .await
            .unwrap();
        rankings.push(ids(&response));
    }
    assert_eq!(rankings[0][0], 7);
    assert_eq!(rankings[0], rankings[1]);
    assert_eq!(rankings[0], rankings[2]);
}

#[tokio::test]
async fn test_embed_and_store_updates_in_place() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());

    let first = fixture.engine.embed_and_store(None, "en").await.unwrap();
    let second = fixture.engine.embed_and_store(Some(&[1, 2]), "en").await.unwrap();

    assert_eq!(first.success_count, 3);
    assert_eq!(second.success_count, 2);
    assert_eq!(
        fixture
            .vectors
            .count(Some("hashing-test"), Some("en"))
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_embed_and_store_counts_missing_texts() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());

    let report = fixture
        .engine
        .embed_and_store(Some(&[1, 2, 99]), "fr")
        .await
        .unwrap();
    assert_eq!(report.success_count, 0);
    assert_eq!(report.error_count, 3);

    let report = fixture
        .engine
        .embed_and_store(Some(&[1, 2, 99]), "ar")
        .await
        .unwrap();
    assert_eq!(report.success_count, 2);
    assert_eq!(report.error_count, 1);
}

#[tokio::test]
async fn test_embed_and_store_without_backend_counts_errors() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let report = fixture.engine.embed_and_store(None, "en").await.unwrap();
    assert_eq!(report.success_count, 0);
    assert_eq!(report.error_count, 3);
    assert_eq!(fixture.vectors.count(None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_embedding_translator_filter() {
    let corpus = scenario_corpus().await;
    corpus
        .upsert_translation(hidaya_corpus::Translation::new(
            1,
            "en",
            "Pickthall",
            "endurance is an excellence",
        ))
        .await
        .unwrap();
    let config = RetrievalConfig {
        embedding_translator: Some("Pickthall".to_string()),
        ..Default::default()
    };
    let fixture = engine_with(corpus, hashing(), config);

    let report = fixture.engine.embed_and_store(None, "en").await.unwrap();
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 2);

    let stored = fixture.vectors.vectors("hashing-test", "en").await.unwrap();
    let expected = HashingEmbedder::new(64)
        .embed_one("endurance is an excellence")
        .await
        .unwrap();
    assert_eq!(stored[0].values, expected);
}

#[tokio::test]
async fn test_dimension_mismatch_is_reported() {
    let fixture = engine_with(
        scenario_corpus().await,
        Some(Arc::new(HashingEmbedder::new(32))),
        RetrievalConfig::default(),
    );
    fixture
        .vectors
        .upsert(vec![EmbeddingVector::new(1, "hashing-test", "en", vec![0.5; 64])])
        .await
        .unwrap();

    let err = fixture
        .engine
        .search("patience", "en", SearchStrategy::Semantic, 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::VectorStore(VectorStoreError::DimensionMismatch {
            expected: 64,
            actual: 32
        })
    ));
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[tokio::test]
async fn test_malformed_lexical_query_falls_back_to_exact() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let response = fixture
        .engine
        .search("-virtue", "en", SearchStrategy::Lexical, 10)
        .await
        .unwrap();
    assert_eq!(response.strategy_used, "exact (fallback)");

    let response = fixture
        .engine
        .search("the of", "en", SearchStrategy::Lexical, 10)
        .await
        .unwrap();
    assert_eq!(response.strategy_used, "exact (fallback)");
}

#[tokio::test]
async fn test_deeply_nested_lexical_query_falls_back_to_exact() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let parens = "(".repeat(10_000);
    let response = fixture
        .engine
        .search(&parens, "en", SearchStrategy::Lexical, 10)
        .await
        .unwrap();
    assert_eq!(response.strategy_used, "exact (fallback)");
    assert!(response.results.is_empty());

    let negations = format!("virtue {}patience", "-".repeat(50_000));
    let response = fixture
        .engine
        .search(&negations, "en", SearchStrategy::Hybrid, 10)
        .await
        .unwrap();
    assert_eq!(
        response.strategy_used,
        "hybrid (lexical only, exact fallback)"
    );
}

#[tokio::test]
async fn test_missing_store_capabilities_fall_back_to_exact() {
    let corpus = scenario_corpus().await.with_capabilities(Capabilities {
        trigram: false,
        full_text: false,
    });
    let fixture = engine_with(corpus, None, RetrievalConfig::default());

    let fuzzy = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Fuzzy, 10)
        .await
        .unwrap();
    assert_eq!(fuzzy.strategy_used, "exact (fallback)");
    assert_eq!(ids(&fuzzy), vec![1]);
    assert_eq!(fuzzy.results[0].match_kind, MatchKind::Exact);

    let hybrid = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Hybrid, 10)
        .await
        .unwrap();
    assert_eq!(hybrid.strategy_used, "hybrid (lexical only, exact fallback)");
    assert_eq!(ids(&hybrid), vec![1]);
}

#[tokio::test]
async fn test_unreachable_store_propagates() {
    let fixture = engine_with(UnreachableStore, None, RetrievalConfig::default());

    for strategy in [
        SearchStrategy::Exact,
        SearchStrategy::Fuzzy,
        SearchStrategy::Lexical,
    ] {
        let err = fixture
            .engine
            .search("patience", "en", strategy, 10)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient, "{strategy}");
    }
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    for (query, limit) in [("", 10), ("   ", 10), ("virtue", 0), ("virtue", 101)] {
        let err = fixture
            .engine
            .search(query, "en", SearchStrategy::Exact, limit)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery(_)));
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }
    assert!(
        fixture
            .engine
            .search("virtue", "en", SearchStrategy::Exact, 100)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_auto_reports_concrete_strategy() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    let short = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Auto, 10)
        .await
        .unwrap();
    assert_eq!(short.strategy_used, "exact");

    let question = fixture
        .engine
        .search("what is a virtue", "en", SearchStrategy::Auto, 10)
        .await
        .unwrap();
    assert_eq!(question.strategy_used, "lexical");
    assert_eq!(ids(&question), vec![1]);
}

#[tokio::test]
async fn test_auto_routes_each_query_shape_with_backend() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());
    fixture.engine.embed_and_store(None, "en").await.unwrap();

    for (query, expected) in [
        ("virtue", "exact"),
        ("\"charity purifies wealth\"", "exact"),
        ("patience is a virtue", "lexical"),
        ("what is a virtue", "hybrid"),
    ] {
        let response = fixture
            .engine
            .search(query, "en", SearchStrategy::Auto, 10)
            .await
            .unwrap();
        assert_eq!(response.strategy_used, expected, "{query}");
    }
}

#[tokio::test]
async fn test_original_language_search() {
    let fixture = engine_with(scenario_corpus().await, None, RetrievalConfig::default());

    // Undiacritized query still matches the vocalized text.
    let response = fixture
        .engine
        .search("الزكاة", "ar", SearchStrategy::Exact, 10)
        .await
        .unwrap();
    assert_eq!(ids(&response), vec![2]);
}

#[tokio::test]
async fn test_response_cache() {
    let config = RetrievalConfig {
        cache_size: 8,
        ..Default::default()
    };
    let fixture = engine_with(scenario_corpus().await, hashing(), config);

    let first = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Exact, 10)
        .await
        .unwrap();
    let second = fixture
        .engine
        .search("virtue", "en", SearchStrategy::Exact, 10)
        .await
        .unwrap();
    assert!(!first.stats.cache_hit);
    assert!(second.stats.cache_hit);
    assert_eq!(first.results, second.results);
    assert_eq!(fixture.engine.cache_stats().await.size, 1);

    fixture.engine.embed_and_store(None, "en").await.unwrap();
    assert_eq!(fixture.engine.cache_stats().await.size, 0);
}

#[tokio::test]
async fn test_answer_cites_passages() {
    let fixture = engine_with(scenario_corpus().await, hashing(), RetrievalConfig::default());
    fixture.engine.embed_and_store(None, "en").await.unwrap();
    let answers = AnswerEngine::new(Arc::new(fixture.engine));

    let answer = answers
        .answer("What is the virtue of patience?", "en", 3)
        .await
        .unwrap();

    assert_eq!(answer.strategy_used, "hybrid");
    assert_eq!(answer.citations[0].reference, "2:1");
    assert_eq!(answer.citations[0].excerpt, "patience is a virtue");
    assert!(answer.answer.contains("[2:1] patience is a virtue"));
}

#[tokio::test]
async fn test_answer_without_matches() {
    let fixture = engine_with(MemoryCorpus::new(), None, RetrievalConfig::default());
    let answers = AnswerEngine::new(Arc::new(fixture.engine));

    let answer = answers.answer("Who was Luqman?", "en", 5).await.unwrap();
    assert!(answer.citations.is_empty());
    assert_eq!(answer.answer, "No relevant passages were found for this question.");
    assert!(answers.answer("  ", "en", 5).await.is_err());
}
