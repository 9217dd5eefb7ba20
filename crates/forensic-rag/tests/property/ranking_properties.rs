//! Property tests for ranking: length, ordering and stability laws.

use chrono::{TimeZone, Utc};
use forensic_core::LogChunk;
use forensic_rag::{EngineConfig, RankingEngine};
use proptest::prelude::*;

const TEXTS: &[&str] = &[
    "FATAL: connection refused at db",
    "ERROR: connection refused",
    "INFO: retry scheduled",
    "WARN: pool exhausted",
    "ERROR FATAL double fault",
    "connection refused by upstream",
];

// (text index, optional timestamp in seconds)
fn chunk_strategy() -> impl Strategy<Value = Vec<(usize, Option<i64>)>> {
    prop::collection::vec((0..TEXTS.len(), prop::option::of(0i64..100_000)), 1..60)
}

fn build(layout: &[(usize, Option<i64>)]) -> Vec<LogChunk> {
    layout.iter()
        .enumerate()
        .map(|(i, (text, ts))| {
            let chunk = LogChunk::new(format!("c{i}"), TEXTS[*text]);
            match ts {
                Some(secs) => chunk.with_timestamp(Utc.timestamp_opt(*secs, 0).unwrap()),
                None => chunk,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn length_is_min_of_top_k_and_input(layout in chunk_strategy(), top_k in 0usize..80) {
        let chunks = build(&layout);
        let ranked = RankingEngine::new(&EngineConfig::default())
            .rank("connection refused", &chunks, top_k)
            .unwrap();
        prop_assert_eq!(ranked.len(), top_k.min(chunks.len()));
    }

    #[test]
    fn scores_never_increase(layout in chunk_strategy()) {
        let chunks = build(&layout);
        let ranked = RankingEngine::new(&EngineConfig::default())
            .rank("connection refused", &chunks, chunks.len())
            .unwrap();
        for pair in ranked.entries.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn equal_scores_keep_input_order(layout in chunk_strategy()) {
        let chunks = build(&layout);
        let ranked = RankingEngine::new(&EngineConfig::default())
            .rank("connection refused", &chunks, chunks.len())
            .unwrap();
        for pair in ranked.entries.windows(2) {
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].position < pair[1].position);
            }
        }
    }

    #[test]
    fn parallel_matches_sequential(layout in chunk_strategy(), top_k in 1usize..60) {
        let chunks = build(&layout);
        let mut sequential = EngineConfig::default();
        sequential.ranking.parallel_threshold = usize::MAX;
        let mut parallel = EngineConfig::default();
        parallel.ranking.parallel_threshold = 0;

        let a = RankingEngine::new(&sequential).rank("connection refused", &chunks, top_k).unwrap();
        let b = RankingEngine::new(&parallel).rank("connection refused", &chunks, top_k).unwrap();
        prop_assert_eq!(a.ids(), b.ids());
    }
}

const DIM: usize = 4;

type EmbeddedLayout = Vec<(usize, Option<i64>, Option<Vec<f32>>)>;

// embeddings of dimension 3..=5 against a 4-d index, so some chunks mismatch
fn embedded_strategy() -> impl Strategy<Value = EmbeddedLayout> {
    prop::collection::vec(
        (
            0..TEXTS.len(),
            prop::option::of(0i64..100_000),
            prop::option::of(prop::collection::vec(-1.0f32..1.0, DIM - 1..=DIM + 1)),
        ),
        1..60,
    )
}

fn query_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, DIM)
}

fn build_embedded(layout: &EmbeddedLayout) -> Vec<LogChunk> {
    layout
        .iter()
        .enumerate()
        .map(|(i, (text, ts, embedding))| {
            let mut chunk = LogChunk::new(format!("c{i}"), TEXTS[*text]);
            if let Some(secs) = ts {
                chunk = chunk.with_timestamp(Utc.timestamp_opt(*secs, 0).unwrap());
            }
            if let Some(embedding) = embedding {
                chunk = chunk.with_embedding(embedding.clone());
            }
            chunk
        })
        .collect()
}

fn mismatched_ids(chunks: &[LogChunk]) -> Vec<String> {
    chunks
        .iter()
        .filter(|c| c.embedding.as_ref().is_some_and(|e| e.len() != DIM))
        .map(|c| c.id.clone())
        .collect()
}

fn engine_with_threshold(parallel_threshold: usize) -> RankingEngine {
    let mut config = EngineConfig::default();
    config.dimension = DIM;
    config.ranking.parallel_threshold = parallel_threshold;
    RankingEngine::new(&config)
}

proptest! {
    #[test]
    fn hybrid_length_accounts_for_exclusions(
        layout in embedded_strategy(),
        query in query_strategy(),
        top_k in 0usize..80,
    ) {
        let chunks = build_embedded(&layout);
        let bad = mismatched_ids(&chunks);
        let ranked = engine_with_threshold(usize::MAX)
            .rank_with_embedding("connection refused", Some(query.as_slice()), &chunks, top_k)
            .unwrap();

        if top_k == 0 {
            prop_assert!(ranked.is_empty());
        } else {
            prop_assert_eq!(ranked.len(), top_k.min(chunks.len() - bad.len()));
            let excluded: Vec<String> = ranked.excluded.iter().map(|e| e.id.clone()).collect();
            prop_assert_eq!(excluded, bad);
        }
    }

    #[test]
    fn hybrid_scores_ordered_and_stable(layout in embedded_strategy(), query in query_strategy()) {
        let chunks = build_embedded(&layout);
        let ranked = engine_with_threshold(usize::MAX)
            .rank_with_embedding("connection refused", Some(query.as_slice()), &chunks, chunks.len())
            .unwrap();

        for pair in ranked.entries.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].position < pair[1].position);
            }
        }
        for entry in ranked.iter() {
            prop_assert_eq!(entry.breakdown.similarity.is_some(), entry.chunk.embedding.is_some());
            if let Some(similarity) = entry.breakdown.similarity {
                prop_assert!((-1.0..=1.0).contains(&similarity));
            }
        }
    }

    #[test]
    fn hybrid_parallel_matches_sequential(
        layout in embedded_strategy(),
        query in query_strategy(),
        top_k in 1usize..60,
    ) {
        let chunks = build_embedded(&layout);
        let a = engine_with_threshold(usize::MAX)
            .rank_with_embedding("connection refused", Some(query.as_slice()), &chunks, top_k)
            .unwrap();
        let b = engine_with_threshold(0)
            .rank_with_embedding("connection refused", Some(query.as_slice()), &chunks, top_k)
            .unwrap();

        prop_assert_eq!(a.ids(), b.ids());
        prop_assert_eq!(&a.excluded, &b.excluded);
    }
}
