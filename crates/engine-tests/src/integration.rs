#[cfg(test)]
mod tests {
    use crate::{
        FlakyService, run_with, settings,
        utils::{assert_conserved, ledger, lines, statement},
    };
    use engine_config::settings::{
        ExecutionMode, ReconSettings, StrategyThresholds, builder::ReconSettingsBuilder,
    };
    use engine_core::{event_bus::bus::EventBus, schema::DatasetSide};
    use engine_processing::{CanonicalKeyBuilder, KeyColumns, LocalMatchService, match_rows};
    use engine_runtime::{ExecutionStrategy, ReconcileRequest, reconcile};
    use model::{
        records::{dataset::Dataset, row::Row},
        result::{RunStatus, partition_fingerprint},
    };
    use std::{io::Write, sync::Arc};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    // Scenario: the two-row example on key `k`.
    // Expected Outcome: A pairs with A, B is left-only, C is right-only.
    #[traced_test]
    #[tokio::test]
    async fn tc01_worked_example() {
        let left: Dataset = vec![
            Row::from_pairs([("k", "A"), ("amt", "100")]),
            Row::from_pairs([("k", "B"), ("amt", "200")]),
        ]
        .into();
        let right: Dataset = vec![
            Row::from_pairs([("k", "A"), ("amt", "100")]),
            Row::from_pairs([("k", "C"), ("amt", "300")]),
        ]
        .into();

        let result = reconcile(
            ReconcileRequest::new(left, right, "k", "k"),
            &ReconSettings::default(),
            Arc::new(LocalMatchService::new()),
            EventBus::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.matches[0].left.get("k"), Some("A"));
        assert_eq!(result.matches[0].right.get("k"), Some("A"));
        assert_eq!(result.left_only[0].get("k"), Some("B"));
        assert_eq!(result.right_only[0].get("k"), Some("C"));
        assert_eq!((result.total_left, result.total_right), (2, 2));
    }

    // Scenario: generated datasets with many duplicate keys, several chunkings.
    // Expected Outcome: every row lands in exactly one partition.
    #[traced_test]
    #[tokio::test]
    async fn tc02_rows_are_conserved() {
        let left = ledger(600, 400, 7);
        let right = statement(550, 400, 11);

        for chunk_size in [1, 37, 600] {
            let result = run_with(
                &left,
                &right,
                ExecutionStrategy::Chunked { chunk_size },
                &settings(ExecutionMode::Parallel { max_in_flight: 3 }),
                Arc::new(LocalMatchService::new()),
            )
            .await;
            assert_conserved(&result, &left, &right);
        }
    }

    // Scenario: the same inputs under different chunk sizes and concurrency settings.
    // Expected Outcome: identical matched / left-only / right-only partitions,
    // equal to a single in-process pass.
    #[traced_test]
    #[tokio::test]
    async fn tc03_result_is_deterministic() {
        let left = ledger(500, 300, 21);
        let right = statement(450, 300, 42);

        let single = match_rows(left.clone().into_rows(), right.clone().into_rows(), "ref", "reference", &[]);
        let expected = partition_fingerprint(&single.matched, &single.left_only, &single.right_only);

        let strategies = [
            ExecutionStrategy::SingleShot,
            ExecutionStrategy::Chunked { chunk_size: 7 },
            ExecutionStrategy::Chunked { chunk_size: 128 },
        ];
        let modes = [
            ExecutionMode::Sequential { cooldown_ms: 0 },
            ExecutionMode::Parallel { max_in_flight: 1 },
            ExecutionMode::Parallel { max_in_flight: 3 },
            ExecutionMode::Parallel { max_in_flight: 8 },
        ];

        let mut reference: Option<(Vec<String>, Vec<String>)> = None;
        for strategy in strategies {
            for mode in modes {
                let result = run_with(
                    &left,
                    &right,
                    strategy,
                    &settings(mode),
                    Arc::new(LocalMatchService::new()),
                )
                .await;

                assert_eq!(result.fingerprint, expected, "{strategy:?} / {mode:?}");
                let partition: (Vec<String>, Vec<String>) = (
                    lines(&result.left_only).iter().map(|s| s.to_string()).collect(),
                    lines(&result.right_only).iter().map(|s| s.to_string()).collect(),
                );
                match &reference {
                    Some(first) => assert_eq!(&partition, first),
                    None => reference = Some(partition),
                }
            }
        }
    }

    // Scenario: 10,000 left rows against a fixed right dataset, one pass vs chunks of 2,500
    // chosen through the size thresholds.
    // Expected Outcome: identical aggregate totals and partitions.
    #[traced_test]
    #[tokio::test]
    async fn tc04_chunked_equals_single_pass() {
        let left = ledger(10_000, 8_000, 3);
        let right = statement(9_000, 8_000, 5);

        let one_pass = run_with(
            &left,
            &right,
            ExecutionStrategy::SingleShot,
            &settings(ExecutionMode::default()),
            Arc::new(LocalMatchService::new()),
        )
        .await;

        let chunked_settings = ReconSettingsBuilder::new()
            .chunk_size(2_500)
            .strategy(StrategyThresholds {
                max_single_shot_rows: 1_000,
                ..Default::default()
            })
            .build();
        let chunked = reconcile(
            ReconcileRequest::new(left.clone(), right.clone(), "ref", "reference"),
            &chunked_settings,
            Arc::new(LocalMatchService::new()),
            EventBus::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(one_pass.counters.chunks_submitted, 1);
        assert_eq!(chunked.counters.chunks_submitted, 4);
        assert_eq!(chunked.total_matches, one_pass.total_matches);
        assert_eq!(chunked.left_only.len(), one_pass.left_only.len());
        assert_eq!(chunked.right_only.len(), one_pass.right_only.len());
        assert_eq!(chunked.fingerprint, one_pass.fingerprint);
        assert_conserved(&chunked, &left, &right);
    }

    // Scenario: every chunk times out twice and succeeds on the third attempt.
    // Expected Outcome: each row contributes exactly once; no duplicate matches.
    #[traced_test]
    #[tokio::test]
    async fn tc05_retried_chunks_count_once() {
        let left = ledger(1_000, 700, 13);
        let right = statement(900, 700, 17);
        let service = Arc::new(FlakyService::new(2));

        let baseline = run_with(
            &left,
            &right,
            ExecutionStrategy::Chunked { chunk_size: 250 },
            &settings(ExecutionMode::default()),
            Arc::new(LocalMatchService::new()),
        )
        .await;
        let result = run_with(
            &left,
            &right,
            ExecutionStrategy::Chunked { chunk_size: 250 },
            &settings(ExecutionMode::default()),
            service.clone(),
        )
        .await;

        assert_eq!(service.calls(), 12);
        assert_eq!(result.counters.retries, 8);
        assert!(result.failed_chunks.is_empty());
        assert_eq!(result.fingerprint, baseline.fingerprint);
        assert_conserved(&result, &left, &right);

        let mut matched_lines: Vec<_> = result
            .matches
            .iter()
            .map(|p| p.left.get("line").unwrap())
            .collect();
        let before = matched_lines.len();
        matched_lines.sort_unstable();
        matched_lines.dedup();
        assert_eq!(matched_lines.len(), before);
    }

    // Scenario: datasets without a shared id, keyed through canonical keys built
    // from differently named and formatted columns.
    // Expected Outcome: duplicate entries pair up in order; the extra partner line is right-only.
    #[traced_test]
    #[tokio::test]
    async fn tc06_canonical_keys_reconcile_across_formats() {
        let left: Dataset = vec![
            Row::from_pairs([("date", "2024-01-05"), ("amount", "-100.00"), ("party", "Acme Corp"), ("type", "transfer")]),
            Row::from_pairs([("date", "2024-01-05"), ("amount", "-100.00"), ("party", "Acme Corp"), ("type", "transfer")]),
            Row::from_pairs([("date", "2024-01-06"), ("amount", "250.5"), ("party", "Globex"), ("type", "compensation")]),
        ]
        .into();
        let right: Dataset = vec![
            Row::from_pairs([("value_date", "05/01/2024"), ("amt", "-100"), ("payee", "ACME CORP")]),
            Row::from_pairs([("value_date", "05/01/2024"), ("amt", "-100"), ("payee", "acme corp")]),
            Row::from_pairs([("value_date", "05/01/2024"), ("amt", "(100)"), ("payee", "Acme-Corp")]),
        ]
        .into();

        let left = CanonicalKeyBuilder::new(
            KeyColumns::new("date", "amount", "party").with_operation_type("type"),
        )
        .annotate(&left, DatasetSide::Left, "key")
        .unwrap();
        let right = CanonicalKeyBuilder::new(KeyColumns::new("value_date", "amt", "payee"))
            .annotate(&right, DatasetSide::Right, "key")
            .unwrap();

        let result = reconcile(
            ReconcileRequest::new(left, right, "key", "key"),
            &ReconSettings::default(),
            Arc::new(LocalMatchService::new()),
            EventBus::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let matched: Vec<_> = result
            .matches
            .iter()
            .map(|p| p.right.get("key").unwrap())
            .collect();
        assert_eq!(
            matched,
            vec!["20240105|10000|ACMECORP|debit1", "20240105|10000|ACMECORP|debit2"]
        );
        assert_eq!(result.left_only[0].get("key"), Some("20240106|25050|GLOBEX|debit1"));
        assert_eq!(result.right_only[0].get("key"), Some("20240105|10000|ACMECORP|debit3"));
    }

    // Scenario: settings loaded from a JSON file select sequential execution.
    // Expected Outcome: the run completes with the configured chunking.
    #[traced_test]
    #[tokio::test]
    async fn tc07_settings_file_drives_the_run() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "execution": {{ "mode": "sequential", "cooldown_ms": 1 }},
                "chunking": {{ "base_chunk_size": 40, "min_chunk_size": 40, "right_size_tiers": [] }},
                "strategy": {{ "max_single_shot_rows": 10, "max_single_shot_bytes": 1000000 }}
            }}"#
        )
        .unwrap();
        let settings = ReconSettings::from_file(file.path()).unwrap();

        let left = ledger(100, 80, 1);
        let right = statement(90, 80, 2);
        let result = reconcile(
            ReconcileRequest::new(left.clone(), right.clone(), "ref", "reference"),
            &settings,
            Arc::new(LocalMatchService::new()),
            EventBus::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.counters.chunks_submitted, 3);
        assert_conserved(&result, &left, &right);
    }
}
