#[cfg(test)]
mod tests {
    use engine_config::settings::AnalyzerSettings;
    use engine_processing::{
        CanonicalKeyBuilder, KeyCandidateAnalyzer, KeyColumns,
        keys::direction::{DirectionOutcome, DirectionRule, DirectionRules},
    };
    use model::records::{dataset::Dataset, row::Row};
    use tracing_test::traced_test;

    fn line(date: &str, amount: &str, party: &str, kind: &str) -> Row {
        Row::from_pairs([("date", date), ("amount", amount), ("party", party), ("type", kind)])
    }

    fn columns() -> KeyColumns {
        KeyColumns::new("date", "amount", "party").with_operation_type("type")
    }

    // Scenario: two rows with the same date, amount, counterparty and direction.
    // Expected Outcome: keys end in 1 and 2 and are never equal.
    #[traced_test]
    #[test]
    fn tc01_duplicates_are_disambiguated() {
        let mut builder = CanonicalKeyBuilder::new(columns());
        let first = builder.build(&line("2024-03-01", "-42.10", "Initech", "card"));
        let second = builder.build(&line("01/03/2024", "-42.1", "INITECH", "card"));

        assert_eq!(first.base, second.base);
        assert!(first.key.ends_with("debit1"), "{}", first.key);
        assert!(second.key.ends_with("debit2"), "{}", second.key);
        assert_ne!(first.key, second.key);
    }

    // Scenario: a custom rule table replaces the default keywords.
    // Expected Outcome: the injected rule decides the direction before the amount sign.
    #[traced_test]
    #[test]
    fn tc02_direction_rules_are_injectable() {
        let mut rules = DirectionRules::sign_only();
        rules.push(DirectionRule::new(["refund"], DirectionOutcome::Credit));

        let mut builder = CanonicalKeyBuilder::with_rules(columns(), rules);
        let refund = builder.build(&line("2024-03-01", "-10", "Shop", "Card REFUND"));
        let compensation = builder.build(&line("2024-03-01", "10", "Shop", "compensation"));

        assert!(refund.key.ends_with("credit1"));
        // no compensation rule in this table, so the positive amount wins
        assert!(compensation.key.ends_with("credit2"));
    }

    // Scenario: both datasets share a column of unique, identical ids next to unrelated columns.
    // Expected Outcome: that pair ranks first with confidence >= 0.90.
    #[traced_test]
    #[test]
    fn tc03_shared_unique_id_scores_high() {
        let left: Dataset = (0..500)
            .map(|i| {
                Row::from_pairs([
                    ("ID", format!("{:08}", 10_000 + i)),
                    ("booked", format!("2024-01-{:02}", 1 + i % 28)),
                    ("memo", format!("invoice batch {}", i % 9)),
                ])
            })
            .collect();
        let right: Dataset = (0..500)
            .rev()
            .map(|i| {
                Row::from_pairs([
                    ("ID", format!("{:08}", 10_000 + i)),
                    ("channel", ["web", "branch", "phone"][i % 3].to_string()),
                ])
            })
            .collect();

        let analyzer = KeyCandidateAnalyzer::default();
        let candidates = analyzer.analyze(&left, &right);

        assert_eq!(candidates[0].left_column, "ID");
        assert_eq!(candidates[0].right_column, "ID");
        assert!(candidates[0].confidence >= 0.90, "{}", candidates[0].confidence);
        assert!(analyzer.select_automatic(&candidates).is_some());
    }

    // Scenario: the best pair scores below a raised unattended threshold.
    // Expected Outcome: candidates are still reported, but none is selected automatically.
    #[traced_test]
    #[test]
    fn tc04_threshold_gates_automatic_selection() {
        let left: Dataset = (0..50)
            .map(|i| Row::from_pairs([("code", format!("A{}", i % 5))]))
            .collect();
        let right: Dataset = (0..50)
            .map(|i| Row::from_pairs([("label", format!("A{}", i % 25))]))
            .collect();

        let analyzer = KeyCandidateAnalyzer::new(AnalyzerSettings {
            auto_threshold: 0.99,
            ..Default::default()
        });
        let candidates = analyzer.analyze(&left, &right);

        assert!(!candidates.is_empty());
        assert!(candidates[0].confidence < 0.99);
        assert!(analyzer.select_automatic(&candidates).is_none());
    }
}
