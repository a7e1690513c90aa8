use model::{
    records::{dataset::Dataset, row::Row},
    result::ReconciliationResult,
};

/// Small deterministic generator; keeps fixtures stable without a rand dependency.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound.max(1)
    }
}

/// Back-office rows keyed by `ref`. Keys are drawn from a range smaller than
/// the row count, so duplicates are common.
pub fn ledger(rows: usize, key_space: u64, seed: u64) -> Dataset {
    let mut rng = Lcg::new(seed);
    (0..rows)
        .map(|i| {
            Row::from_pairs([
                ("ref", format!("T{:06}", rng.below(key_space))),
                ("line", format!("L{i:06}")),
                ("amount", format!("{}.{:02}", rng.below(5_000), rng.below(100))),
            ])
        })
        .collect()
}

/// Partner rows keyed by `reference`, drawn from the same key space.
pub fn statement(rows: usize, key_space: u64, seed: u64) -> Dataset {
    let mut rng = Lcg::new(seed);
    (0..rows)
        .map(|i| {
            Row::from_pairs([
                ("reference", format!("T{:06}", rng.below(key_space))),
                ("line", format!("S{i:06}")),
                ("amount", format!("{}.{:02}", rng.below(5_000), rng.below(100))),
            ])
        })
        .collect()
}

fn canonical<'a>(rows: impl Iterator<Item = &'a Row>) -> Vec<String> {
    let mut out: Vec<String> = rows.map(|r| serde_json::to_string(r).unwrap()).collect();
    out.sort();
    out
}

/// Every left row ends up matched or left-only, every right row matched or
/// right-only, each exactly once, and matched pairs agree on the key.
pub fn assert_conserved(result: &ReconciliationResult, left: &Dataset, right: &Dataset) {
    assert_eq!(result.total_matches + result.left_only.len(), left.len());
    assert_eq!(result.total_matches + result.right_only.len(), right.len());

    let seen_left = canonical(
        result
            .matches
            .iter()
            .map(|p| &p.left)
            .chain(result.left_only.iter()),
    );
    assert_eq!(seen_left, canonical(left.iter()));

    let seen_right = canonical(
        result
            .matches
            .iter()
            .map(|p| &p.right)
            .chain(result.right_only.iter()),
    );
    assert_eq!(seen_right, canonical(right.iter()));

    for pair in &result.matches {
        assert_eq!(pair.left.get("ref"), pair.right.get("reference"));
    }
}

/// Line ids of a partition, in order.
pub fn lines(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r.get("line").unwrap_or_default()).collect()
}
