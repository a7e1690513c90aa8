use crate::analysis::{
    profile::ColumnProfile,
    score::{confidence, score},
    transforms::{TRANSFORMS, ValueTransform, find},
};
use engine_config::settings::AnalyzerSettings;
use model::{
    candidate::{KeyCandidate, SampleValues, ScoreBreakdown, Uniqueness},
    records::dataset::Dataset,
};
use tracing::{debug, info};

/// Ranks left/right column pairs by how likely they are to join the datasets.
#[derive(Debug, Clone, Default)]
pub struct KeyCandidateAnalyzer {
    settings: AnalyzerSettings,
}

impl KeyCandidateAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Self {
        KeyCandidateAnalyzer { settings }
    }

    pub fn from_settings(settings: &AnalyzerSettings) -> Self {
        Self::new(settings.clone())
    }

    pub fn auto_threshold(&self) -> f64 {
        self.settings.auto_threshold
    }

    /// Scores every type-compatible column pair over bounded samples of both
    /// datasets and returns the candidates, best first.
    pub fn analyze(&self, left: &Dataset, right: &Dataset) -> Vec<KeyCandidate> {
        let left_sample = left.sample(self.settings.sample_size);
        let right_sample = right.sample(self.settings.sample_size);

        let left_profiles: Vec<ColumnProfile> = left
            .columns()
            .iter()
            .map(|c| ColumnProfile::from_rows(c, left_sample.iter().copied()))
            .collect();
        let right_profiles: Vec<ColumnProfile> = right
            .columns()
            .iter()
            .map(|c| ColumnProfile::from_rows(c, right_sample.iter().copied()))
            .collect();

        let mut candidates = Vec::new();
        for l in left_profiles.iter().filter(|p| !p.is_empty()) {
            for r in right_profiles.iter().filter(|p| !p.is_empty()) {
                if !l.kind.compatible(r.kind) {
                    debug!(
                        left = %l.column,
                        right = %r.column,
                        "Skipping type-incompatible column pair"
                    );
                    continue;
                }
                candidates.push(self.evaluate(l, r));
            }
        }

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        match candidates.first() {
            Some(top) => info!(
                candidates = candidates.len(),
                left = %top.left_column,
                right = %top.right_column,
                confidence = top.confidence,
                transformation = ?top.transformation,
                "Key candidate analysis complete"
            ),
            None => info!("Key candidate analysis found no compatible column pairs"),
        }
        candidates
    }

    /// Re-scores a candidate against the full datasets, applying its
    /// transform. Returns a new candidate; the input is left as is.
    pub fn confirm(&self, candidate: &KeyCandidate, left: &Dataset, right: &Dataset) -> KeyCandidate {
        let transform = candidate.transformation.as_deref().and_then(find);
        let left_profile = ColumnProfile::from_rows(&candidate.left_column, left);
        let left_profile = match transform {
            Some(t) => transformed(&left_profile, t),
            None => left_profile,
        };
        let right_profile = ColumnProfile::from_rows(&candidate.right_column, right);

        let breakdown = score(&left_profile, &right_profile);
        let confirmed = self.candidate(
            &left_profile,
            &right_profile,
            breakdown,
            transform.map(|t| t.name.to_string()),
        );

        info!(
            left = %confirmed.left_column,
            right = %confirmed.right_column,
            sampled = candidate.confidence,
            confirmed = confirmed.confidence,
            "Confirmed key candidate on full datasets"
        );
        confirmed
    }

    /// The top candidate, if it is confident enough for unattended runs.
    pub fn select_automatic<'a>(&self, candidates: &'a [KeyCandidate]) -> Option<&'a KeyCandidate> {
        candidates
            .first()
            .filter(|top| top.meets(self.settings.auto_threshold))
    }

    fn evaluate(&self, left: &ColumnProfile, right: &ColumnProfile) -> KeyCandidate {
        let mut best = score(left, right);
        let mut best_score = confidence(&best);
        let mut best_transform: Option<&ValueTransform> = None;
        let mut best_left: Option<ColumnProfile> = None;

        for transform in TRANSFORMS {
            let candidate_profile = transformed(left, transform);
            let breakdown = score(&candidate_profile, right);
            let value = confidence(&breakdown);
            // only a strict improvement justifies rewriting the left values
            if value > best_score {
                best = breakdown;
                best_score = value;
                best_transform = Some(transform);
                best_left = Some(candidate_profile);
            }
        }

        self.candidate(
            best_left.as_ref().unwrap_or(left),
            right,
            best,
            best_transform.map(|t| t.name.to_string()),
        )
    }

    fn candidate(
        &self,
        left: &ColumnProfile,
        right: &ColumnProfile,
        breakdown: ScoreBreakdown,
        transformation: Option<String>,
    ) -> KeyCandidate {
        let limit = self.settings.max_samples_per_candidate;
        KeyCandidate {
            left_column: left.column.clone(),
            right_column: right.column.clone(),
            confidence: confidence(&breakdown),
            uniqueness: Uniqueness {
                left: left.uniqueness(),
                right: right.uniqueness(),
            },
            sample_values: SampleValues {
                left: left.samples(limit),
                right: right.samples(limit),
            },
            transformation,
            breakdown,
        }
    }
}

fn transformed(profile: &ColumnProfile, transform: &ValueTransform) -> ColumnProfile {
    ColumnProfile::from_values(
        &profile.column,
        profile.values.iter().map(|v| transform.apply(v)),
    )
}
