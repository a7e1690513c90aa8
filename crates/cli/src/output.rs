use crate::error::CliError;
use model::candidate::KeyCandidate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)
}

/// Writes `value` as pretty JSON to `path`, or to stdout without one.
pub async fn emit<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), CliError> {
    let json = to_json(value)?;
    match path {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), "Wrote result");
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn print_candidates(candidates: &[KeyCandidate], threshold: f64) {
    if candidates.is_empty() {
        println!("No compatible column pairs found.");
        return;
    }

    println!(
        "{:<4} {:<24} {:<24} {:>10} {:<20} {}",
        "#", "Left", "Right", "Confidence", "Transform", "Samples"
    );
    println!("{}", "-".repeat(100));
    for (rank, c) in candidates.iter().enumerate() {
        let marker = if c.meets(threshold) { "*" } else { " " };
        println!(
            "{:<4} {:<24} {:<24} {:>9.2}{} {:<20} {} / {}",
            rank + 1,
            c.left_column,
            c.right_column,
            c.confidence,
            marker,
            c.transformation.as_deref().unwrap_or("-"),
            c.sample_values.left.join(", "),
            c.sample_values.right.join(", "),
        );
    }
    println!("\n* confident enough for automatic selection (>= {threshold:.2})");
}
