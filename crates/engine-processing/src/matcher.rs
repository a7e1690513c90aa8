use model::{
    matching::{FieldDifference, MatchPartition, MatchRequest, MatchResponse, MatchedPair},
    records::row::Row,
};
use std::{
    collections::{HashMap, VecDeque},
    time::Instant,
};

/// Pairs left rows with right rows by exact key, consuming each right row at
/// most once.
///
/// Duplicate keys pair N-to-N in input order: the n-th left row carrying a
/// key takes the n-th right row carrying it. Surplus left rows go to
/// `left_only`, surplus right rows stay in `right_only`. Rows whose key is
/// blank or missing never match.
pub fn match_rows(
    left: Vec<Row>,
    right: Vec<Row>,
    left_key: &str,
    right_key: &str,
    comparison_columns: &[String],
) -> MatchPartition {
    let mut index: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (position, row) in right.iter().enumerate() {
        if let Some(key) = row.get_non_empty(right_key) {
            index.entry(key.to_string()).or_default().push_back(position);
        }
    }

    let mut pool: Vec<Option<Row>> = right.into_iter().map(Some).collect();
    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for row in left {
        let hit = row
            .get_non_empty(left_key)
            .and_then(|key| index.get_mut(key))
            .and_then(VecDeque::pop_front)
            .and_then(|position| pool[position].take());

        match hit {
            Some(right_row) => {
                let differences = compare(&row, &right_row, comparison_columns);
                matched.push(MatchedPair {
                    left: row,
                    right: right_row,
                    differences,
                });
            }
            None => left_only.push(row),
        }
    }

    MatchPartition {
        matched,
        left_only,
        right_only: pool.into_iter().flatten().collect(),
    }
}

/// Runs one match request and times it.
pub fn execute(request: MatchRequest) -> MatchResponse {
    let started = Instant::now();
    let partition = match_rows(
        request.left_rows,
        request.right_rows,
        &request.left_key_column,
        &request.right_key_column,
        &request.comparison_columns,
    );
    MatchResponse::from_partition(partition, started.elapsed().as_millis() as u64)
}

/// Comparison columns whose trimmed values differ between the two rows.
pub fn compare(left: &Row, right: &Row, columns: &[String]) -> Vec<FieldDifference> {
    columns
        .iter()
        .filter_map(|column| {
            let l = left.get_non_empty(column);
            let r = right.get_non_empty(column);
            (l != r).then(|| FieldDifference {
                column: column.clone(),
                left: l.map(str::to_string),
                right: r.map(str::to_string),
            })
        })
        .collect()
}
