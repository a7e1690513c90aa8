use model::{chunk::ChunkJob, records::row::Row};

/// Splits the left rows into ordered chunks of at most `chunk_size` rows.
pub fn plan_chunks(left: Vec<Row>, chunk_size: usize) -> Vec<ChunkJob> {
    let chunk_size = chunk_size.max(1);
    let mut rows = left.into_iter();
    let mut jobs = Vec::new();

    loop {
        let chunk: Vec<Row> = rows.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        jobs.push(ChunkJob::new(jobs.len(), chunk));
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row::from_pairs([("id", i.to_string())]))
            .collect()
    }

    #[test]
    fn splits_into_ordered_chunks() {
        let jobs = plan_chunks(rows(10), 4);
        let sizes: Vec<_> = jobs.iter().map(ChunkJob::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(jobs[2].index, 2);
        assert_eq!(jobs[1].left[0].get("id"), Some("4"));
    }

    #[test]
    fn empty_left_has_no_chunks() {
        assert!(plan_chunks(Vec::new(), 100).is_empty());
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        assert_eq!(plan_chunks(rows(3), 0).len(), 3);
    }
}
