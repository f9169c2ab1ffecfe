//! Path-argument chunking for argv length limits.

/// Length of `args` once joined into a command line, one separator per
/// argument.
pub fn argv_len<S: AsRef<str>>(args: &[S]) -> usize {
    args.iter().map(|arg| arg.as_ref().len() + 1).sum()
}

/// Splits `paths` into consecutive chunks whose serialized length, one
/// separator per path, stays within `max`. A single path longer than `max`
/// forms its own chunk. Order is kept and every path appears in exactly one
/// chunk.
pub fn split_in_chunks<S: AsRef<str>>(paths: &[S], max: usize) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for path in paths {
        let path = path.as_ref();
        let len = path.len() + 1;
        if !current.is_empty() && current_len + len > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += len;
        current.push(path.to_owned());
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_list_is_one_chunk() {
        let chunks = split_in_chunks(&["a", "b", "c"], 30_000);
        assert_eq!(chunks, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn empty_list_has_no_chunks() {
        assert!(split_in_chunks::<&str>(&[], 10).is_empty());
    }

    #[test]
    fn round_trip_preserves_every_path_once() {
        let paths: Vec<String> = (0..500).map(|i| format!("src/module_{i:04}/file.rs")).collect();
        let total = argv_len(&paths);
        let max = 1000;

        let chunks = split_in_chunks(&paths, max);
        assert!(chunks.len() >= total.div_ceil(max));
        for chunk in &chunks {
            assert!(argv_len(chunk) <= max);
        }
        let flattened: Vec<String> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, paths);
    }

    #[test]
    fn separators_count_against_the_budget() {
        let chunks = split_in_chunks(&["abcd", "efgh"], 9);
        assert_eq!(chunks, vec![vec!["abcd"], vec!["efgh"]]);
        assert_eq!(split_in_chunks(&["abcd", "efgh"], 10).len(), 1);
    }

    #[test]
    fn over_long_path_stands_alone() {
        let long = "x".repeat(50);
        let chunks = split_in_chunks(&["a".to_string(), long.clone(), "b".to_string()], 10);
        assert_eq!(chunks, vec![vec!["a".to_string()], vec![long], vec!["b".to_string()]]);
    }
}
