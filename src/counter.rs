//! Sequence-node naming helpers shared by `DistributedBag` and `LeaderQueue`.
//!
//! Zookeeper sequence znodes are named `<prefix><10 decimal digits>`, with the
//! counter assigned by the server and zero padded to a fixed width. These
//! helpers encode/decode that scheme and compute the few order statistics the
//! two primitives need (maximum id, predecessor of a given id) without ever
//! touching zookeeper directly.

const WIDTH: usize = 10;

/// Value used to mean "no id" (empty child list, no predecessor).
pub const NONE: i64 = -1;

/// Render `prefix` followed by `n` zero-padded to `WIDTH` digits.
///
/// # Panics
/// If `n` is negative or does not fit in `WIDTH` decimal digits.
pub fn counter_path(prefix: &str, n: i64) -> String {
    assert!(n >= 0, "counter_path requires a non-negative sequence number");
    assert!(n < 10i64.pow(WIDTH as u32), "counter_path sequence number does not fit in {} digits", WIDTH);
    format!("{}{:0width$}", prefix, n, width = WIDTH)
}

/// Recover the sequence number from the trailing `WIDTH` digits of `path`.
///
/// `path` may be a bare child name or a full znode path; only the trailing
/// digits are inspected.
pub fn counter_value(path: &str) -> Option<i64> {
    if path.len() < WIDTH {
        return None;
    }
    let (_, digits) = path.split_at(path.len() - WIDTH);
    digits.parse().ok()
}

/// The greatest sequence number among `children`, or `NONE` if empty or none parse.
pub fn max_counter<'a, I: IntoIterator<Item = &'a String>>(children: I) -> i64 {
    children
        .into_iter()
        .filter_map(|child| counter_value(child))
        .max()
        .unwrap_or(NONE)
}

/// The greatest sequence number among `children` that is strictly less than `pos`.
///
/// Returns `NONE` if there is no such child.
pub fn min_predecessor<'a, I: IntoIterator<Item = &'a String>>(children: I, pos: i64) -> i64 {
    children
        .into_iter()
        .filter_map(|child| counter_value(child))
        .filter(|&value| value < pos)
        .max()
        .unwrap_or(NONE)
}

#[cfg(test)]
mod tests {
    use super::counter_path;
    use super::counter_value;
    use super::max_counter;
    use super::min_predecessor;
    use super::NONE;

    #[test]
    fn round_trip_sample_values() {
        for n in [0i64, 1, 9, 42, 1_000_000, 9_999_999_999] {
            let path = counter_path("item", n);
            assert_eq!(path.len(), "item".len() + 10);
            assert_eq!(counter_value(&path), Some(n));
        }
    }

    #[test]
    fn round_trip_exhaustive_small_range() {
        for n in 0..10_000i64 {
            let path = counter_path("candidate", n);
            assert_eq!(counter_value(&path), Some(n));
        }
    }

    #[test]
    #[should_panic]
    fn rejects_negative() {
        counter_path("item", -1);
    }

    #[test]
    fn max_counter_of_empty_is_none() {
        let children: Vec<String> = Vec::new();
        assert_eq!(max_counter(&children), NONE);
    }

    #[test]
    fn max_counter_picks_largest() {
        let children = vec![
            counter_path("item", 3),
            counter_path("item", 1),
            counter_path("item", 7),
        ];
        assert_eq!(max_counter(&children), 7);
    }

    #[test]
    fn min_predecessor_picks_largest_smaller_value() {
        let children = vec![
            counter_path("candidate", 1),
            counter_path("candidate", 3),
            counter_path("candidate", 7),
        ];
        assert_eq!(min_predecessor(&children, 5), 3);
        assert_eq!(min_predecessor(&children, 1), NONE);
        assert_eq!(min_predecessor(&children, 100), 7);
    }

    #[test]
    fn ignores_non_counter_children() {
        let children = vec!["not-a-counter".to_string(), counter_path("item", 2)];
        assert_eq!(max_counter(&children), 2);
    }
}
