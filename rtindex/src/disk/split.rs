//! Quadratic node split.
//!
//! Works on envelopes only and returns two disjoint sets of indexes into the
//! input, so the same routine splits leaf records and internal entries.

use std::cmp::Ordering;

use super::constants::{FILL_FACTOR, MIN_FILL};
use crate::envelope::Envelope;

/// Minimum records per split half for a node of `capacity`.
pub(crate) fn min_fill(capacity: usize) -> usize {
    ((capacity as f64 * FILL_FACTOR).round() as usize).max(MIN_FILL)
}

/// Partitions `envelopes` into two groups with the quadratic split heuristic.
///
/// Both groups receive at least [`min_fill`] members, clamped to half the
/// input so tiny inputs can always be partitioned.
pub(crate) fn quad_split(envelopes: &[Envelope], capacity: usize) -> (Vec<usize>, Vec<usize>) {
    let count = envelopes.len();
    if count < 2 {
        return ((0..count).collect(), Vec::new());
    }
    let minimum = min_fill(capacity).min(count / 2);

    let (seed_left, seed_right) = pick_seeds(envelopes);
    let mut left = vec![seed_left];
    let mut right = vec![seed_right];
    let mut left_envelope = envelopes[seed_left];
    let mut right_envelope = envelopes[seed_right];
    let mut remaining: Vec<usize> = (0..count)
        .filter(|&i| i != seed_left && i != seed_right)
        .collect();

    while !remaining.is_empty() {
        if left.len() + remaining.len() <= minimum {
            left.append(&mut remaining);
            break;
        }
        if right.len() + remaining.len() <= minimum {
            right.append(&mut remaining);
            break;
        }

        let (position, cost_left, cost_right) =
            pick_next(envelopes, &remaining, &left_envelope, &right_envelope);
        let index = remaining.swap_remove(position);

        let to_left = match cost_left.partial_cmp(&cost_right) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => match left_envelope.area().partial_cmp(&right_envelope.area()) {
                Some(Ordering::Less) => true,
                Some(Ordering::Greater) => false,
                _ => left.len() <= right.len(),
            },
        };

        if to_left {
            left.push(index);
            left_envelope.expand(&envelopes[index]);
        } else {
            right.push(index);
            right_envelope.expand(&envelopes[index]);
        }
    }

    (left, right)
}

/// The pair that would waste the most area if placed in the same group.
fn pick_seeds(envelopes: &[Envelope]) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst = f64::NEG_INFINITY;
    for i in 0..envelopes.len() {
        for j in i + 1..envelopes.len() {
            let waste = envelopes[i].union(&envelopes[j]).area()
                - envelopes[i].area()
                - envelopes[j].area();
            if waste > worst {
                worst = waste;
                seeds = (i, j);
            }
        }
    }
    seeds
}

/// The remaining record with the strongest preference for one group,
/// returned as (position in `remaining`, cost to left, cost to right).
fn pick_next(
    envelopes: &[Envelope],
    remaining: &[usize],
    left: &Envelope,
    right: &Envelope,
) -> (usize, f64, f64) {
    let mut best = (0, 0.0, 0.0);
    let mut best_difference = f64::NEG_INFINITY;
    for (position, &index) in remaining.iter().enumerate() {
        let cost_left = left.enlargement(&envelopes[index]);
        let cost_right = right.enlargement(&envelopes[index]);
        let difference = (cost_left - cost_right).abs();
        if difference > best_difference {
            best_difference = difference;
            best = (position, cost_left, cost_right);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_partition(left: &[usize], right: &[usize], count: usize) {
        let all: HashSet<usize> = left.iter().chain(right).copied().collect();
        assert_eq!(all.len(), count, "groups overlap or drop records");
        assert_eq!(left.len() + right.len(), count);
    }

    #[test]
    fn test_min_fill() {
        assert_eq!(min_fill(2), 2);
        assert_eq!(min_fill(3), 2);
        assert_eq!(min_fill(13), 7);
        assert_eq!(min_fill(291), 146);
    }

    #[test]
    fn test_uniform_overflow_respects_fill_factor() {
        for capacity in [3usize, 4, 10, 13, 17, 50] {
            let envelopes: Vec<Envelope> = (0..=capacity)
                .map(|i| {
                    let x = i as f64 * 2.0;
                    Envelope::new(x, 0.0, x + 1.0, 1.0)
                })
                .collect();
            let (left, right) = quad_split(&envelopes, capacity);
            assert_partition(&left, &right, capacity + 1);
            let minimum = min_fill(capacity).min((capacity + 1) / 2);
            assert!(left.len() >= minimum, "left {} < {}", left.len(), minimum);
            assert!(right.len() >= minimum, "right {} < {}", right.len(), minimum);
        }
    }

    #[test]
    fn test_separates_two_clusters() {
        let mut envelopes = Vec::new();
        for i in 0..5 {
            let d = i as f64 * 0.1;
            envelopes.push(Envelope::new(d, d, d + 0.5, d + 0.5));
            envelopes.push(Envelope::new(100.0 + d, 100.0 + d, 100.5 + d, 100.5 + d));
        }
        let (left, right) = quad_split(&envelopes, 9);
        assert_partition(&left, &right, 10);

        let near_origin = |i: &usize| envelopes[*i].min_x < 50.0;
        assert!(left.iter().all(near_origin) || left.iter().all(|i| !near_origin(i)));
        assert!(right.iter().all(near_origin) || right.iter().all(|i| !near_origin(i)));
    }

    #[test]
    fn test_seeds_are_most_wasteful_pair() {
        let envelopes = vec![
            Envelope::new(0.0, 0.0, 1.0, 1.0),
            Envelope::new(0.5, 0.5, 1.5, 1.5),
            Envelope::new(10.0, 10.0, 11.0, 11.0),
        ];
        assert_eq!(pick_seeds(&envelopes), (0, 2));
    }

    #[test]
    fn test_points_split() {
        let envelopes: Vec<Envelope> = (0..18)
            .map(|i| Envelope::from_point(i as f64, (i * i) as f64))
            .collect();
        let (left, right) = quad_split(&envelopes, 17);
        assert_partition(&left, &right, 18);
        assert!(left.len() >= 9 && right.len() >= 9);
    }
}
