use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio, `2 * matched / (len(a) + len(b))`.
    #[default]
    SequenceRatio,
    JaroWinkler,
    NormalizedLevenshtein,
}

impl SimilarityMetric {
    /// Case-insensitive, symmetric score in `[0, 1]`.
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::SequenceRatio => sequence_ratio(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase()),
            Self::NormalizedLevenshtein => {
                strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
            }
        }
    }
}

/// Ratio of characters covered by the longest common blocks of `a` and `b`,
/// compared case-insensitively.
///
/// The longest common run is found first, then the same search recurses into
/// the unmatched text on either side of it. Two empty strings score `1.0`.
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Block search prefers the leftmost match in its first argument, which
    // can make the count order-dependent; a fixed order keeps the score symmetric.
    let matched = if a <= b {
        matching_characters(&a, &b)
    } else {
        matching_characters(&b, &a)
    };

    2.0 * matched as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, alo, ahi, b, blo, bhi);
        if k == 0 {
            continue;
        }

        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common run in `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
/// Among runs of equal length the one starting earliest in `a`, then in `b`,
/// wins.
fn longest_match(
    a: &[char],
    alo: usize,
    ahi: usize,
    b: &[char],
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let len = prev[col - 1] + 1;
                curr[col] = len;
                if len > best_len {
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                    best_len = len;
                }
            } else {
                curr[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_strings_score_one() {
        for s in ["", "a", "Catherine Jones", "Ünïcödé", "aaaa"] {
            assert!(approx_eq(sequence_ratio(s, s), 1.0), "{s}");
        }
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert!(approx_eq(sequence_ratio("abc", "xyz"), 0.0));
        assert!(approx_eq(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn test_known_ratios() {
        // "atherine jones" is shared: 2 * 14 / 30
        assert!(approx_eq(
            sequence_ratio("Catherine Jones", "Katherine Jones"),
            28.0 / 30.0
        ));
        // "ab" then "d": 2 * 3 / 8
        assert!(approx_eq(sequence_ratio("abcd", "abxd"), 0.75));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(approx_eq(sequence_ratio("ACME Corp", "acme corp"), 1.0));
        assert!(approx_eq(
            sequence_ratio("John SMITH", "jon smith"),
            sequence_ratio("john smith", "JON SMITH")
        ));
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("Catherine Jones", "Katherine Jones"),
            ("abcd", "bcda"),
            ("International Business Machines", "IBM"),
            ("tide", "diet"),
            ("Acme Holdings", "Acme Holding Co"),
        ];

        for (a, b) in pairs {
            assert_eq!(sequence_ratio(a, b), sequence_ratio(b, a), "{a} / {b}");
        }
    }

    #[test]
    fn test_recursion_collects_both_sides() {
        // "xx" left of the "abc" anchor and "yy" right of it
        assert!(approx_eq(sequence_ratio("xxabcyy", "xxQabcQyy"), 14.0 / 16.0));
    }

    #[test]
    fn test_alternate_metrics() {
        for metric in [SimilarityMetric::JaroWinkler, SimilarityMetric::NormalizedLevenshtein] {
            assert!(approx_eq(metric.score("Acme", "ACME"), 1.0));
            let ab = metric.score("Catherine Jones", "Katherine Jones");
            let ba = metric.score("Katherine Jones", "Catherine Jones");
            assert!(approx_eq(ab, ba));
            assert!(ab > 0.75);
        }
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::SequenceRatio);
    }
}
