#![forbid(unsafe_code)]

//! Approximate title matching.
//!
//! Similarity is the Ratcliff/Obershelp "gestalt" ratio over characters:
//! find the longest common contiguous block, recurse on the unmatched text to
//! its left and right, and score `2 * matched / (len(a) + len(b))`. Unlike an
//! edit distance it rewards long shared runs, which suits titles that differ by
//! a dropped or doubled letter.

use std::collections::HashMap;

/// Minimum length of the fixed sequence before over-represented characters
/// stop seeding matches.
const POPULAR_MIN_LEN: usize = 200;

/// Character sequence matcher with a fixed second sequence.
///
/// The second sequence is indexed once, so comparing many candidates against
/// the same query only pays for the index a single time.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    b: Vec<char>,
    /// Positions of each character in `b`, minus popular characters.
    b2j: HashMap<char, Vec<usize>>,
    /// Occurrence count of every character in `b`.
    full_counts: HashMap<char, usize>,
}

impl SequenceMatcher {
    /// Indexes `b` for repeated comparisons.
    pub fn new(b: &str) -> Self {
        let b: Vec<char> = b.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        let mut full_counts: HashMap<char, usize> = HashMap::new();
        for (j, &ch) in b.iter().enumerate() {
            b2j.entry(ch).or_default().push(j);
            *full_counts.entry(ch).or_insert(0) += 1;
        }
        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self {
            b,
            b2j,
            full_counts,
        }
    }

    /// Similarity of `a` against the indexed sequence, in `[0, 1]`.
    pub fn ratio(&self, a: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        score(self.matched_chars(&a), a.len() + self.b.len())
    }

    /// Upper bound on [`ratio`](Self::ratio) from the character multisets.
    pub fn quick_ratio(&self, a: &str) -> f64 {
        let mut available: HashMap<char, isize> = HashMap::new();
        let mut matches = 0usize;
        let mut len = 0usize;
        for ch in a.chars() {
            len += 1;
            let remaining = available
                .entry(ch)
                .or_insert_with(|| self.full_counts.get(&ch).copied().unwrap_or(0) as isize);
            if *remaining > 0 {
                matches += 1;
            }
            *remaining -= 1;
        }
        score(matches, len + self.b.len())
    }

    /// Upper bound on [`ratio`](Self::ratio) from the lengths alone.
    pub fn real_quick_ratio(&self, a: &str) -> f64 {
        let la = a.chars().count();
        let lb = self.b.len();
        score(la.min(lb), la + lb)
    }

    /// Ratio of `a` when it clears `cutoff`, checking the cheap bounds first.
    fn ratio_at_least(&self, a: &str, cutoff: f64) -> Option<f64> {
        if self.real_quick_ratio(a) < cutoff || self.quick_ratio(a) < cutoff {
            return None;
        }
        let ratio = self.ratio(a);
        (ratio >= cutoff).then_some(ratio)
    }

    fn matched_chars(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given windows.
    ///
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let b = &self.b;
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0usize);
        // run length of the match ending at b[j], for the previous row of `a`
        let mut run_ending: HashMap<usize, usize> = HashMap::new();
        for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(ch) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            run_ending = next;
        }

        // popular characters never seed a block but may still extend one
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi
            && best_j + best_k < bhi
            && a[best_i + best_k] == b[best_j + best_k]
        {
            best_k += 1;
        }
        (best_i, best_j, best_k)
    }
}

/// Similarity ratio of `a` against `b`.
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(b).ratio(a)
}

/// Returns up to `n` candidates whose ratio against `word` is at least
/// `cutoff`, best first.
///
/// Equal ratios are ordered by candidate text, greatest first. `cutoff` is
/// clamped into `[0, 1]`.
pub fn close_matches<'a, I>(word: &str, candidates: I, n: usize, cutoff: f64) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if n == 0 {
        return Vec::new();
    }
    let cutoff = cutoff.clamp(0.0, 1.0);
    let matcher = SequenceMatcher::new(word);
    let mut scored: Vec<(f64, &'a str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            matcher
                .ratio_at_least(candidate, cutoff)
                .map(|ratio| (ratio, candidate))
        })
        .collect();
    scored.sort_by(|left, right| {
        right
            .0
            .total_cmp(&left.0)
            .then_with(|| right.1.cmp(left.1))
    });
    scored.truncate(n);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

fn score(matches: usize, len: usize) -> f64 {
    if len == 0 {
        1.0
    } else {
        2.0 * matches as f64 / len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-12
    }

    #[test]
    fn ratio_of_shifted_sequences() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
    }

    #[test]
    fn ratio_bounds() {
        assert!(approx(ratio("", ""), 1.0));
        assert!(approx(ratio("dune", "dune"), 1.0));
        assert!(approx(ratio("abc", "xyz"), 0.0));
        assert!(approx(ratio("abc", ""), 0.0));
    }

    #[test]
    fn ratio_recurses_on_both_sides() {
        // "harry pot" then "er" on the right
        assert!(approx(ratio("harry potter", "harry poter"), 22.0 / 23.0));
        // "ap" then "e"
        assert!(approx(ratio("ape", "appel"), 0.75));
        assert!(approx(ratio("apple", "appel"), 0.8));
    }

    #[test]
    fn quick_ratios_bound_the_real_ratio() {
        let matcher = SequenceMatcher::new("the lord of the rings");
        for candidate in ["the rings of power", "lord jim", "rings", ""] {
            let real = matcher.ratio(candidate);
            assert!(matcher.quick_ratio(candidate) >= real);
            assert!(matcher.real_quick_ratio(candidate) >= matcher.quick_ratio(candidate));
        }
    }

    #[test]
    fn popular_characters_do_not_seed_long_sequences() {
        let long = "a".repeat(250);
        assert!(approx(ratio("xaaa", &long), 0.0));
        let short = "a".repeat(150);
        assert!(approx(ratio("xaaa", &short), 6.0 / 154.0));
    }

    #[test]
    fn close_matches_orders_by_ratio_and_applies_cutoff() {
        let candidates = ["ape", "apple", "peach", "puppy"];
        assert_eq!(
            close_matches("appel", candidates, 3, 0.6),
            vec!["apple", "ape"]
        );
        assert_eq!(close_matches("appel", candidates, 1, 0.6), vec!["apple"]);
        assert!(close_matches("appel", candidates, 3, 0.9).is_empty());
        assert!(close_matches("appel", candidates, 0, 0.0).is_empty());
    }

    #[test]
    fn close_matches_breaks_ties_by_greater_candidate() {
        // both candidates score 2/3 against "abc"
        let candidates = ["abx", "aby"];
        assert_eq!(close_matches("abc", candidates, 2, 0.5), vec!["aby", "abx"]);
    }
}
