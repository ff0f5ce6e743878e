//! Approximate class-name matching.
//!
//! Removal patterns such as `"blank"` or `"marker"` rarely match a profile's
//! labels exactly (`"a_blank"`, `"Marker"`). Matching uses a partial
//! substring similarity on a 0-100 scale: the shorter string is aligned
//! against every window of the longer one suggested by their longest common
//! blocks, and the best window's similarity ratio is the score.
//!
//! Both strings are normalized first: every character that is not a letter,
//! digit or underscore becomes a space, the result is lower-cased and
//! trimmed.

use std::collections::HashMap;

/// Minimum score for a pattern to be considered present in a class list.
pub const MATCH_THRESHOLD: u8 = 85;

/// Sequences at least this long have their most frequent elements ignored
/// when seeding block matches.
const POPULARITY_MIN_LEN: usize = 200;

/// Best match of a pattern within a list of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Position of the matched choice
    pub index: usize,

    /// The matched choice, as given (not normalized)
    pub choice: String,

    /// Similarity score, 0-100
    pub score: u8,
}

/// Find the choice most similar to `query` by [`partial_ratio`].
///
/// Ties go to the earliest choice. Returns `None` only when `choices` is
/// empty.
pub fn best_match<S: AsRef<str>>(query: &str, choices: &[S]) -> Option<Match> {
    let query = normalize(query);

    let mut best: Option<Match> = None;
    for (index, choice) in choices.iter().enumerate() {
        let score = partial_ratio(&query, &normalize(choice.as_ref()));
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Match {
                index,
                choice: choice.as_ref().to_string(),
                score,
            });
        }
    }
    best
}

/// Lower-case, replace non-word characters with spaces, trim.
pub fn normalize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

/// Best similarity of the shorter string against any equally long window
/// of the longer one, 0-100.
///
/// Identical strings score 100; otherwise an empty string scores 0.
pub fn partial_ratio(s1: &str, s2: &str) -> u8 {
    if s1 == s2 {
        return 100;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0;
    }

    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let blocks = SequenceMatcher::new(shorter, longer).matching_blocks();
    let mut best = 0.0f64;
    for block in blocks {
        let long_start = block.b.saturating_sub(block.a);
        let long_end = (long_start + shorter.len()).min(longer.len());
        let window = &longer[long_start.min(longer.len())..long_end];

        let r = SequenceMatcher::new(shorter, window).ratio();
        if r > 0.995 {
            return 100;
        }
        best = best.max(r);
    }

    (100.0 * best).round_ties_even() as u8
}

/// Similarity ratio `2 * M / T` of two strings, 0-100.
pub fn ratio(s1: &str, s2: &str) -> u8 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    (100.0 * SequenceMatcher::new(&a, &b).ratio()).round_ties_even() as u8
}

// =============================================================================
// Sequence Matcher
// =============================================================================

/// A run of equal elements: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a: usize,
    b: usize,
    size: usize,
}

/// Longest-common-block matcher in the Ratcliff/Obershelp style.
struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        if b.len() >= POPULARITY_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest block within `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a`
    /// then in `b` on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (a, b) = (self.a, self.b);
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);

        // j2len[j] = length of the match ending at a[i - 1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(c) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied();
                    let k = prev.unwrap_or(0) + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements never seed a block but may extend one
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && a[besti + bestsize] == b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Block {
            a: besti,
            b: bestj,
            size: bestsize,
        }
    }

    /// Non-overlapping matching blocks in increasing order, adjacent blocks
    /// merged, terminated by a zero-size block at `(len(a), len(b))`.
    fn matching_blocks(&self) -> Vec<Block> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.longest_match(alo, ahi, blo, bhi);
            if block.size > 0 {
                blocks.push(block);
                if alo < block.a && blo < block.b {
                    queue.push((alo, block.a, blo, block.b));
                }
                if block.a + block.size < ahi && block.b + block.size < bhi {
                    queue.push((block.a + block.size, ahi, block.b + block.size, bhi));
                }
            }
        }
        blocks.sort();

        let mut merged: Vec<Block> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(Block {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|b| b.size).sum();
        2.0 * matches as f64 / total as f64
    }
}

// =============================================================================
// Tests
// =============================================================================
