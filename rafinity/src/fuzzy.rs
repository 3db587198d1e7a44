//! Approximate field matching (Bitap with error levels).
//!
//! Each field is scored on a 0..=1 distance scale: `errors / pattern_len`
//! plus how far the hit drifted from the expected location, divided by the
//! distance window. A field matches when its best hit scores at or under the
//! threshold and the characters it shares with the pattern form a run of at
//! least `min_match_len`.
//!
//! Patterns longer than `max_pattern_len` are searched in chunks; the field
//! matches if any chunk does, and its score is the mean over chunks.

use std::collections::HashMap;

use crate::config::FuzzyConfig;

/// Score floor for a non-identical hit, so only identical text scores 0.
const MIN_FUZZY_SCORE: f64 = 0.001;

/// A searchable field, lowercased once at index build
#[derive(Debug, Clone)]
pub(crate) struct FieldText {
    lower: String,
    chars: Vec<char>,
    /// Length norm: 1/sqrt(token count), rounded to 3 places
    norm: f64,
}

impl FieldText {
    /// None for blank text, which never matches anything
    pub(crate) fn new(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let lower = text.to_lowercase();
        let chars = lower.chars().collect();
        Some(Self {
            norm: field_norm(&lower),
            lower,
            chars,
        })
    }

    pub(crate) fn norm(&self) -> f64 {
        self.norm
    }
}

fn field_norm(text: &str) -> f64 {
    let tokens = text.split(' ').filter(|t| !t.is_empty()).count().max(1);
    let norm = 1.0 / (tokens as f64).sqrt();
    (norm * 1000.0).round() / 1000.0
}

struct PatternChunk {
    chars: Vec<char>,
    /// Bit `len - i - 1` set for every position `i` holding the char
    alphabet: HashMap<char, u64>,
    start: usize,
}

impl PatternChunk {
    fn new(chars: &[char], start: usize) -> Self {
        let len = chars.len();
        let mut alphabet: HashMap<char, u64> = HashMap::new();
        for (i, c) in chars.iter().enumerate() {
            *alphabet.entry(*c).or_insert(0) |= 1u64 << (len - i - 1);
        }
        Self {
            chars: chars.to_vec(),
            alphabet,
            start,
        }
    }
}

/// A compiled query, reusable across every field of every entry
pub(crate) struct BitapPattern {
    lower: String,
    chunks: Vec<PatternChunk>,
}

impl BitapPattern {
    pub(crate) fn new(pattern: &str, max_pattern_len: usize) -> Self {
        let lower = pattern.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let len = chars.len();
        let max = max_pattern_len.clamp(1, crate::config::MAX_BITS);

        let mut chunks = Vec::new();
        if len <= max {
            if len > 0 {
                chunks.push(PatternChunk::new(&chars, 0));
            }
        } else {
            let remainder = len % max;
            let end = len - remainder;
            let mut i = 0;
            while i < end {
                chunks.push(PatternChunk::new(&chars[i..i + max], i));
                i += max;
            }
            // Tail chunk overlaps the previous one so it is full width
            if remainder > 0 {
                let start = len - max;
                chunks.push(PatternChunk::new(&chars[start..], start));
            }
        }

        Self { lower, chunks }
    }

    /// Score one field. None when the field does not match.
    pub(crate) fn score(&self, field: &FieldText, config: &FuzzyConfig) -> Option<f64> {
        if self.chunks.is_empty() {
            return None;
        }
        if self.lower == field.lower {
            return Some(0.0);
        }

        let mut total = 0.0;
        let mut matched = false;
        for chunk in &self.chunks {
            let hit = search_chunk(&field.chars, chunk, config.location + chunk.start, config);
            match hit {
                Some(score) => {
                    matched = true;
                    total += score;
                }
                None => total += 1.0,
            }
        }

        // A long pattern only matches if the chunk mean still clears the threshold
        let mean = total / self.chunks.len() as f64;
        (matched && mean <= config.threshold).then_some(mean)
    }
}

fn compute_score(pattern_len: usize, errors: usize, current: usize, expected: usize, distance: usize) -> f64 {
    let accuracy = errors as f64 / pattern_len as f64;
    let proximity = expected.abs_diff(current);
    if distance == 0 {
        return if proximity > 0 { 1.0 } else { accuracy };
    }
    accuracy + proximity as f64 / distance as f64
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = haystack.len() - needle.len();
    (from..=last).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// True if the mask holds a run of at least `min_len` set entries
fn has_run(mask: &[bool], min_len: usize) -> bool {
    let mut run = 0;
    for &hit in mask {
        if hit {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Bitap over one chunk. Returns the best accepted score, if any.
fn search_chunk(text: &[char], chunk: &PatternChunk, location: usize, config: &FuzzyConfig) -> Option<f64> {
    let pattern_len = chunk.chars.len();
    let text_len = text.len();
    let distance = config.distance;
    let expected = location.min(text_len);

    let mut threshold = config.threshold;
    let mut match_mask = vec![false; text_len];

    // Exact occurrences tighten the threshold before the fuzzy pass
    let mut from = expected;
    while let Some(index) = find_chars(text, &chunk.chars, from) {
        let score = compute_score(pattern_len, 0, index, expected, distance);
        threshold = threshold.min(score);
        from = index + pattern_len;
        match_mask[index..index + pattern_len].fill(true);
    }

    let mut best: Option<f64> = None;
    let mut bin_max = pattern_len + text_len;
    let mask = 1u64 << (pattern_len - 1);
    let mut last_bits: Vec<u64> = Vec::new();

    for errors in 0..pattern_len {
        // Widest window in which a hit with this many errors could still pass
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if compute_score(pattern_len, errors, expected + bin_mid, expected, distance) <= threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = (expected as isize - bin_mid as isize + 1).max(1) as usize;
        let finish = (expected + bin_mid).min(text_len) + pattern_len;

        let mut bits = vec![0u64; finish + 2];
        bits[finish + 1] = (1u64 << errors) - 1;

        let mut j = finish;
        while j >= start {
            let current = j - 1;
            let char_match = text
                .get(current)
                .and_then(|c| chunk.alphabet.get(c))
                .copied()
                .unwrap_or(0);
            if current < text_len {
                match_mask[current] = char_match != 0;
            }

            bits[j] = ((bits[j + 1] << 1) | 1) & char_match;
            if errors > 0 {
                let prev_next = last_bits.get(j + 1).copied().unwrap_or(0);
                let prev = last_bits.get(j).copied().unwrap_or(0);
                bits[j] |= ((prev_next | prev) << 1) | 1 | prev_next;
            }

            if bits[j] & mask != 0 {
                let score = compute_score(pattern_len, errors, current, expected, distance);
                if score <= threshold {
                    threshold = score;
                    best = Some(score);
                    if current <= expected {
                        break;
                    }
                    start = (2 * expected as isize - current as isize).max(1) as usize;
                }
            }
            j -= 1;
        }

        // One more error can't beat what we already have
        if compute_score(pattern_len, errors + 1, expected, expected, distance) > threshold {
            break;
        }
        last_bits = bits;
    }

    let score = best?;
    if !has_run(&match_mask, config.min_match_len) {
        return None;
    }
    Some(score.max(MIN_FUZZY_SCORE))
}
