//! Dictionary trainer
//!
//! COVER-style segment selection. Every 8-byte d-mer is scored by the
//! number of distinct samples containing it; d-mers confined to a single
//! sample score zero. The concatenated corpus is split into epochs and each
//! epoch contributes the segment whose distinct d-mers score highest. The
//! d-mers of a chosen segment are zeroed so later segments cover new
//! content. Segments are laid out in ascending score, leaving the best one
//! at the end of the content, closest to the data being compressed.
//!
//! Selection only performs lookups in hash maps, so the result depends on
//! nothing but the samples, their order and the target size.

use super::{Dictionary, EntropyTables};
use crate::compress::sample_statistics;
use crate::entropy::Code;
use crate::params::DEFAULT_LEVEL;
use crate::{CodecError, Result};
use std::collections::{HashMap, HashSet};

/// D-mer length
const DMER: usize = 8;

/// Preferred segment length
const SEGMENT_SIZE: usize = 1024;

/// Smallest accepted dictionary size
const MIN_TARGET_SIZE: usize = 256;

#[inline]
fn dmer_key(data: &[u8]) -> u64 {
    let mut bytes = [0u8; DMER];
    bytes.copy_from_slice(&data[..DMER]);
    u64::from_le_bytes(bytes)
}

/// Corpus view used during segment selection
struct Corpus {
    data: Vec<u8>,
    /// D-mer starting at each position, `None` where it would cross a sample boundary
    keys: Vec<Option<u64>>,
    scores: HashMap<u64, u32>,
}

impl Corpus {
    fn new<S: AsRef<[u8]>>(samples: &[S]) -> Self {
        let total: usize = samples.iter().map(|s| s.as_ref().len()).sum();
        let mut data = Vec::with_capacity(total);
        let mut keys = Vec::with_capacity(total);
        let mut scores: HashMap<u64, u32> = HashMap::new();
        let mut seen = HashSet::new();

        for sample in samples {
            let sample = sample.as_ref();
            seen.clear();
            for pos in 0..sample.len() {
                if pos + DMER <= sample.len() {
                    let key = dmer_key(&sample[pos..]);
                    keys.push(Some(key));
                    if seen.insert(key) {
                        *scores.entry(key).or_insert(0) += 1;
                    }
                } else {
                    keys.push(None);
                }
            }
            data.extend_from_slice(sample);
        }

        // Content private to one sample is worth nothing
        for score in scores.values_mut() {
            if *score < 2 {
                *score = 0;
            }
        }
        Self { data, keys, scores }
    }

    #[inline]
    fn score_of(&self, key: u64) -> u64 {
        self.scores.get(&key).copied().unwrap_or(0) as u64
    }

    /// Best segment of `segment` bytes starting in `begin..end`
    fn best_segment(&self, begin: usize, end: usize, segment: usize) -> Option<(u64, usize)> {
        let last_start = end.min(self.data.len().checked_sub(segment)? + 1);
        if begin >= last_start {
            return None;
        }
        let span = segment - DMER + 1;
        let mut active: HashMap<u64, u32> = HashMap::new();
        let mut score = 0u64;

        let add = |key: Option<u64>, active: &mut HashMap<u64, u32>, score: &mut u64| {
            if let Some(key) = key {
                let count = active.entry(key).or_insert(0);
                if *count == 0 {
                    *score += self.score_of(key);
                }
                *count += 1;
            }
        };
        for pos in begin..begin + span {
            add(self.keys[pos], &mut active, &mut score);
        }

        let mut best = (score, begin);
        for start in begin + 1..last_start {
            if let Some(key) = self.keys[start - 1] {
                if let Some(count) = active.get_mut(&key) {
                    *count -= 1;
                    if *count == 0 {
                        score -= self.score_of(key);
                    }
                }
            }
            add(self.keys[start + span - 1], &mut active, &mut score);
            if score > best.0 {
                best = (score, start);
            }
        }
        (best.0 > 0).then_some(best)
    }

    fn zero_segment(&mut self, start: usize, segment: usize) {
        for pos in start..start + segment - DMER + 1 {
            if let Some(key) = self.keys[pos] {
                if let Some(score) = self.scores.get_mut(&key) {
                    *score = 0;
                }
            }
        }
    }
}

/// Choose segments and lay them out as dictionary content
fn select_content<S: AsRef<[u8]>>(samples: &[S], target_size: usize) -> Result<Vec<u8>> {
    let mut corpus = Corpus::new(samples);
    let segment = SEGMENT_SIZE.min(target_size).min(corpus.data.len());
    if segment < DMER {
        return Err(CodecError::TrainingFailed(format!(
            "corpus of {} bytes is too small",
            corpus.data.len()
        )));
    }

    let epochs = (target_size / segment).clamp(1, (corpus.data.len() / segment).max(1));
    let epoch_size = corpus.data.len() / epochs;
    log::debug!(
        "training on {} bytes: {epochs} epochs of {epoch_size} bytes, {segment} byte segments",
        corpus.data.len()
    );

    // (score, selection order, start)
    let mut chosen: Vec<(u64, usize, usize)> = Vec::new();
    let mut filled = 0usize;
    'passes: loop {
        let mut progress = false;
        for epoch in 0..epochs {
            if filled >= target_size {
                break 'passes;
            }
            let begin = epoch * epoch_size;
            let Some((score, start)) = corpus.best_segment(begin, begin + epoch_size, segment) else {
                continue;
            };
            corpus.zero_segment(start, segment);
            chosen.push((score, chosen.len(), start));
            filled += segment;
            progress = true;
            log::trace!("epoch {epoch}: segment at {start} scores {score}");
        }
        if !progress {
            break;
        }
    }

    if chosen.is_empty() {
        return Err(CodecError::TrainingFailed(
            "no content recurs across samples".to_string(),
        ));
    }

    chosen.sort_by_key(|&(score, order, _)| (score, std::cmp::Reverse(order)));
    let mut content = Vec::with_capacity(target_size);
    // Drop the weakest segments first when over the target
    let mut budget = target_size;
    let mut kept = Vec::new();
    for &(_, _, start) in chosen.iter().rev() {
        if budget == 0 {
            break;
        }
        let take = segment.min(budget);
        kept.push(&corpus.data[start + segment - take..start + segment]);
        budget -= take;
    }
    for piece in kept.iter().rev() {
        content.extend_from_slice(piece);
    }
    Ok(content)
}

/// Entropy tables fitted to how the samples parse against `content`
fn build_tables<S: AsRef<[u8]>>(content: &[u8], samples: &[S], level: i32) -> Result<EntropyTables> {
    let views: Vec<&[u8]> = samples.iter().map(|s| s.as_ref()).collect();
    let mut stats = sample_statistics(content, &views, level)?;
    // Every symbol stays encodable
    let smooth = |table: &mut [u32]| table.iter_mut().for_each(|f| *f += 1);
    smooth(&mut stats.literals);
    smooth(&mut stats.literal_lengths);
    smooth(&mut stats.match_lengths);
    smooth(&mut stats.offsets);
    Ok(EntropyTables {
        literals: Code::build(&stats.literals)?,
        literal_lengths: Code::build(&stats.literal_lengths)?,
        match_lengths: Code::build(&stats.match_lengths)?,
        offsets: Code::build(&stats.offsets)?,
    })
}

/// Train a dictionary of at most `target_size` bytes for the default level
pub fn train_dictionary<S: AsRef<[u8]>>(samples: &[S], target_size: usize) -> Result<Dictionary> {
    train_dictionary_for_level(samples, target_size, DEFAULT_LEVEL)
}

/// Train a dictionary whose entropy tables are tuned for `level`
pub fn train_dictionary_for_level<S: AsRef<[u8]>>(
    samples: &[S],
    target_size: usize,
    level: i32,
) -> Result<Dictionary> {
    if samples.is_empty() {
        return Err(CodecError::EmptyInput);
    }
    if target_size < MIN_TARGET_SIZE {
        return Err(CodecError::config(format!(
            "dictionary size {target_size} is below the minimum of {MIN_TARGET_SIZE}"
        )));
    }

    let content = select_content(samples, target_size)?;
    let tables = build_tables(&content, samples, level)?;
    let dictionary = Dictionary::with_tables(content, Some(tables))?;
    log::debug!(
        "trained dictionary {:#010x}: {} bytes from {} samples",
        dictionary.id(),
        dictionary.content().len(),
        samples.len()
    );
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Vec<u8>> {
        (0..200)
            .map(|i| {
                format!(
                    "{{\"id\":{i},\"type\":\"event\",\"source\":\"sensor-{}\",\"status\":\"ok\",\"value\":{}}}",
                    i % 7,
                    i * 31 % 1000
                )
                .into_bytes()
            })
            .collect()
    }

    #[test]
    fn test_empty_samples() {
        let none: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(train_dictionary(&none, 4096), Err(CodecError::EmptyInput)));
    }

    #[test]
    fn test_target_too_small() {
        assert!(matches!(
            train_dictionary(&samples(), 100),
            Err(CodecError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_unique_samples_fail() {
        let unique: Vec<Vec<u8>> = (0..10u8).map(|i| vec![i; 1]).collect();
        assert!(matches!(train_dictionary(&unique, 1024), Err(CodecError::TrainingFailed(_))));
    }

    #[test]
    fn test_recurring_content_selected() {
        let dict = train_dictionary(&samples(), 2048).unwrap();
        assert!(dict.content().len() <= 2048);
        let text = String::from_utf8_lossy(dict.content());
        assert!(text.contains("\"type\":\"event\""));
        assert!(dict.tables().is_some());
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = train_dictionary(&samples(), 1024).unwrap();
        let b = train_dictionary(&samples(), 1024).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_best_segment_prefers_shared_dmers() {
        let shared = b"shared-shared-shared";
        let s1 = [b"aaaaaaaaaaaaaaaaaaaa".as_slice(), shared].concat();
        let s2 = [shared.as_slice(), b"zzzzzzzzzzzzzzzzzzzz"].concat();
        let corpus = Corpus::new(&[s1, s2]);
        let (score, start) = corpus.best_segment(0, 40, 16).unwrap();
        assert!(score > 0);
        assert!(start >= 12, "segment at {start}");
    }
}
