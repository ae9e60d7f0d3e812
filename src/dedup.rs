use rand::seq::IndexedRandom;
use rapidfuzz::distance::indel;

use crate::llm::{DistractorSet, GenerationError};
use crate::wordlist::WordPair;

/// Pairs scoring at or above this partial-ratio are considered duplicates.
pub const DUPLICATES_THRESHOLD: f64 = 90.0;

/// Regeneration calls run hotter than the initial one to diversify retries.
pub const REGENERATION_TEMPERATURE: f32 = 1.2;

/// The remote generation capability. The deduplication loop only sees this
/// trait, so tests drive it with scripted fakes instead of a live API.
#[allow(async_fn_in_trait)]
pub trait DistractorSource {
    async fn generate(
        &self,
        pair: &WordPair,
        count: usize,
        temperature: f32,
    ) -> Result<DistractorSet, GenerationError>;
}

/// Partial-ratio similarity in [0, 100]: the best indel alignment of the
/// shorter string against any same-length window of the longer one, so a
/// distractor embedded in a longer one ("озеро" in "крещенское озеро")
/// scores 100.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (short, long) = {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.len() <= b.len() { (a, b) } else { (b, a) }
    };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let window = short.len();
    let mut best = 0.0_f64;
    for start in 0..=(long.len() - window) {
        let score = indel::normalized_similarity(
            short.iter().copied(),
            long[start..start + window].iter().copied(),
        );
        best = best.max(score);
    }

    best * 100.0
}

pub fn is_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) >= threshold
}

/// Splits distractors into (kept, duplicates) in generation order. An item is
/// a duplicate when it scores at or above the threshold against any earlier
/// kept item, so the earliest of a duplicate chain always survives.
pub fn split_duplicates(distractors: &[String], threshold: f64) -> (Vec<String>, Vec<String>) {
    let mut kept: Vec<String> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();

    for candidate in distractors {
        if kept.iter().any(|k| is_duplicate(k, candidate, threshold)) {
            duplicates.push(candidate.clone());
        } else {
            kept.push(candidate.clone());
        }
    }

    (kept, duplicates)
}

/// Removes near-duplicate distractors from the set and asks `source` for
/// replacements, at most `trials` times. Best effort: when the budget runs
/// out, remaining open slots are backfilled from the removed duplicates, so
/// the finalized set never exceeds `count` and this function never fails.
pub async fn deduplicate_distractors<S: DistractorSource>(
    source: &S,
    set: &mut DistractorSet,
    count: usize,
    trials: usize,
    threshold: f64,
) {
    let translation = set.pair.translation.clone();
    set.distractors.retain(|d| *d != translation);
    set.distractors.truncate(count);

    let (mut kept, duplicates) = split_duplicates(&set.distractors, threshold);
    if duplicates.is_empty() {
        return;
    }

    for _ in 0..trials {
        if kept.len() >= count {
            break;
        }
        let missing = count - kept.len();
        let Ok(batch) = source
            .generate(&set.pair, missing, REGENERATION_TEMPERATURE)
            .await
        else {
            // A failed call spends the trial
            continue;
        };

        for candidate in batch.distractors {
            if kept.len() >= count {
                break;
            }
            if candidate == translation {
                continue;
            }
            if kept.iter().any(|k| is_duplicate(k, &candidate, threshold)) {
                continue;
            }
            kept.push(candidate);
        }
    }

    // Out of budget: better a near-duplicate than an empty slot
    if kept.len() < count {
        let missing = count - kept.len();
        let mut rng = rand::rng();
        kept.extend(duplicates.choose_multiple(&mut rng, missing).cloned());
    }

    set.distractors = kept;
}
