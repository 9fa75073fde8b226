//! Probability distribution synthesis for detailed results.
//!
//! Neither backend reports calibrated per-label probabilities, so the
//! detailed result is synthesized around the selected label: it receives a
//! random share in `[0.70, 0.95]`, each other label takes a random fraction
//! (at most half) of what is left, and the last label absorbs the remainder
//! so the values sum to one.  The selected label is always the maximum.

use std::collections::BTreeMap;

use rand::Rng;

pub const MAIN_SHARE_MIN: f64 = 0.70;
pub const MAIN_SHARE_MAX: f64 = 0.95;

/// Largest fraction of the remaining mass a single other label may take.
const OTHER_SHARE_MAX: f64 = 0.5;

/// Build a label → probability map over `labels ∪ {selected}`.
pub fn synthesize<R: Rng + ?Sized>(
    selected: &str,
    labels: &[String],
    rng: &mut R,
) -> BTreeMap<String, f64> {
    let mut others: Vec<&str> = labels
        .iter()
        .map(String::as_str)
        .filter(|l| *l != selected)
        .collect();
    others.dedup();

    let mut dist = BTreeMap::new();
    if others.is_empty() {
        dist.insert(selected.to_string(), 1.0);
        return dist;
    }

    let main = rng.gen_range(MAIN_SHARE_MIN..=MAIN_SHARE_MAX);
    dist.insert(selected.to_string(), main);

    let mut remaining = 1.0 - main;
    let last = others.len() - 1;
    for (i, label) in others.into_iter().enumerate() {
        let share = if i == last {
            remaining
        } else {
            rng.gen::<f64>() * remaining * OTHER_SHARE_MAX
        };
        remaining -= share;
        *dist.entry(label.to_string()).or_insert(0.0) += share;
    }
    dist
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
