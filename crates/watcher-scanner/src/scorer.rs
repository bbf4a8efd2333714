use std::collections::BTreeSet;
use watcher_core::{ScanResult, ScoringWeights, SignalBundle};

/// Turns a [`SignalBundle`] into a lead score in `0..=100`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weighted sum of the signals, saturating at [`ScanResult::MAX_SCORE`].
    #[must_use]
    pub fn score(&self, bundle: &SignalBundle) -> u8 {
        let w = &self.weights;
        let technologies = bundle
            .detected_technologies
            .iter()
            .map(|t| t.name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let total = [
            per_item(w.technology, technologies),
            if bundle.hiring_signal { w.hiring } else { 0 },
            per_item(w.growth_signal, bundle.growth_signals.len()),
            per_item(w.social_profile, bundle.social_profiles.len()),
            if bundle.emails.is_empty() { 0 } else { w.contact },
        ]
        .into_iter()
        .fold(0u32, u32::saturating_add);

        u8::try_from(total.min(u32::from(ScanResult::MAX_SCORE))).unwrap_or(ScanResult::MAX_SCORE)
    }
}

fn per_item(weight: u32, count: usize) -> u32 {
    weight.saturating_mul(u32::try_from(count).unwrap_or(u32::MAX))
}
