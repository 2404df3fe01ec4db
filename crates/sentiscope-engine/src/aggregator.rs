//! Tallying of resolved comments into a [`Distribution`].

use sentiscope_core::{Distribution, ResolvedSentiment};

/// Accumulates per-comment resolutions in input order.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    distribution: Distribution,
    resolved: Vec<ResolvedSentiment>,
    failed: usize,
}

impl Aggregator {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            distribution: Distribution::new(),
            resolved: Vec::with_capacity(capacity),
            failed: 0,
        }
    }

    /// Count one comment. Failures are counted under their fused (`neutral`)
    /// label and additionally in the failure counter.
    pub fn record(&mut self, resolved: ResolvedSentiment) {
        self.distribution.record(resolved.fused_label);
        if resolved.failed {
            self.failed += 1;
        }
        self.resolved.push(resolved);
    }

    #[must_use]
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Consume the aggregator into `(distribution, per-comment resolutions, failures)`.
    #[must_use]
    pub fn into_parts(self) -> (Distribution, Vec<ResolvedSentiment>, usize) {
        (self.distribution, self.resolved, self.failed)
    }
}
