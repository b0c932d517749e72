use indexmap::IndexMap;
use log::debug;

/// Per-opcode dispatch counters, in first-dispatch order. Cheap enough to
/// keep on in every build; the summary is only emitted when asked.
#[derive(Default)]
pub struct DispatchStats {
    counts: IndexMap<&'static str, u64>,
}

impl DispatchStats {
    pub fn new() -> Self {
        DispatchStats::default()
    }

    pub fn record(&mut self, name: &'static str) {
        *self.counts.entry(name).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Emit one debug line per dispatched opcode, in first-seen order
    pub fn log_summary(&self) {
        debug!("dispatched {} instructions total", self.total());
        for (name, count) in &self.counts {
            debug!("  {:<22} {}", name, count);
        }
    }
}
