use log::trace;

/// Strict majority of conciliums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConciliumQuorum {
    pub concilium_count: usize,
    pub threshold: usize,
}

impl ConciliumQuorum {
    pub fn new(concilium_count: usize) -> Self {
        let threshold = concilium_count / 2 + 1;
        trace!("Concilium quorum: concilium_count: {concilium_count}, threshold: {threshold}");
        Self {
            concilium_count,
            threshold,
        }
    }

    pub fn is_reached(&self, witnesses: usize) -> bool {
        witnesses >= self.threshold
    }
}
