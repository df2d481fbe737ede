use std::collections::HashSet;

use crate::block::manager::PendingBlocksManager;
use crate::block::types::{BlockHash, BlockHeader, ConciliumId, Patch};

impl<P: Patch> PendingBlocksManager<P> {
    /// Tells if producing `candidate` brings state of other conciliums under witness of
    /// the candidate's concilium.
    ///
    /// Walks down from the candidate's pending parents. Own concilium blocks and blocks which
    /// already have a descendant of the candidate's concilium are witnessed, together with
    /// everything below them. The first other concilium's non-empty block which isn't witnessed
    /// is a reason. Empty blocks are passed through.
    pub fn is_reason_to_witness(&self, candidate: &BlockHeader) -> bool {
        let concilium_id = candidate.concilium_id;
        let mut stack = candidate
            .parent_hashes
            .iter()
            .filter(|parent| self.dag.has_vertex(parent))
            .copied()
            .collect::<Vec<_>>();
        let witnessed = self.witnessed_by(concilium_id);
        let mut visited = HashSet::new();

        while let Some(hash) = stack.pop() {
            if !visited.insert(hash) {
                continue;
            }
            let Some(vertex) = self.dag.vertex(&hash) else {
                continue;
            };
            if vertex.concilium_id() == concilium_id || witnessed.contains(&hash) {
                continue;
            }
            if !vertex.is_empty() {
                log::debug!(
                    "Unwitnessed block {hash} of concilium {}",
                    vertex.concilium_id()
                );
                return true;
            }
            stack.extend(vertex.parents().iter().copied());
        }
        false
    }

    /// Blocks with a pending descendant of `concilium_id`.
    fn witnessed_by(&self, concilium_id: ConciliumId) -> HashSet<BlockHash> {
        let own = self
            .dag
            .vertices_in_order()
            .into_iter()
            .filter(|vertex| vertex.concilium_id() == concilium_id)
            .map(|vertex| vertex.hash())
            .collect::<Vec<_>>();
        self.dag.ancestors_of_all(&own)
    }
}
