//! Finality of pending blocks.
//!
//! Support for a block is counted along every path down from the checked block.
//! Walking a path from the top, the first vertex where the number of distinct conciliums
//! seen so far reaches the quorum becomes stable, together with everything below it.
//!
//! Blocks which lost the race are those outside of the stable subgraph and its descendants
//! whose state conflicts with the stable state. They are removed together with everything
//! built on top of them.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::block::manager::{PendingBlocksError, PendingBlocksManager, Result};
use crate::block::quorum::ConciliumQuorum;
use crate::block::types::{BlockHash, BlockHeader, ConciliumId, Patch};
use crate::logging::pretty_json;

/// A block removed from the pending DAG.
#[derive(Debug, Clone)]
pub struct PendingBlock<P> {
    pub header: BlockHeader,
    pub patch: P,
}

/// Outcome of a successful finality check. Both lists are ordered ancestors first.
#[derive(Debug, Clone)]
pub struct Finality<P> {
    pub stable_blocks: Vec<PendingBlock<P>>,
    pub blocks_to_rollback: Vec<PendingBlock<P>>,
}

impl<P> Finality<P> {
    pub fn stable_hashes(&self) -> HashSet<BlockHash> {
        self.stable_blocks.iter().map(|b| b.header.hash).collect()
    }

    pub fn rollback_hashes(&self) -> HashSet<BlockHash> {
        self.blocks_to_rollback
            .iter()
            .map(|b| b.header.hash)
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct FinalitySummary {
    finalized_by: BlockHash,
    stable: Vec<BlockHash>,
    rollback: Vec<BlockHash>,
}

impl<P: Patch> PendingBlocksManager<P> {
    /// Checks if `hash` collected support of a majority of `num_conciliums`.
    ///
    /// On success stable and rolled back blocks are removed from the DAG and returned.
    /// `Ok(None)` leaves the DAG untouched.
    pub fn check_finality(
        &mut self,
        hash: &BlockHash,
        num_conciliums: usize,
    ) -> Result<Option<Finality<P>>> {
        if !self.dag.has_vertex(hash) {
            return Err(PendingBlocksError::UnknownBlock(*hash));
        }
        let quorum = ConciliumQuorum::new(num_conciliums);

        let stable = self.find_stable(hash, &quorum);
        if stable.is_empty() {
            log::trace!("Block {hash} didn't reach finality");
            return Ok(None);
        }
        let rollback = self.find_rollback(&stable);

        let finality = self.detach(&stable, &rollback);

        log::info!(
            "Block {hash} reached finality: {} stable, {} to rollback",
            finality.stable_blocks.len(),
            finality.blocks_to_rollback.len()
        );
        let summary = FinalitySummary {
            finalized_by: *hash,
            stable: finality.stable_blocks.iter().map(|b| b.header.hash).collect(),
            rollback: finality
                .blocks_to_rollback
                .iter()
                .map(|b| b.header.hash)
                .collect(),
        };
        log::trace!("Finality: {}", pretty_json(&summary));

        Ok(Some(finality))
    }

    /// Searches over (vertex, conciliums seen on the way down) states, each expanded once.
    /// A state reaching the quorum stops the search below it.
    fn find_stable(&self, hash: &BlockHash, quorum: &ConciliumQuorum) -> HashSet<BlockHash> {
        let mut reached = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = match self.dag.vertex(hash) {
            Some(vertex) => vec![(*hash, BTreeSet::from([vertex.concilium_id()]))],
            None => vec![],
        };
        while let Some((current, witnesses)) = stack.pop() {
            //everything below a reached vertex is stable already
            if reached.contains(&current) || visited.contains(&(current, witnesses.clone())) {
                continue;
            }
            if quorum.is_reached(witnesses.len()) {
                reached.insert(current);
                continue;
            }
            let Some(vertex) = self.dag.vertex(&current) else {
                continue;
            };
            for parent in vertex.parents() {
                if let Some(parent_vertex) = self.dag.vertex(parent) {
                    let mut witnesses = witnesses.clone();
                    witnesses.insert(parent_vertex.concilium_id());
                    stack.push((*parent, witnesses));
                }
            }
            visited.insert((current, witnesses));
        }

        let mut stable = self.dag.ancestors_of_all(&reached);
        stable.extend(reached);
        stable
    }

    fn find_rollback(&self, stable: &HashSet<BlockHash>) -> HashSet<BlockHash> {
        let mut merged = P::default();
        for vertex in self.dag.vertices_in_order() {
            if !stable.contains(&vertex.hash()) {
                continue;
            }
            match merged.merge(vertex.patch()) {
                Ok(patch) => merged = patch,
                Err(conflict) => {
                    log::warn!(
                        "Stable block {} conflicts with its stable ancestry: {conflict}",
                        vertex.hash()
                    );
                }
            }
        }

        let built_on_stable = self.dag.descendants_of_all(stable);

        let mut rollback = HashSet::new();
        for vertex in self.dag.vertices_in_order() {
            let hash = vertex.hash();
            if stable.contains(&hash)
                || built_on_stable.contains(&hash)
                || rollback.contains(&hash)
            {
                continue;
            }
            if let Err(conflict) = merged.merge(vertex.patch()) {
                log::debug!("Block {hash} lost to the stable branch: {conflict}");
                rollback.insert(hash);
                rollback.extend(self.dag.descendants(&hash));
            }
        }
        rollback
    }

    fn detach(
        &mut self,
        stable: &HashSet<BlockHash>,
        rollback: &HashSet<BlockHash>,
    ) -> Finality<P> {
        let mut stable_blocks = vec![];
        let mut blocks_to_rollback = vec![];
        for hash in self.dag.hashes_in_order() {
            let target = if stable.contains(&hash) {
                &mut stable_blocks
            } else if rollback.contains(&hash) {
                &mut blocks_to_rollback
            } else {
                continue;
            };
            if let Some(vertex) = self.dag.remove(&hash) {
                let (header, patch) = vertex.into_parts();
                target.push(PendingBlock { header, patch });
            }
        }

        for block in &stable_blocks {
            self.finalized.put(block.header.hash, ());
        }
        self.dag.refresh();

        Finality {
            stable_blocks,
            blocks_to_rollback,
        }
    }
}
