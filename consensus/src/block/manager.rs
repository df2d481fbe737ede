use std::cmp::Reverse;
use std::num::NonZeroUsize;

use lru::LruCache;
use thiserror::Error;

use crate::block::dag::{BlockDag, Vertex};
use crate::block::types::{BlockHash, BlockHeader, ConciliumId, ContractAddress, Patch};
use crate::config::{ParentPolicy, PendingBlocksConfiguration, DEFAULT_FINALIZED_CACHE_SIZE};

pub type Result<T> = std::result::Result<T, PendingBlocksError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PendingBlocksError {
    #[error("Block is already pending: {0}")]
    DuplicateBlock(BlockHash),
    #[error("Block is not pending: {0}")]
    UnknownBlock(BlockHash),
    #[error("Block {block} references unknown parent {parent}")]
    DanglingParent { block: BlockHash, parent: BlockHash },
    #[error("Block {0} has invalid parents: {1}")]
    InvalidParents(BlockHash, String),
}

/// Parents for the next block and the state they add up to.
#[derive(Debug, Clone)]
pub struct BestParents<P> {
    pub parents: Vec<BlockHash>,
    pub merged_patch: P,
}

pub struct PendingBlocksManager<P> {
    pub(crate) config: PendingBlocksConfiguration,
    pub(crate) dag: BlockDag<P>,
    /// Recently finalized blocks and registered roots. Accepted as parents in strict mode.
    pub(crate) finalized: LruCache<BlockHash, ()>,
}

impl<P: Patch> PendingBlocksManager<P> {
    pub fn new(config: PendingBlocksConfiguration) -> Self {
        let cache_size = NonZeroUsize::new(config.finalized_cache_size)
            .or_else(|| NonZeroUsize::new(DEFAULT_FINALIZED_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            dag: BlockDag::new(),
            finalized: LruCache::new(cache_size),
        }
    }

    pub fn dag(&self) -> &BlockDag<P> {
        &self.dag
    }

    pub fn order(&self) -> usize {
        self.dag.order()
    }

    pub fn has_block(&self, hash: &BlockHash) -> bool {
        self.dag.has_vertex(hash)
    }

    pub fn tips(&self) -> Vec<BlockHash> {
        self.dag.tips()
    }

    /// Registers a block outside of the pending set (genesis for example) as a valid parent.
    pub fn add_external_root(&mut self, hash: BlockHash) {
        self.finalized.put(hash, ());
    }

    pub fn add_block(&mut self, header: BlockHeader, patch: P) -> Result<()> {
        let hash = header.hash;
        if self.dag.has_vertex(&hash) {
            return Err(PendingBlocksError::DuplicateBlock(hash));
        }

        header
            .check_parents()
            .map_err(|reason| PendingBlocksError::InvalidParents(hash, reason))?;

        if self.config.parent_policy == ParentPolicy::Strict {
            let dangling = header
                .parent_hashes
                .iter()
                .find(|parent| !self.dag.has_vertex(parent) && !self.finalized.contains(*parent));
            if let Some(parent) = dangling {
                return Err(PendingBlocksError::DanglingParent {
                    block: hash,
                    parent: *parent,
                });
            }
        }

        log::debug!("Adding pending block: {header}");
        self.dag.insert(header, patch);
        log::trace!(
            "Witness below {hash}: {:?}, dag order: {}",
            self.dag.vertex(&hash).map(Vertex::witness_below),
            self.dag.order()
        );
        Ok(())
    }

    /// Drops a single block without deciding anything about the rest of the DAG.
    pub fn remove_block(&mut self, hash: &BlockHash) -> Option<(BlockHeader, P)> {
        let removed = self.dag.remove(hash)?;
        self.dag.refresh();
        log::debug!("Removed pending block: {hash}");
        Some(removed.into_parts())
    }

    pub fn vertex_witness_below(&self, hash: &BlockHash) -> Result<usize> {
        self.dag
            .vertex(hash)
            .map(Vertex::witness_below)
            .ok_or(PendingBlocksError::UnknownBlock(*hash))
    }

    /// Tips from the most to the least preferred.
    pub(crate) fn ordered_tips(&self) -> Vec<BlockHash> {
        let mut tips = self
            .dag
            .tips()
            .into_iter()
            .filter_map(|hash| self.dag.vertex(&hash))
            .collect::<Vec<_>>();
        tips.sort_by_key(|vertex| {
            (
                Reverse(vertex.witness_below()),
                Reverse(vertex.height()),
                vertex.seq(),
            )
        });
        tips.into_iter().map(Vertex::hash).collect()
    }

    /// Greedy selection of tips whose patches merge without conflicts.
    ///
    /// A tip which conflicts with the already accepted ones is skipped and stays a tip.
    pub fn best_parents(&self) -> BestParents<P> {
        let mut merged_patch = P::default();
        let mut parents = vec![];

        for hash in self.ordered_tips() {
            if let Some(max_parents) = self.config.max_block_parents {
                if parents.len() >= max_parents {
                    break;
                }
            }
            let Some(vertex) = self.dag.vertex(&hash) else {
                continue;
            };
            match merged_patch.merge(vertex.patch()) {
                Ok(patch) => {
                    merged_patch = patch;
                    parents.push(hash);
                }
                Err(conflict) => {
                    log::debug!("Tip {hash} is not selected as parent: {conflict}");
                }
            }
        }

        log::trace!("Best parents: {parents:?}");
        BestParents {
            parents,
            merged_patch,
        }
    }

    fn lineage_has_concilium(&self, hash: &BlockHash, concilium_id: ConciliumId) -> bool {
        let is_concilium = |hash: &BlockHash| {
            self.dag
                .vertex(hash)
                .map_or(false, |vertex| vertex.concilium_id() == concilium_id)
        };
        is_concilium(hash) || self.dag.ancestors(hash).iter().any(is_concilium)
    }

    /// The tip whose branch is authoritative for `concilium_id` state.
    pub fn contract_tip(&self, concilium_id: ConciliumId) -> Option<BlockHash> {
        self.ordered_tips()
            .into_iter()
            .find(|tip| self.lineage_has_concilium(tip, concilium_id))
    }

    /// Latest contract state for a concilium, looking only at blocks of that concilium
    /// on the preferred branch. The newest block defining the contract wins.
    pub fn get_contract(
        &self,
        address: &ContractAddress,
        concilium_id: ConciliumId,
    ) -> Option<P::Contract> {
        let tip = self.contract_tip(concilium_id)?;
        let mut lineage = self
            .dag
            .ancestors(&tip)
            .into_iter()
            .chain([tip])
            .filter_map(|hash| self.dag.vertex(&hash))
            .filter(|vertex| vertex.concilium_id() == concilium_id)
            .collect::<Vec<_>>();
        //descending insertion order visits descendants before their ancestors
        lineage.sort_by_key(|vertex| Reverse(vertex.seq()));

        lineage.into_iter().find_map(|vertex| {
            let contract = vertex.patch().contract(address)?;
            log::trace!(
                "Contract {address} for concilium {concilium_id} found in {}",
                vertex.hash()
            );
            Some(contract)
        })
    }
}
