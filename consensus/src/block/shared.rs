use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::block::finality::Finality;
use crate::block::manager::{BestParents, PendingBlocksManager, Result};
use crate::block::types::{BlockHash, BlockHeader, ConciliumId, ContractAddress, Patch};
use crate::config::PendingBlocksConfiguration;

/// Pending blocks manager shared between threads.
///
/// Every call holds the one lock for its whole duration. Use [`SharedPendingBlocks::lock`]
/// when several calls must see the same DAG, for example `best_parents` followed by `add_block`.
pub struct SharedPendingBlocks<P> {
    inner: Arc<Mutex<PendingBlocksManager<P>>>,
}

impl<P> Clone for SharedPendingBlocks<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Patch> From<PendingBlocksManager<P>> for SharedPendingBlocks<P> {
    fn from(manager: PendingBlocksManager<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }
}

impl<P: Patch> SharedPendingBlocks<P> {
    pub fn new(config: PendingBlocksConfiguration) -> Self {
        PendingBlocksManager::new(config).into()
    }

    pub fn lock(&self) -> MutexGuard<'_, PendingBlocksManager<P>> {
        self.inner.lock()
    }

    pub fn add_block(&self, header: BlockHeader, patch: P) -> Result<()> {
        self.lock().add_block(header, patch)
    }

    pub fn best_parents(&self) -> BestParents<P> {
        self.lock().best_parents()
    }

    pub fn is_reason_to_witness(&self, candidate: &BlockHeader) -> bool {
        self.lock().is_reason_to_witness(candidate)
    }

    pub fn check_finality(
        &self,
        hash: &BlockHash,
        num_conciliums: usize,
    ) -> Result<Option<Finality<P>>> {
        self.lock().check_finality(hash, num_conciliums)
    }

    pub fn get_contract(
        &self,
        address: &ContractAddress,
        concilium_id: ConciliumId,
    ) -> Option<P::Contract> {
        self.lock().get_contract(address, concilium_id)
    }

    pub fn order(&self) -> usize {
        self.lock().order()
    }

    pub fn tips(&self) -> Vec<BlockHash> {
        self.lock().tips()
    }
}
