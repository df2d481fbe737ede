//! Consensus candidate layer of a ledger extended by several witness groups (conciliums).
//!
//! Blocks which are not final yet are kept by [`PendingBlocksManager`] in a DAG together with
//! the state change each of them makes. Transactions waiting for a block are kept in [`Mempool`].

mod block;

pub mod config;
pub mod logging;
pub mod mempool;
pub mod utilities;

pub mod pending_blocks {
    pub use crate::block::dag::{BlockDag, Vertex};
    pub use crate::block::finality::{Finality, PendingBlock};
    pub use crate::block::manager::{
        BestParents, PendingBlocksError, PendingBlocksManager, Result,
    };
    pub use crate::block::quorum::ConciliumQuorum;
    pub use crate::block::shared::SharedPendingBlocks;
    pub use crate::block::types::{
        BlockHash, BlockHeader, ConciliumId, Contract, ContractAddress, MergeConflict, Patch,
        StatePatch,
    };
}

pub use crate::config::Configuration;
pub use crate::mempool::{Mempool, MempoolError, PoolTransaction, TxHash};
pub use crate::pending_blocks::{
    BestParents, BlockHash, BlockHeader, ConciliumId, Finality, PendingBlocksError,
    PendingBlocksManager, SharedPendingBlocks,
};
