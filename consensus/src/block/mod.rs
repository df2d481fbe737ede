//! # Pending blocks
//!
//! Before a block becomes part of permanent history it lives in the pending DAG.
//! Several independent witness groups (conciliums) extend the DAG concurrently,
//! possibly with conflicting state changes. A block is final when enough
//! conciliums have built on top of it.
//!
//! ## What the manager decides
//!
//! 1. Which tips can be merged into the parent set of the next block without state
//!    conflicts (`best_parents`).
//! 2. Whether producing a witness block right now adds information for other
//!    conciliums (`is_reason_to_witness`).
//! 3. When a block reached a majority of conciliums, which blocks become stable and
//!    which competing forks lost (`check_finality`).
//! 4. The latest contract state for a concilium across unsettled branches (`get_contract`).
//!
//! ## Determinism
//!
//! Independently running nodes must reach the same decisions from the same DAG.
//! Tips are always ordered by witness count below, then by pending chain height,
//! then by insertion order, and parent selection is a greedy scan in that order.
//! It is not a search for the largest conflict free subset of tips.
//!
//! ## Witness count below
//!
//! The number of distinct conciliums on the walk from a vertex down through its
//! primary parents (first pending parent in header order). It's memoized at insertion
//! from the primary parent and recomputed only when finality removes vertices.
//!
//! ## Ownership of finalized and rolled back blocks
//!
//! Finality removes both sets from the DAG and hands them to the caller. Stable blocks
//! are persisted by the caller. Transactions of rolled back blocks go back to the mempool,
//! also by the caller.

pub(crate) mod dag;
pub(crate) mod finality;
pub(crate) mod manager;
pub(crate) mod quorum;
pub(crate) mod shared;
pub(crate) mod types;
pub(crate) mod witness;
