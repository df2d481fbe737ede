pub(crate) mod header;
pub(crate) mod patch;

pub use header::{BlockHash, BlockHeader, ConciliumId};
pub use patch::{Contract, ContractAddress, MergeConflict, Patch, StatePatch};
