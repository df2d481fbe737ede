use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::utilities::hash::HashType;

pub type BlockHash = HashType;

/// Identifier of a witness group.
pub type ConciliumId = u32;

/// The part of a block the pending blocks manager cares about.
///
/// Identity is `hash`. A header is immutable once it is added to the manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockHeader {
    pub hash: BlockHash,
    pub concilium_id: ConciliumId,
    /// Ordered. The first parent which is pending is the primary parent.
    pub parent_hashes: Vec<BlockHash>,
    /// Block carries no state changing transactions.
    pub is_empty: bool,
}

impl BlockHeader {
    pub fn new(
        hash: BlockHash,
        concilium_id: ConciliumId,
        parent_hashes: Vec<BlockHash>,
        is_empty: bool,
    ) -> Self {
        Self {
            hash,
            concilium_id,
            parent_hashes,
            is_empty,
        }
    }

    pub(crate) fn check_parents(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.parent_hashes.len());
        for parent in &self.parent_hashes {
            if *parent == self.hash {
                return Err("block references itself".to_string());
            }
            if !seen.insert(parent) {
                return Err(format!("duplicate parent {parent}"));
            }
        }
        Ok(())
    }
}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hash = &self.hash;
        let concilium_id = self.concilium_id;
        let nr_of_parents = self.parent_hashes.len();
        let is_empty = self.is_empty;
        write!(
            f,
            "hash: {hash}, concilium: {concilium_id}, parents: {nr_of_parents}, empty: {is_empty}",
        )
    }
}
