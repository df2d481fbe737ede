//! State delta carried by a pending block.
//!
//! The manager only needs two capabilities from a patch: merging with another
//! patch (which may conflict) and looking up a contract. Anything else about
//! the state, such as how it is applied or persisted, belongs to the caller.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::utilities::encoding::{from_hex, to_hex};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    #[error("Contract {0} is changed differently by both patches")]
    Contract(ContractAddress),
    #[error("Patches can't be merged: {0}")]
    Other(String),
}

pub trait Patch: Clone + Default {
    type Contract: Clone;

    /// Combines two deltas into a new one. Neither input is changed.
    fn merge(&self, other: &Self) -> Result<Self, MergeConflict>;

    fn contract(&self, address: &ContractAddress) -> Option<Self::Contract>;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractAddress([u8; 20]);

impl ContractAddress {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        to_hex(self.0)
    }
}

impl From<[u8; 20]> for ContractAddress {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ContractAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s)?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid address length: {}", bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl Display for ContractAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ContractAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContractAddress({})", self.to_hex())
    }
}

impl Serialize for ContractAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContractAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Contract {
    pub balance: u64,
    pub data: Vec<u8>,
}

impl Contract {
    pub fn new(balance: u64, data: Vec<u8>) -> Self {
        Self { balance, data }
    }
}

/// Contract level state delta.
///
/// Two patches conflict when they both set the same contract to different values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct StatePatch {
    contracts: BTreeMap<ContractAddress, Contract>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contract(mut self, address: ContractAddress, contract: Contract) -> Self {
        self.set_contract(address, contract);
        self
    }

    pub fn set_contract(&mut self, address: ContractAddress, contract: Contract) {
        self.contracts.insert(address, contract);
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl Patch for StatePatch {
    type Contract = Contract;

    fn merge(&self, other: &Self) -> Result<Self, MergeConflict> {
        let mut merged = self.clone();
        for (address, contract) in &other.contracts {
            match merged.contracts.get(address) {
                Some(existing) if existing != contract => {
                    return Err(MergeConflict::Contract(*address));
                }
                Some(_) => {}
                None => {
                    merged.contracts.insert(*address, contract.clone());
                }
            }
        }
        Ok(merged)
    }

    fn contract(&self, address: &ContractAddress) -> Option<Contract> {
        self.contracts.get(address).cloned()
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    fn address(byte: u8) -> ContractAddress {
        ContractAddress::new([byte; 20])
    }

    #[test]
    fn test_merge_disjoint() {
        let first = StatePatch::new().with_contract(address(1), Contract::new(10, vec![]));
        let second = StatePatch::new().with_contract(address(2), Contract::new(20, vec![]));

        let merged = first.merge(&second).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.contract(&address(2)), Some(Contract::new(20, vec![])));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_merge_same_value_is_not_conflict() {
        let first = StatePatch::new().with_contract(address(1), Contract::new(10, vec![1]));
        let second = first.clone();

        assert_eq!(first.merge(&second).unwrap(), first);
    }

    #[test]
    fn test_merge_conflict() {
        let first = StatePatch::new().with_contract(address(1), Contract::new(10, vec![]));
        let second = StatePatch::new().with_contract(address(1), Contract::new(11, vec![]));

        assert_matches!(
            first.merge(&second),
            Err(MergeConflict::Contract(conflicting)) if conflicting == address(1)
        );
    }

    #[test]
    fn test_address_from_hex() {
        let parsed: ContractAddress = format!("0x{}", "ab".repeat(20)).parse().unwrap();
        assert_eq!(parsed, address(0xab));
        assert!("abcd".parse::<ContractAddress>().is_err());
    }
}
