use std::collections::HashMap;

use concilium_consensus::mempool::WitnessGroupId;
use concilium_consensus::pending_blocks::{Contract, ContractAddress, Patch, StatePatch};
use concilium_consensus::{
    BlockHash, BlockHeader, Configuration, ConciliumId, Mempool, PoolTransaction,
    SharedPendingBlocks, TxHash,
};
use serde::Serialize;

const NUM_CONCILIUMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Transfer {
    nonce: u64,
    group: WitnessGroupId,
    address: ContractAddress,
    balance: u64,
}

impl Transfer {
    fn new(group: WitnessGroupId, address: ContractAddress, balance: u64) -> Self {
        Self {
            nonce: rand::random(),
            group,
            address,
            balance,
        }
    }
}

impl PoolTransaction for Transfer {
    fn hash(&self) -> TxHash {
        TxHash::of(self).expect("transfer is serializable")
    }

    fn witness_group_id(&self) -> WitnessGroupId {
        self.group
    }

    fn verify(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Node {
    pending: SharedPendingBlocks<StatePatch>,
    mempool: Mempool<Transfer>,
    block_txns: HashMap<BlockHash, Vec<Transfer>>,
}

impl Node {
    fn new() -> Self {
        let configuration = Configuration::try_load_from_str(
            r#"
            [pending_blocks]
            parent_policy = "permissive"

            [mempool]
            max_tx_count = 100
            "#,
        )
        .unwrap();
        Self {
            pending: SharedPendingBlocks::new(configuration.pending_blocks),
            mempool: Mempool::new(configuration.mempool),
            block_txns: HashMap::new(),
        }
    }

    /// Builds a block of `concilium_id` on top of `parents` from its mempool transactions.
    fn produce(&mut self, concilium_id: ConciliumId, parents: Vec<BlockHash>) -> BlockHeader {
        let txns = self.mempool.get_final_txns(concilium_id);
        let mut patch = StatePatch::new();
        for tx in &txns {
            patch.set_contract(tx.address, Contract::new(tx.balance, vec![]));
        }
        let hashes = txns.iter().map(PoolTransaction::hash).collect::<Vec<_>>();
        let hash = BlockHash::of(&(concilium_id, &parents, &hashes)).unwrap();
        let header = BlockHeader::new(hash, concilium_id, parents, txns.is_empty());

        self.pending.add_block(header.clone(), patch).unwrap();
        self.mempool.remove_for_block(&hashes);
        self.block_txns.insert(hash, txns);
        header
    }
}

#[test]
fn test_conflicting_branch_is_rolled_back_into_mempool() {
    concilium_consensus::logging::init();

    let mut node = Node::new();
    let contested = ContractAddress::new([1; 20]);
    let other = ContractAddress::new([2; 20]);

    let first = Transfer::new(1, contested, 1);
    let second = Transfer::new(2, contested, 2);
    let third = Transfer::new(0, other, 3);
    for tx in [&first, &second, &third] {
        node.mempool.add_tx(tx.clone()).unwrap();
    }

    //conciliums 1 and 2 produce concurrently
    let block1 = node.produce(1, vec![]);
    let block2 = node.produce(2, vec![]);
    assert!(!node.mempool.has_tx(&second.hash()));
    assert_eq!(
        node.pending.get_contract(&contested, 1),
        Some(Contract::new(1, vec![]))
    );

    let best = node.pending.best_parents();
    assert_eq!(best.parents, vec![block1.hash]);

    let candidate = BlockHeader::new(
        BlockHash::digest(b"candidate"),
        0,
        best.parents.clone(),
        false,
    );
    assert!(node.pending.is_reason_to_witness(&candidate));
    let block3 = node.produce(0, best.parents);

    let finality = node
        .pending
        .check_finality(&block3.hash, NUM_CONCILIUMS)
        .unwrap()
        .expect("two conciliums out of three");

    let stable = finality.stable_hashes();
    assert_eq!(stable.len(), 1);
    assert!(stable.contains(&block1.hash));
    assert_eq!(
        finality.rollback_hashes().into_iter().collect::<Vec<_>>(),
        vec![block2.hash]
    );

    let rolled_back = finality
        .blocks_to_rollback
        .iter()
        .flat_map(|block| node.block_txns.remove(&block.header.hash).unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(node.mempool.return_txns(rolled_back), 1);
    assert!(node.mempool.has_tx(&second.hash().to_hex()));

    assert_eq!(node.pending.tips(), vec![block3.hash]);
    assert_eq!(node.pending.get_contract(&contested, 1), None);
    assert_eq!(
        node.pending.get_contract(&other, 0).map(|contract| contract.balance),
        Some(3)
    );

    let merged = finality
        .stable_blocks
        .iter()
        .try_fold(StatePatch::new(), |acc, block| acc.merge(&block.patch))
        .unwrap();
    assert_eq!(merged.contract(&contested), Some(Contract::new(1, vec![])));
}
