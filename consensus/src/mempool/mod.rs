//! Transactions waiting to be included in a block.
//!
//! The pool is bounded in two ways, by the number of transactions and by their age.
//! Both bounds are applied by [`Mempool::purge_txns`], the pool doesn't evict on insert.
//!
//! Transactions are kept in insertion order. Lookups don't change the order, so the
//! least recently inserted transaction is always the first one evicted.

use lru::LruCache;
use thiserror::Error;

use crate::config::MempoolConfiguration;
use crate::utilities::time::{Clock, SystemClock};

pub(crate) mod transaction;

pub use transaction::{AsTxHash, PoolTransaction, TxHash, WitnessGroupId};

pub type Result<T> = std::result::Result<T, MempoolError>;

#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("Transaction is already in the mempool: {0}")]
    DuplicateTx(TxHash),
    #[error("Invalid transaction {hash}: {source}")]
    InvalidTx {
        hash: TxHash,
        source: anyhow::Error,
    },
    #[error("Invalid transaction hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, Clone)]
struct PoolEntry<T> {
    tx: T,
    inserted_at: u64,
}

pub struct Mempool<T, C = SystemClock> {
    config: MempoolConfiguration,
    clock: C,
    /// Most recently inserted first.
    transactions: LruCache<TxHash, PoolEntry<T>>,
}

impl<T: PoolTransaction> Mempool<T, SystemClock> {
    pub fn new(config: MempoolConfiguration) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<T: PoolTransaction, C: Clock> Mempool<T, C> {
    pub fn with_clock(config: MempoolConfiguration, clock: C) -> Self {
        Self {
            config,
            clock,
            transactions: LruCache::unbounded(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Checks that `tx` would be accepted, without adding it.
    pub fn validate_tx(&self, tx: &T) -> Result<()> {
        let hash = tx.hash();
        if self.transactions.contains(&hash) {
            return Err(MempoolError::DuplicateTx(hash));
        }
        tx.verify()
            .map_err(|source| MempoolError::InvalidTx { hash, source })
    }

    pub fn add_tx(&mut self, tx: T) -> Result<()> {
        self.validate_tx(&tx)?;

        let hash = tx.hash();
        log::debug!("Adding transaction to mempool: {hash}");
        let entry = PoolEntry {
            tx,
            inserted_at: self.clock.now_millis(),
        };
        self.transactions.put(hash, entry);

        log::debug!("Mempool size: {}", self.transactions.len());
        Ok(())
    }

    /// Malformed hashes are never in the pool.
    pub fn has_tx<H: AsTxHash + ?Sized>(&self, hash: &H) -> bool {
        hash.as_tx_hash()
            .map_or(false, |hash| self.transactions.contains(&hash))
    }

    pub fn get_tx<H: AsTxHash + ?Sized>(&self, hash: &H) -> Option<&T> {
        let hash = hash.as_tx_hash().ok()?;
        self.transactions.peek(&hash).map(|entry| &entry.tx)
    }

    pub fn remove_tx<H: AsTxHash + ?Sized>(&mut self, hash: &H) -> Result<Option<T>> {
        let hash = hash
            .as_tx_hash()
            .map_err(|err| MempoolError::InvalidHash(err.to_string()))?;
        Ok(self.transactions.pop(&hash).map(|entry| entry.tx))
    }

    /// Removes transactions included in a block.
    pub fn remove_for_block(&mut self, hashes: &[TxHash]) {
        log::trace!(
            "Mempool size before removing block transactions {}",
            self.transactions.len()
        );
        for hash in hashes {
            if self.transactions.pop(hash).is_none() {
                log::warn!("Transaction not found in mempool: {hash}");
            }
        }
        log::trace!(
            "Mempool size after removing block transactions {}",
            self.transactions.len()
        );
    }

    /// Transactions for `group`, oldest first. The pool is not changed.
    pub fn get_final_txns(&self, group: WitnessGroupId) -> Vec<T> {
        self.transactions
            .iter()
            .rev()
            .filter(|(_, entry)| entry.tx.witness_group_id() == group)
            .map(|(_, entry)| entry.tx.clone())
            .collect()
    }

    /// Evicts expired transactions, then the oldest ones above the count limit.
    /// Returns how many were evicted.
    pub fn purge_txns(&mut self) -> usize {
        let now = self.clock.now_millis();
        let lifetime = self.config.tx_lifetime_millis();

        let expired = self
            .transactions
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.inserted_at) > lifetime)
            .map(|(hash, _)| *hash)
            .collect::<Vec<_>>();
        for hash in &expired {
            self.transactions.pop(hash);
        }

        let mut evicted = expired.len();
        while self.transactions.len() > self.config.max_tx_count {
            match self.transactions.pop_lru() {
                Some((hash, _)) => log::trace!("Evicted transaction over the limit: {hash}"),
                None => break,
            }
            evicted += 1;
        }

        if evicted > 0 {
            log::debug!(
                "Purged {evicted} transactions ({} expired), mempool size: {}",
                expired.len(),
                self.transactions.len()
            );
        }
        evicted
    }

    /// Puts back transactions of rolled back blocks. Returns how many were accepted.
    pub fn return_txns<I: IntoIterator<Item = T>>(&mut self, txns: I) -> usize {
        let mut accepted = 0;
        for tx in txns {
            match self.add_tx(tx) {
                Ok(()) => accepted += 1,
                Err(err) => log::debug!("Transaction not returned to mempool: {err}"),
            }
        }
        accepted
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::rc::Rc;

    use assert_matches::assert_matches;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct DummyTx {
        nonce: u64,
        group: WitnessGroupId,
        signed: bool,
    }

    impl DummyTx {
        fn new(group: WitnessGroupId) -> Self {
            Self {
                nonce: rand::random(),
                group,
                signed: true,
            }
        }

        fn unsigned() -> Self {
            Self {
                signed: false,
                ..Self::new(0)
            }
        }
    }

    impl PoolTransaction for DummyTx {
        fn hash(&self) -> TxHash {
            TxHash::digest(&self.nonce.to_le_bytes())
        }

        fn witness_group_id(&self) -> WitnessGroupId {
            self.group
        }

        fn verify(&self) -> anyhow::Result<()> {
            anyhow::ensure!(self.signed, "transaction is not signed");
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u64>>);

    impl ManualClock {
        fn advance_secs(&self, secs: u64) {
            self.0.set(self.0.get() + secs * 1000);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.get()
        }
    }

    fn mempool(max_tx_count: usize) -> (Mempool<DummyTx, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let config = MempoolConfiguration::new(max_tx_count, 5);
        (Mempool::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_add_tx() {
        let (mut mempool, _) = mempool(10);
        let tx = DummyTx::new(0);

        mempool.add_tx(tx.clone()).unwrap();

        assert!(mempool.has_tx(&tx.hash()));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_add_duplicate_tx() {
        let (mut mempool, _) = mempool(10);
        let tx = DummyTx::new(0);

        mempool.add_tx(tx.clone()).unwrap();

        assert_matches!(mempool.add_tx(tx), Err(MempoolError::DuplicateTx(_)));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_validate_unsigned_tx() {
        let (mempool, _) = mempool(10);
        let tx = DummyTx::unsigned();

        assert_matches!(
            mempool.validate_tx(&tx),
            Err(MempoolError::InvalidTx { hash, .. }) if hash == tx.hash()
        );
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_lookup_by_hex_and_bytes() {
        let (mut mempool, _) = mempool(10);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2.clone()).unwrap();

        assert!(mempool.has_tx(&tx1.hash().to_hex()));
        assert!(mempool.has_tx(tx1.hash().to_hex().as_str()));
        assert!(mempool.has_tx(tx2.hash().as_bytes()));
        assert!(mempool.has_tx(&tx2.hash().as_bytes()[..]));
        assert!(!mempool.has_tx("definitely not hex"));
    }

    #[test]
    fn test_remove_for_block() {
        let (mut mempool, _) = mempool(10);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        let tx3 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2.clone()).unwrap();
        mempool.add_tx(tx3.clone()).unwrap();

        mempool.remove_for_block(&[tx1.hash(), tx2.hash(), TxHash::digest(b"unknown")]);

        assert!(!mempool.has_tx(&tx1.hash()));
        assert!(!mempool.has_tx(&tx2.hash()));
        assert!(mempool.has_tx(&tx3.hash()));
    }

    #[test]
    fn test_remove_tx() {
        let (mut mempool, _) = mempool(10);
        let tx = DummyTx::new(0);
        mempool.add_tx(tx.clone()).unwrap();

        assert_matches!(
            mempool.remove_tx("0x12"),
            Err(MempoolError::InvalidHash(_))
        );
        assert_eq!(mempool.remove_tx(&tx.hash().to_hex()).unwrap(), Some(tx));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_get_tx() {
        let (mut mempool, _) = mempool(10);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2).unwrap();

        assert_eq!(mempool.get_tx(&tx1.hash()), Some(&tx1));
        assert!(mempool.get_tx(&TxHash::digest(b"unknown")).is_none());
    }

    #[test]
    fn test_get_final_txns_of_group() {
        let (mut mempool, _) = mempool(10);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        let tx3 = DummyTx::new(2);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2.clone()).unwrap();
        mempool.add_tx(tx3.clone()).unwrap();

        //lookups don't change the order
        mempool.get_tx(&tx1.hash());

        assert_eq!(mempool.get_final_txns(0), vec![tx1, tx2]);
        assert_eq!(mempool.get_final_txns(2), vec![tx3]);
        assert!(mempool.get_final_txns(1).is_empty());
        assert_eq!(mempool.len(), 3);
    }

    #[test]
    fn test_purge_oldest_over_limit() {
        let (mut mempool, _) = mempool(2);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        let tx3 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2.clone()).unwrap();
        mempool.add_tx(tx3.clone()).unwrap();

        assert_eq!(mempool.purge_txns(), 1);

        assert!(!mempool.has_tx(&tx1.hash()));
        assert!(mempool.has_tx(&tx2.hash()));
        assert!(mempool.has_tx(&tx3.hash()));
    }

    #[test]
    fn test_purge_expired() {
        let (mut mempool, clock) = mempool(2);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        let tx3 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        mempool.add_tx(tx2.clone()).unwrap();

        clock.advance_secs(6);
        mempool.add_tx(tx3.clone()).unwrap();

        assert_eq!(mempool.purge_txns(), 2);

        assert!(!mempool.has_tx(&tx1.hash()));
        assert!(!mempool.has_tx(&tx2.hash()));
        assert!(mempool.has_tx(&tx3.hash()));
    }

    #[test]
    fn test_purge_keeps_txns_within_bounds() {
        let (mut mempool, clock) = mempool(2);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(0);
        mempool.add_tx(tx1.clone()).unwrap();
        clock.advance_secs(5);
        mempool.add_tx(tx2.clone()).unwrap();

        assert_eq!(mempool.purge_txns(), 0);

        assert!(mempool.has_tx(&tx1.hash()));
        assert!(mempool.has_tx(&tx2.hash()));
    }

    #[test]
    fn test_return_txns() {
        let (mut mempool, _) = mempool(10);
        let tx1 = DummyTx::new(0);
        let tx2 = DummyTx::new(1);
        mempool.add_tx(tx1.clone()).unwrap();

        let returned = mempool.return_txns(vec![tx1, tx2.clone(), DummyTx::unsigned()]);

        assert_eq!(returned, 1);
        assert_eq!(mempool.len(), 2);
        assert!(mempool.has_tx(&tx2.hash()));
    }
}
