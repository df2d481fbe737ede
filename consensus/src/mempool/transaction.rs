use crate::utilities::hash::HashType;

pub type TxHash = HashType;

/// Group (concilium) a transaction is routed to.
pub type WitnessGroupId = u32;

/// What the mempool needs from a transaction.
pub trait PoolTransaction: Clone {
    fn hash(&self) -> TxHash;

    fn witness_group_id(&self) -> WitnessGroupId;

    /// Signature and structure check.
    fn verify(&self) -> anyhow::Result<()>;
}

/// Anything that can name a transaction: the hash itself, raw bytes or hex text.
pub trait AsTxHash {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash>;
}

impl AsTxHash for TxHash {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        Ok(*self)
    }
}

impl AsTxHash for [u8; 32] {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        Ok(TxHash::new(*self))
    }
}

impl AsTxHash for [u8] {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        TxHash::try_from(self)
    }
}

impl AsTxHash for Vec<u8> {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        self.as_slice().as_tx_hash()
    }
}

impl AsTxHash for str {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        self.parse()
    }
}

impl AsTxHash for String {
    fn as_tx_hash(&self) -> anyhow::Result<TxHash> {
        self.as_str().as_tx_hash()
    }
}
