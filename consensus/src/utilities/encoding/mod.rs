use serde::{Deserialize, Serialize};

//JSON is what we hash for now, callers with their own wire format hash bytes directly
pub fn encode<M: Serialize>(message: M) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec(&message).map_err(|e| anyhow::anyhow!(e))
}

pub fn decode<M: for<'de> Deserialize<'de>>(bytes: &[u8]) -> anyhow::Result<M> {
    serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!(e))
}

pub fn to_hex<T: AsRef<[u8]>>(data: T) -> String {
    array_bytes::bytes2hex("", data.as_ref())
}

/// Accepts hex with or without the `0x` prefix.
pub fn from_hex<T: AsRef<[u8]>>(data: T) -> anyhow::Result<Vec<u8>> {
    let data = data.as_ref();
    let data = data.strip_prefix(b"0x").unwrap_or(data);
    array_bytes::hex2bytes(data).map_err(|_| anyhow::anyhow!("Invalid hex string"))
}
