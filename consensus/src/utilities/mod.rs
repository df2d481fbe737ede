pub mod encoding;
pub mod hash;
pub mod time;

pub use encoding::{decode, encode, from_hex, to_hex};
pub use hash::{blake2_256, HashType};
pub use time::{Clock, SystemClock};
