pub mod account;
pub mod amount;
pub mod block;

pub use account::{AccountId, BlockHash, RawKey, WalletId, ACCOUNT_PREFIX};
pub use amount::{Amount, KRAI_RATIO, MRAI_RATIO, RAI_RATIO};
pub use block::{Block, BlockSignature, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};

use crate::errors::{ChainError, ChainResult};

/// Strict decimal parse for counts and timeouts: digits only, no sign, no
/// surrounding whitespace.
pub fn decode_unsigned(text: &str) -> ChainResult<u64> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ChainError::Parse("invalid unsigned number".into()));
    }
    text.parse::<u64>()
        .map_err(|_| ChainError::Parse("unsigned number out of range".into()))
}

pub fn parse_port(text: &str) -> ChainResult<u16> {
    let number = decode_unsigned(text)?;
    u16::try_from(number).map_err(|_| ChainError::Parse("port out of range".into()))
}
