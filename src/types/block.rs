use std::fmt;

use blake2::{Blake2s256, Digest};
use serde_json::{Map, Value};

use crate::errors::{ChainError, ChainResult};
use crate::types::account::{AccountId, BlockHash};
use crate::types::amount::Amount;

/// Detached ed25519 signature carried by every block. Stored raw so blocks
/// received off the wire round-trip even when the signature is garbage.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockSignature(pub [u8; 64]);

impl BlockSignature {
    pub const ZERO: Self = Self([0u8; 64]);

    pub fn encode_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn decode_hex(text: &str) -> ChainResult<Self> {
        if text.len() != 128 {
            return Err(ChainError::Parse("signature must be 128 hex characters".into()));
        }
        let decoded = hex::decode(text)
            .map_err(|err| ChainError::Parse(format!("invalid signature hex: {err}")))?;
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl Default for BlockSignature {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for BlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockSignature({})", self.encode_hex())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: AccountId,
    /// Balance of the sending account after this block.
    pub balance: Amount,
    pub work: u64,
    pub signature: BlockSignature,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub work: u64,
    pub signature: BlockSignature,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: AccountId,
    pub account: AccountId,
    pub work: u64,
    pub signature: BlockSignature,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: AccountId,
    pub work: u64,
    pub signature: BlockSignature,
}

/// The closed set of ledger operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Send(_) => "send",
            Block::Receive(_) => "receive",
            Block::Open(_) => "open",
            Block::Change(_) => "change",
        }
    }

    /// Hash over the variant's signed fields; work and signature are not
    /// part of the identity.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Blake2s256::new();
        match self {
            Block::Send(block) => {
                hasher.update(block.previous.as_bytes());
                hasher.update(block.destination.as_bytes());
                hasher.update(block.balance.to_be_bytes());
            }
            Block::Receive(block) => {
                hasher.update(block.previous.as_bytes());
                hasher.update(block.source.as_bytes());
            }
            Block::Open(block) => {
                hasher.update(block.source.as_bytes());
                hasher.update(block.representative.as_bytes());
                hasher.update(block.account.as_bytes());
            }
            Block::Change(block) => {
                hasher.update(block.previous.as_bytes());
                hasher.update(block.representative.as_bytes());
            }
        }
        BlockHash(hasher.finalize().into())
    }

    /// Predecessor on the owning chain; zero for an open block.
    pub fn previous(&self) -> BlockHash {
        match self {
            Block::Send(block) => block.previous,
            Block::Receive(block) => block.previous,
            Block::Open(_) => BlockHash::ZERO,
            Block::Change(block) => block.previous,
        }
    }

    /// Root the work nonce must cover: previous hash, or the account for a
    /// chain-opening block.
    pub fn root(&self) -> BlockHash {
        match self {
            Block::Open(block) => BlockHash(block.account.0),
            other => other.previous(),
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(block) => block.work,
            Block::Receive(block) => block.work,
            Block::Open(block) => block.work,
            Block::Change(block) => block.work,
        }
    }

    pub fn set_work(&mut self, work: u64) {
        match self {
            Block::Send(block) => block.work = work,
            Block::Receive(block) => block.work = work,
            Block::Open(block) => block.work = work,
            Block::Change(block) => block.work = work,
        }
    }

    pub fn set_signature(&mut self, signature: BlockSignature) {
        match self {
            Block::Send(block) => block.signature = signature,
            Block::Receive(block) => block.signature = signature,
            Block::Open(block) => block.signature = signature,
            Block::Change(block) => block.signature = signature,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String(self.kind().into()));
        match self {
            Block::Send(block) => {
                object.insert("previous".into(), Value::String(block.previous.encode_hex()));
                object.insert("destination".into(), Value::String(block.destination.to_account()));
                object.insert("balance".into(), Value::String(block.balance.to_string()));
            }
            Block::Receive(block) => {
                object.insert("previous".into(), Value::String(block.previous.encode_hex()));
                object.insert("source".into(), Value::String(block.source.encode_hex()));
            }
            Block::Open(block) => {
                object.insert("source".into(), Value::String(block.source.encode_hex()));
                object.insert("representative".into(), Value::String(block.representative.to_account()));
                object.insert("account".into(), Value::String(block.account.to_account()));
            }
            Block::Change(block) => {
                object.insert("previous".into(), Value::String(block.previous.encode_hex()));
                object.insert("representative".into(), Value::String(block.representative.to_account()));
            }
        }
        object.insert("work".into(), Value::String(encode_work(self.work())));
        object.insert("signature".into(), Value::String(self.signature_hex()));
        Value::Object(object)
    }

    pub fn serialize_json(&self) -> String {
        self.to_json().to_string()
    }

    pub fn deserialize_json(value: &Value) -> ChainResult<Block> {
        let object = value
            .as_object()
            .ok_or_else(|| ChainError::Parse("block must be a JSON object".into()))?;
        let kind = str_field(object, "type")?;
        let work = decode_work(str_field(object, "work")?)?;
        let signature = BlockSignature::decode_hex(str_field(object, "signature")?)?;
        let block = match kind {
            "send" => Block::Send(SendBlock {
                previous: BlockHash::decode_hex(str_field(object, "previous")?)?,
                destination: AccountId::decode_account(str_field(object, "destination")?)?,
                balance: Amount::decode_dec(str_field(object, "balance")?)?,
                work,
                signature,
            }),
            "receive" => Block::Receive(ReceiveBlock {
                previous: BlockHash::decode_hex(str_field(object, "previous")?)?,
                source: BlockHash::decode_hex(str_field(object, "source")?)?,
                work,
                signature,
            }),
            "open" => Block::Open(OpenBlock {
                source: BlockHash::decode_hex(str_field(object, "source")?)?,
                representative: AccountId::decode_account(str_field(object, "representative")?)?,
                account: AccountId::decode_account(str_field(object, "account")?)?,
                work,
                signature,
            }),
            "change" => Block::Change(ChangeBlock {
                previous: BlockHash::decode_hex(str_field(object, "previous")?)?,
                representative: AccountId::decode_account(str_field(object, "representative")?)?,
                work,
                signature,
            }),
            _ => return Err(ChainError::Parse("unknown block type".into())),
        };
        Ok(block)
    }

    fn signature_hex(&self) -> String {
        match self {
            Block::Send(block) => block.signature.encode_hex(),
            Block::Receive(block) => block.signature.encode_hex(),
            Block::Open(block) => block.signature.encode_hex(),
            Block::Change(block) => block.signature.encode_hex(),
        }
    }
}

pub fn encode_work(work: u64) -> String {
    format!("{work:016x}")
}

pub fn decode_work(text: &str) -> ChainResult<u64> {
    if text.len() != 16 {
        return Err(ChainError::Parse("work must be 16 hex characters".into()));
    }
    u64::from_str_radix(text, 16)
        .map_err(|err| ChainError::Parse(format!("invalid work nonce: {err}")))
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> ChainResult<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::Parse(format!("missing block field `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn account(fill: u8) -> AccountId {
        AccountId::from_bytes([fill; 32])
    }

    #[test]
    fn wire_form_round_trips_every_variant() {
        let blocks = [
            Block::Send(SendBlock {
                previous: BlockHash::from_bytes([1; 32]),
                destination: account(2),
                balance: Amount(12345),
                work: 0xdead_beef_0000_0001,
                signature: BlockSignature([7; 64]),
            }),
            Block::Receive(ReceiveBlock {
                previous: BlockHash::from_bytes([3; 32]),
                source: BlockHash::from_bytes([4; 32]),
                work: 1,
                signature: BlockSignature::ZERO,
            }),
            Block::Open(OpenBlock {
                source: BlockHash::from_bytes([5; 32]),
                representative: account(6),
                account: account(7),
                work: u64::MAX,
                signature: BlockSignature([9; 64]),
            }),
            Block::Change(ChangeBlock {
                previous: BlockHash::from_bytes([8; 32]),
                representative: account(9),
                work: 0,
                signature: BlockSignature([1; 64]),
            }),
        ];
        for block in blocks {
            let round = Block::deserialize_json(&block.to_json()).unwrap();
            assert_eq!(round, block);
            assert_eq!(round.hash(), block.hash());
        }
    }

    #[test]
    fn hash_ignores_work_and_signature() {
        let mut block = Block::Change(ChangeBlock {
            previous: BlockHash::from_bytes([8; 32]),
            representative: account(9),
            work: 0,
            signature: BlockSignature::ZERO,
        });
        let before = block.hash();
        block.set_work(42);
        block.set_signature(BlockSignature([0xff; 64]));
        assert_eq!(block.hash(), before);
    }

    #[test]
    fn hash_covers_signed_fields() {
        let base = Block::Send(SendBlock {
            previous: BlockHash::from_bytes([1; 32]),
            destination: account(2),
            balance: Amount(10),
            work: 0,
            signature: BlockSignature::ZERO,
        });
        let changed = Block::Send(SendBlock {
            previous: BlockHash::from_bytes([1; 32]),
            destination: account(2),
            balance: Amount(11),
            work: 0,
            signature: BlockSignature::ZERO,
        });
        assert_ne!(base.hash(), changed.hash());
    }

    #[test]
    fn malformed_wire_blocks_are_rejected() {
        assert!(Block::deserialize_json(&json!("send")).is_err());
        assert!(Block::deserialize_json(&json!({"type": "mint"})).is_err());
        let missing_balance = json!({
            "type": "send",
            "previous": BlockHash::ZERO.encode_hex(),
            "destination": account(1).to_account(),
            "work": encode_work(0),
            "signature": BlockSignature::ZERO.encode_hex(),
        });
        assert!(Block::deserialize_json(&missing_balance).is_err());
    }

    #[test]
    fn work_encoding_is_strict() {
        assert_eq!(decode_work(&encode_work(0x1234)).unwrap(), 0x1234);
        assert!(decode_work("1234").is_err());
        assert!(decode_work("zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn root_is_previous_or_account() {
        let open = Block::Open(OpenBlock {
            source: BlockHash::from_bytes([5; 32]),
            representative: account(6),
            account: account(7),
            work: 0,
            signature: BlockSignature::ZERO,
        });
        assert_eq!(open.root(), BlockHash(account(7).0));
        assert_eq!(open.previous(), BlockHash::ZERO);
        let change = Block::Change(ChangeBlock {
            previous: BlockHash::from_bytes([8; 32]),
            representative: account(9),
            work: 0,
            signature: BlockSignature::ZERO,
        });
        assert_eq!(change.root(), change.previous());
    }
}
