use std::fmt;

use blake2::{Blake2s256, Digest};
use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::{ChainError, ChainResult};

/// Prefix of the checksummed display form of an account identifier.
pub const ACCOUNT_PREFIX: &str = "rai_";

const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn encode_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn decode_hex(text: &str) -> ChainResult<Self> {
                decode_hex_32(text).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.encode_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.encode_hex())
            }
        }
    };
}

id_type!(AccountId);
id_type!(WalletId);
id_type!(BlockHash);
id_type!(RawKey);

fn decode_hex_32(text: &str) -> ChainResult<[u8; 32]> {
    if text.len() != 64 {
        return Err(ChainError::Parse("identifier must be 64 hex characters".into()));
    }
    let decoded = hex::decode(text)
        .map_err(|err| ChainError::Parse(format!("invalid hex identifier: {err}")))?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}

impl AccountId {
    /// Renders the checksummed base-32 display form: `rai_` followed by 52
    /// data characters (4 pad bits + 256 key bits) and 8 checksum characters.
    pub fn to_account(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(ACCOUNT_PREFIX);
        out.push_str(&encode_base32(&self.0, 4));
        out.push_str(&encode_base32(&account_checksum(&self.0), 0));
        out
    }

    /// Strict inverse of [`to_account`]: wrong prefix, length, alphabet,
    /// pad bits, or checksum all fail.
    pub fn decode_account(text: &str) -> ChainResult<Self> {
        if text.len() != 64 || !text.starts_with(ACCOUNT_PREFIX) {
            return Err(ChainError::Parse("malformed account number".into()));
        }
        let mut key = [0u8; 32];
        decode_base32(&text[4..56], 4, &mut key)?;
        let mut check = [0u8; 5];
        decode_base32(&text[56..64], 0, &mut check)?;
        if check != account_checksum(&key) {
            return Err(ChainError::Parse("account checksum mismatch".into()));
        }
        Ok(Self(key))
    }
}

impl WalletId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl RawKey {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Ed25519 public key of this secret, which doubles as the account id.
    pub fn public_key(&self) -> ChainResult<AccountId> {
        let secret = SecretKey::from_bytes(&self.0)
            .map_err(|err| ChainError::Crypto(format!("invalid secret key bytes: {err}")))?;
        Ok(AccountId(PublicKey::from(&secret).to_bytes()))
    }

    pub fn sign(&self, message: &[u8]) -> ChainResult<[u8; 64]> {
        let secret = SecretKey::from_bytes(&self.0)
            .map_err(|err| ChainError::Crypto(format!("invalid secret key bytes: {err}")))?;
        let public = PublicKey::from(&secret);
        let keypair = Keypair { secret, public };
        Ok(keypair.sign(message).to_bytes())
    }
}

fn account_checksum(key: &[u8; 32]) -> [u8; 5] {
    let digest = Blake2s256::digest(key);
    let mut check = [0u8; 5];
    for (index, byte) in check.iter_mut().enumerate() {
        *byte = digest[4 - index];
    }
    check
}

fn encode_base32(data: &[u8], pad_bits: u32) -> String {
    debug_assert_eq!((data.len() as u32 * 8 + pad_bits) % 5, 0);
    let mut out = String::with_capacity(((data.len() as u32 * 8 + pad_bits) / 5) as usize);
    let mut acc: u32 = 0;
    let mut bits = pad_bits;
    for &byte in data {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
        }
    }
    out
}

fn decode_base32(text: &str, pad_bits: u32, out: &mut [u8]) -> ChainResult<()> {
    if text.len() as u32 * 5 != out.len() as u32 * 8 + pad_bits {
        return Err(ChainError::Parse("base-32 length mismatch".into()));
    }
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut index = 0;
    for (position, byte) in text.bytes().enumerate() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&candidate| candidate == byte)
            .ok_or_else(|| ChainError::Parse("invalid base-32 character".into()))?
            as u32;
        if position == 0 && pad_bits > 0 {
            if value >> (5 - pad_bits) != 0 {
                return Err(ChainError::Parse("nonzero base-32 padding".into()));
            }
            acc = value & ((1 << (5 - pad_bits)) - 1);
            bits = 5 - pad_bits;
        } else {
            acc = (acc << 5) | value;
            bits += 5;
        }
        while bits >= 8 {
            bits -= 8;
            out[index] = (acc >> bits) as u8;
            acc &= (1 << bits) - 1;
            index += 1;
        }
    }
    Ok(())
}
