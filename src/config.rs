use std::fs;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ChainError, ChainResult};
use crate::types::decode_unsigned;

pub const DEFAULT_RPC_PORT: u16 = 7076;
const DEFAULT_REQUEST_LIMIT: u64 = 16384;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcConfig {
    pub address: Ipv6Addr,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    pub enable_control: bool,
    #[serde(deserialize_with = "deserialize_count")]
    pub frontier_request_limit: u64,
    #[serde(deserialize_with = "deserialize_count")]
    pub chain_request_limit: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_rpc: bool,
}

impl NodeConfig {
    pub fn load(path: &Path) -> ChainResult<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| ChainError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> ChainResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| ChainError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }
}

impl RpcConfig {
    pub fn listen_endpoint(&self) -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(self.address, self.port, 0, 0))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            address: Ipv6Addr::LOCALHOST,
            port: DEFAULT_RPC_PORT,
            enable_control: false,
            frontier_request_limit: DEFAULT_REQUEST_LIMIT,
            chain_request_limit: DEFAULT_REQUEST_LIMIT,
        }
    }
}

/// Config files historically carry ports and limits as quoted strings;
/// accept both forms but keep the range checks strict.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    fn resolve<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumberOrText::Number(number) => Ok(number),
            NumberOrText::Text(text) => {
                decode_unsigned(&text).map_err(|_| E::custom("invalid numeric string"))
            }
        }
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let number = NumberOrText::deserialize(deserializer)?.resolve()?;
    u16::try_from(number).map_err(|_| serde::de::Error::custom("port out of range"))
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrText::deserialize(deserializer)?.resolve()
}
