use std::collections::HashMap;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

/// Known peer endpoints with their last contact time.
pub struct PeerContainer {
    peers: RwLock<HashMap<SocketAddrV6, Instant>>,
}

impl PeerContainer {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, endpoint: SocketAddrV6) {
        self.peers.write().insert(endpoint, Instant::now());
    }

    /// Canonical `[address]:port` strings, sorted for stable responses.
    pub fn list(&self) -> Vec<String> {
        let peers = self.peers.read();
        let mut endpoints: Vec<(Ipv6Addr, u16)> = peers
            .keys()
            .map(|endpoint| (*endpoint.ip(), endpoint.port()))
            .collect();
        endpoints.sort_by_key(|(address, port)| (address.octets(), *port));
        endpoints
            .into_iter()
            .map(|(address, port)| format!("[{address}]:{port}"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl Default for PeerContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Records bootstrap targets; the transfer itself is the bootstrap client's
/// concern and happens outside this process surface.
pub struct BootstrapInitiator {
    attempts: Mutex<Vec<SocketAddrV6>>,
}

impl BootstrapInitiator {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn bootstrap(&self, endpoint: SocketAddrV6) {
        info!(%endpoint, "starting bootstrap");
        self.attempts.lock().push(endpoint);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

impl Default for BootstrapInitiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort peer probe: well-formed IPv6 targets join the peer set,
/// anything else is only logged.
pub fn keepalive(peers: &PeerContainer, address: &str, port: u16) {
    match address.parse::<Ipv6Addr>() {
        Ok(parsed) => {
            let endpoint = SocketAddrV6::new(parsed, port, 0, 0);
            debug!(%endpoint, "keepalive probe");
            peers.insert(endpoint);
        }
        Err(_) => {
            debug!(address, port, "keepalive target did not parse, probe skipped");
        }
    }
}
