//! Peer registry: the relay nodes an operator can target.
//!
//! ```toml
//! default = "hk"
//!
//! [servers.hk]
//! name = "Hong Kong"
//!
//! [servers.fra]
//! name = "Frankfurt"
//! url = "http://fra.example.net:65534/api/run"
//! secret = "shared-with-fra"
//! ```

use std::{collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use lgrelay_core::{RelayError, RelayResult};
use serde::Deserialize;

/// Servers shown per listing page.
pub const PAGE_SIZE: usize = 3;

#[derive(Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    secret: Option<String>,
}

impl Peer {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            secret: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// An empty secret is the same as none.
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One page of a server listing, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPage<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub peers: Vec<&'a Peer>,
}

#[derive(Debug, Clone)]
pub struct PeerRegistry {
    local_id: String,
    peers: BTreeMap<String, Peer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegistry {
    default: String,
    #[serde(default)]
    servers: BTreeMap<String, RawPeer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeer {
    name: Option<String>,
    url: Option<String>,
    secret: Option<String>,
}

impl PeerRegistry {
    pub fn new(local_id: &str, peers: impl IntoIterator<Item = Peer>) -> RelayResult<Self> {
        let peers: BTreeMap<String, Peer> = peers
            .into_iter()
            .map(|peer| (peer.id.clone(), peer))
            .collect();

        if !peers.contains_key(local_id) {
            return Err(RelayError::validation(format!(
                "default server \"{}\" is not defined in servers",
                local_id
            )));
        }

        Ok(Self {
            local_id: local_id.to_string(),
            peers,
        })
    }

    pub fn from_toml_str(contents: &str) -> RelayResult<Self> {
        let raw: RawRegistry = toml::from_str(contents)
            .map_err(|err| RelayError::validation(format!("invalid peer registry: {}", err)))?;

        let peers = raw.servers.into_iter().map(|(id, raw_peer)| {
            let name = raw_peer.name.unwrap_or_else(|| id.clone());
            let mut peer = Peer::new(&id, &name);
            if let Some(url) = raw_peer.url.filter(|u| !u.trim().is_empty()) {
                peer = peer.with_url(url.trim());
            }
            if let Some(secret) = raw_peer.secret {
                peer = peer.with_secret(&secret);
            }
            peer
        });

        Self::new(raw.default.trim(), peers)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read peer registry {}", path.display()))?;
        let registry = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load peer registry {}", path.display()))?;
        Ok(registry)
    }

    /// Identifier of the node this process runs on.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn is_local(&self, id: &str) -> bool {
        self.local_id == id
    }

    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.get(id)
    }

    /// All peers, ordered by id.
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Page `number` (1-based) of the listing, `size` peers per page.
    /// Out-of-range pages come back empty.
    pub fn page(&self, number: usize, size: usize) -> PeerPage<'_> {
        let size = size.max(1);
        let total_pages = self.peers.len().div_ceil(size).max(1);
        let peers = if number == 0 {
            Vec::new()
        } else {
            self.peers
                .values()
                .skip((number - 1) * size)
                .take(size)
                .collect()
        };

        PeerPage {
            number,
            total_pages,
            peers,
        }
    }
}
