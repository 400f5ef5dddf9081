// Snapshot wire schema and snapshot sources
//
// The only wire surface of boltmap is the polled snapshot JSON:
// `{ nodes: [{id, geo?}], channels: [{id, source, target}] }`.
// The schema is versioned externally, so unknown fields are ignored and a
// missing `geo` simply degrades to the center fallback at projection time.
// Malformed entries are dropped one by one; only a document that is not JSON
// at all rejects the whole poll.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Channel identifier, conventionally `{source}-{target}`
pub type ChannelId = String;

/// Errors raised while fetching a snapshot
///
/// All of these are recovered by the caller: the cycle is skipped and the
/// previous snapshot stays authoritative.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("cannot read snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Geographic attribute of a node
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Geo {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, alias = "countryCode", alias = "country")]
    pub country_code: Option<String>,
}

/// A network node identified by its public key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_geo")]
    pub geo: Option<Geo>,
}

impl Node {
    /// Hover label: the id, annotated with the country when known
    pub fn label(&self) -> String {
        match self.geo.as_ref().and_then(|g| g.country_code.as_deref()) {
            Some(cc) => format!("{} ({})", self.id, cc),
            None => self.id.clone(),
        }
    }
}

/// Channel status carried by the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ChannelStatus {
    #[default]
    Open,
    Closed,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// A payment channel between two nodes
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub source: String,
    pub target: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ChannelStatus,
}

impl Channel {
    #[cfg(test)]
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            status: ChannelStatus::Open,
        }
    }
}

/// Full topology as of one successful poll
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub nodes: Vec<Node>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub channels: Vec<Channel>,
}

// ============================================================================
// Lenient field decoding
// ============================================================================

/// Decode each array element on its own, dropping the ones that do not fit
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    let total = raw.len();
    let entries: Vec<T> = raw
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if entries.len() < total {
        tracing::debug!(
            skipped = total - entries.len(),
            kind = std::any::type_name::<T>(),
            "Skipped malformed snapshot entries"
        );
    }
    Ok(entries)
}

/// An incomplete or non-numeric geo object counts as no geo
fn lenient_geo<'de, D>(deserializer: D) -> Result<Option<Geo>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Geo>(raw)
        .ok()
        .filter(|g| g.latitude.is_finite() && g.longitude.is_finite()))
}

/// Unknown status strings fall back to the default (open)
fn lenient_status<'de, D>(deserializer: D) -> Result<ChannelStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw.as_str().map(str::to_ascii_lowercase).as_deref() {
        Some("closed") => ChannelStatus::Closed,
        _ => ChannelStatus::Open,
    })
}

impl Snapshot {
    /// Parse a snapshot from its JSON wire form
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Channel identifiers as an ordered set, the input of the topology differ
    pub fn channel_ids(&self) -> BTreeSet<ChannelId> {
        self.channels.iter().map(|c| c.id.clone()).collect()
    }

    /// Look up a channel's endpoints by id
    pub fn endpoints(&self, id: &str) -> Option<(&str, &str)> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| (c.source.as_str(), c.target.as_str()))
    }
}

// ============================================================================
// Snapshot sources
// ============================================================================

/// Anything that can produce the current topology on demand
///
/// Fetches may block; they run on the poll worker thread, never on the UI loop.
pub trait SnapshotSource: Send {
    /// Human-readable location, used in log lines
    fn describe(&self) -> String;

    fn fetch(&mut self) -> Result<Snapshot, SourceError>;
}

/// Polls a snapshot endpoint over HTTP(S)
pub struct HttpSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            url: url.to_string(),
            agent,
        }
    }
}

impl SnapshotSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&mut self) -> Result<Snapshot, SourceError> {
        let response = match self.agent.get(&self.url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, _)) => {
                return Err(SourceError::Status {
                    url: self.url.clone(),
                    status,
                })
            }
            Err(e) => {
                return Err(SourceError::Transport {
                    url: self.url.clone(),
                    message: e.to_string(),
                })
            }
        };

        Ok(serde_json::from_reader(response.into_reader())?)
    }
}

/// Re-reads a snapshot JSON file on every poll
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&mut self) -> Result<Snapshot, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Snapshot::from_json(&text)
    }
}

/// Pick a source implementation from a location string
pub fn source_for(location: &str, timeout: Duration) -> Box<dyn SnapshotSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location, timeout))
    } else {
        Box::new(FileSource::new(location))
    }
}

// ============================================================================
// Poll worker
// ============================================================================

/// Background thread running a snapshot source
///
/// Each `request` triggers one fetch; results come back in request order and
/// are drained without blocking by `try_result`.
pub struct PollWorker {
    location: String,
    requests: Sender<()>,
    results: Receiver<Result<Snapshot, SourceError>>,
}

impl PollWorker {
    pub fn spawn(mut source: Box<dyn SnapshotSource>) -> io::Result<Self> {
        let location = source.describe();
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (result_tx, result_rx) = mpsc::channel();

        thread::Builder::new()
            .name("snapshot-poll".to_string())
            .spawn(move || {
                // Ends once the worker handle is dropped
                while request_rx.recv().is_ok() {
                    if result_tx.send(source.fetch()).is_err() {
                        break;
                    }
                }
                tracing::debug!("Poll worker stopped");
            })?;

        Ok(Self {
            location,
            requests: request_tx,
            results: result_rx,
        })
    }

    pub fn describe(&self) -> &str {
        &self.location
    }

    /// Ask for one fetch; false when the worker thread is gone
    pub fn request(&self) -> bool {
        self.requests.send(()).is_ok()
    }

    /// Next finished fetch, if any
    pub fn try_result(&self) -> Option<Result<Snapshot, SourceError>> {
        self.results.try_recv().ok()
    }

    /// Block for the next finished fetch
    #[cfg(test)]
    pub fn wait_result(&self, timeout: Duration) -> Option<Result<Snapshot, SourceError>> {
        self.results.recv_timeout(timeout).ok()
    }
}
