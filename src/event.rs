//! Nostr event model.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wrapper for a Nostr tag expressed as an array of strings.
///
/// The first element names the tag and the following elements hold data,
/// e.g. `["e", "<event id>", "wss://relay"]` or `["t", "news"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Tag name, the first element.
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// First value after the name.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }
}

/// Fields the relay reads for filtering.
#[derive(Deserialize)]
struct Fields {
    id: String,
    pubkey: String,
    kind: u32,
    created_at: u64,
    #[serde(default)]
    tags: Vec<Tag>,
}

/// Event relayed between clients.
///
/// ```json
/// {
///   "id": "aa11",
///   "pubkey": "p1",
///   "kind": 1,
///   "created_at": 1700000000,
///   "tags": [["e", "bb22"], ["t", "news"]],
///   "content": "hello",
///   "sig": "deadbeef"
/// }
/// ```
///
/// The relay treats events as opaque documents: the JSON object a client
/// published is kept as-is and is what subscribers receive, unknown fields
/// included. `id` and `sig` are never recomputed or verified.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event identifier (hex of SHA-256 hash).
    pub id: String,
    /// Author public key (hex).
    pub pubkey: String,
    /// Kind number, e.g. `1` or `30023`.
    pub kind: u32,
    /// Unix timestamp of creation.
    pub created_at: u64,
    pub tags: Vec<Tag>,
    document: Value,
}

impl Event {
    /// Read the filterable fields out of `document` and keep the document
    /// itself for forwarding.
    pub fn from_value(document: Value) -> Result<Self, serde_json::Error> {
        let Fields {
            id,
            pubkey,
            kind,
            created_at,
            tags,
        } = Fields::deserialize(&document)?;
        Ok(Self {
            id,
            pubkey,
            kind,
            created_at,
            tags,
            document,
        })
    }

    /// The JSON object exactly as published.
    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Event::from_value(Value::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}
