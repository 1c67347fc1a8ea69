//! TOML encoding of the stream store.
//!
//! ```toml
//! # Notification stream definitions.
//!
//! [[streams]]
//! name = "bowling"
//! source = "sources/bowling.sh"
//! [[streams.subscribers]]
//! user_id = 1234
//! delivery = "dm"
//! [[streams.subscribers]]
//! user_id = 5678
//! delivery = "channel"
//! channel_id = 42
//! ```
//!
//! Decoding is lenient with individual subscriber entries (a malformed entry
//! is skipped, its stream kept) but strict with the document and stream
//! tables themselves. Names and sources are kept byte-for-byte so a decoded
//! store encodes back to the same values.

use {
    serde::{Deserialize, Serialize},
    toml::Value,
    tracing::warn,
};

use crate::types::{DeliveryMode, Stream, Subscriber};

/// Contents written when the store does not exist yet.
pub const EMPTY_STORE: &str = "# Notification stream definitions.\n\n";

const HEADER: &str = "\
# Notification stream definitions.
# Each stream source is a registered source name or an executable that prints
# a JSON array of events on stdout.
";

#[derive(Serialize)]
struct StoreDoc<'a> {
    streams: &'a [Stream],
}

#[derive(Deserialize)]
struct RawStore {
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Deserialize)]
struct RawStream {
    name: String,
    #[serde(alias = "script")]
    source: String,
    #[serde(default)]
    subscribers: Vec<Value>,
}

/// Parse the store document.
pub fn decode(input: &str) -> Result<Vec<Stream>, toml::de::Error> {
    let raw: RawStore = toml::from_str(input)?;

    let streams = raw
        .streams
        .into_iter()
        .filter_map(|raw_stream| {
            if raw_stream.name.trim().is_empty() {
                warn!("skipping stream with empty name");
                return None;
            }
            let subscribers = raw_stream
                .subscribers
                .iter()
                .filter_map(|value| decode_subscriber(&raw_stream.name, value))
                .collect();
            Some(Stream {
                name: raw_stream.name,
                source: raw_stream.source,
                subscribers,
            })
        })
        .collect();

    Ok(streams)
}

fn decode_subscriber(stream: &str, value: &Value) -> Option<Subscriber> {
    let Some(table) = value.as_table() else {
        warn!(stream, "skipping subscriber entry that is not a table");
        return None;
    };

    let Some(user_id) = table.get("user_id").and_then(as_id) else {
        warn!(stream, entry = %value, "skipping subscriber with invalid user_id");
        return None;
    };

    let mode = table
        .get("delivery")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DeliveryMode>().ok())
        .unwrap_or(DeliveryMode::Direct);

    let channel_id = match table.get("channel_id") {
        None => None,
        Some(raw) => match as_id(raw) {
            Some(id) => Some(id),
            None => {
                warn!(stream, user_id, "skipping subscriber with invalid channel_id");
                return None;
            },
        },
    };

    match (mode, channel_id) {
        (DeliveryMode::Direct, _) => Some(Subscriber::direct(user_id)),
        (DeliveryMode::Channel, Some(channel_id)) => Some(Subscriber::channel(user_id, channel_id)),
        (DeliveryMode::Channel, None) => {
            warn!(stream, user_id, "skipping channel subscriber without channel_id");
            None
        },
    }
}

/// Integer ids, also accepted as decimal strings.
fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render the store document: the comment header, then one `[[streams]]`
/// table per stream with its `[[streams.subscribers]]`.
pub fn encode(streams: &[Stream]) -> Result<String, toml::ser::Error> {
    if streams.is_empty() {
        return Ok(format!("{HEADER}\n"));
    }
    let body = toml::to_string(&StoreDoc { streams })?;
    Ok(format!("{HEADER}\n{body}"))
}
