//! NIP-01 wire messages.

use serde_json::Value;

use crate::{error::RelayError, event::Event, filter::FilterSet};

/// A parsed client-to-relay frame.
#[derive(Debug, PartialEq)]
pub enum ClientMessage {
    /// `["REQ", sub_id, filter...]`
    Req { sub_id: String, filters: FilterSet },
    /// `["EVENT", event]`
    Event(Event),
    /// `["CLOSE", sub_id]`
    Close(String),
    /// Any other type tag. Carried so callers can log it.
    Unknown(String),
}

impl ClientMessage {
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let val: Value = serde_json::from_str(raw)?;
        let arr = val.as_array().ok_or(RelayError::NotArray)?;
        let tag = arr
            .first()
            .and_then(|v| v.as_str())
            .ok_or(RelayError::NotArray)?;
        match tag {
            "REQ" => Ok(ClientMessage::Req {
                sub_id: sub_id(arr, "REQ")?,
                filters: FilterSet::from_values(&arr[2..]),
            }),
            "EVENT" => {
                let ev = arr.get(1).ok_or(RelayError::Missing {
                    kind: "EVENT",
                    field: "event",
                })?;
                let ev = Event::from_value(ev.clone()).map_err(RelayError::InvalidEvent)?;
                Ok(ClientMessage::Event(ev))
            }
            "CLOSE" => Ok(ClientMessage::Close(sub_id(arr, "CLOSE")?)),
            other => Ok(ClientMessage::Unknown(other.to_string())),
        }
    }
}

fn sub_id(arr: &[Value], kind: &'static str) -> Result<String, RelayError> {
    arr.get(1)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or(RelayError::Missing {
            kind,
            field: "subscription id",
        })
}

/// `["EVENT", sub_id, event]`, carrying the event as it was published.
pub fn event_frame(sub_id: &str, event: &Event) -> String {
    serde_json::json!(["EVENT", sub_id, event.document()]).to_string()
}

/// `["EOSE", sub_id]`
pub fn eose_frame(sub_id: &str) -> String {
    serde_json::json!(["EOSE", sub_id]).to_string()
}
