//! Realtime change notifications over the backend's Phoenix websocket.
//!
//! # Responsibilities
//! - Open one channel per subscribed table
//! - Join `realtime:public:<table>` for all postgres change events
//! - Keep the socket alive with heartbeats
//! - Reconnect with exponential backoff while the feed is held
//!
//! # Design Decisions
//! - One socket per feed: dropping the feed aborts its task and closes it
//! - Frames are decoded leniently; unknown events are ignored
//! - Delivery is best effort; consumers re-fetch on every event

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::config::RealtimeConfig;
use crate::observability::metrics;
use crate::remote::types::{ChangeEvent, ChangeFeed, ChangeKind, StoreError, StoreResult};
use crate::resilience::backoff::Backoff;

const FEED_CAPACITY: usize = 64;

/// A Phoenix channel frame.
#[derive(Debug, Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Client for the realtime endpoint.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    socket_url: Url,
    access_token: Option<String>,
    config: RealtimeConfig,
}

impl RealtimeClient {
    /// Build a client from the REST base URL of the project.
    pub fn new(
        base: &Url,
        api_key: &str,
        access_token: Option<String>,
        config: RealtimeConfig,
    ) -> StoreResult<Self> {
        Ok(Self {
            socket_url: socket_url(base, api_key)?,
            access_token,
            config,
        })
    }

    pub fn socket_url(&self) -> &Url {
        &self.socket_url
    }

    /// Start a feed for `table`. The connection is made in the background.
    pub fn subscribe(&self, table: &str) -> ChangeFeed {
        let (tx, rx) = broadcast::channel(FEED_CAPACITY);
        let client = self.clone();
        let owned = table.to_string();
        let task = tokio::spawn(async move {
            client.run_channel(owned, tx).await;
        });
        ChangeFeed::with_task(table, rx, task)
    }

    async fn run_channel(self, table: String, tx: broadcast::Sender<ChangeEvent>) {
        let mut backoff = Backoff::new(self.config.reconnect_base_ms, self.config.reconnect_max_ms);
        loop {
            match self.connect_once(&table, &tx).await {
                Ok(()) => {
                    tracing::info!(table = %table, "Realtime socket closed by server");
                    backoff.reset();
                }
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Realtime connection failed");
                }
            }

            let delay = backoff.next_delay();
            tracing::debug!(
                table = %table,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting realtime channel"
            );
            tokio::time::sleep(delay).await;

            // Whatever changed while disconnected is unknown.
            let _ = tx.send(ChangeEvent {
                table: table.clone(),
                kind: ChangeKind::Resync,
                record: None,
            });
        }
    }

    async fn connect_once(&self, table: &str, tx: &broadcast::Sender<ChangeEvent>) -> StoreResult<()> {
        let (socket, _) = connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let (mut write, mut read) = socket.split();

        let topic = channel_topic(table);
        let join = join_frame(&topic, table, self.access_token.as_deref(), 1);
        write
            .send(Message::Text(join.to_string().into()))
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        tracing::info!(table = %table, topic = %topic, "Realtime channel joined");

        let mut heartbeat = tokio::time::interval(Duration::from_secs(self.config.heartbeat_secs));
        heartbeat.tick().await;
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    write
                        .send(Message::Text(heartbeat_frame(next_ref).to_string().into()))
                        .await
                        .map_err(|e| StoreError::Network(e.to_string()))?;
                    next_ref += 1;
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode_frame(table, text.as_str()) {
                            metrics::record_realtime_event(table, event.kind.as_str());
                            let _ = tx.send(event);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        write
                            .send(Message::Pong(payload))
                            .await
                            .map_err(|e| StoreError::Network(e.to_string()))?;
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(StoreError::Network(e.to_string())),
                },
            }
        }
    }
}

/// `wss://<host>/realtime/v1/websocket?apikey=<key>&vsn=1.0.0` for a REST base URL.
pub fn socket_url(base: &Url, api_key: &str) -> StoreResult<Url> {
    let mut url = base
        .join("realtime/v1/websocket")
        .map_err(|e| StoreError::Validation(format!("invalid realtime url: {}", e)))?;
    let scheme = match base.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(StoreError::Validation(format!(
                "unsupported backend scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| StoreError::Validation("cannot derive websocket scheme".to_string()))?;
    url.query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");
    Ok(url)
}

pub fn channel_topic(table: &str) -> String {
    format!("realtime:public:{}", table)
}

fn join_frame(topic: &str, table: &str, access_token: Option<&str>, reference: u64) -> Value {
    let mut payload = json!({
        "config": {
            "broadcast": {"self": false},
            "presence": {"key": ""},
            "postgres_changes": [
                {"event": "*", "schema": "public", "table": table}
            ]
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": payload,
        "ref": reference.to_string(),
    })
}

fn heartbeat_frame(reference: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string(),
    })
}

/// Decode a text frame into a change event for `table`, if it is one.
pub fn decode_frame(table: &str, text: &str) -> Option<ChangeEvent> {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable realtime frame");
            return None;
        }
    };

    if frame.topic != channel_topic(table) {
        return None;
    }

    let (kind_name, record) = match frame.event.as_str() {
        "postgres_changes" => {
            let data = frame.payload.get("data")?;
            let kind = data.get("type")?.as_str()?.to_string();
            (kind, data.get("record").cloned())
        }
        "INSERT" | "UPDATE" | "DELETE" => {
            (frame.event.clone(), frame.payload.get("record").cloned())
        }
        "phx_reply" => {
            if frame.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(table = %table, response = %frame.payload, "Realtime join rejected");
            }
            return None;
        }
        "phx_error" => {
            tracing::warn!(table = %table, "Realtime channel error");
            return None;
        }
        _ => return None,
    };

    let kind = match kind_name.as_str() {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };

    Some(ChangeEvent {
        table: table.to_string(),
        kind,
        record: record.filter(|r| !r.is_null()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_from_https_base() {
        let base = Url::parse("https://demo.supabase.co/").unwrap();
        let url = socket_url(&base, "anon").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime/v1/websocket");
        assert_eq!(url.query(), Some("apikey=anon&vsn=1.0.0"));
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        let base = Url::parse("ftp://demo.example/").unwrap();
        assert!(socket_url(&base, "anon").is_err());
    }

    #[test]
    fn test_join_frame_shape() {
        let frame = join_frame("realtime:public:reviews", "reviews", Some("jwt"), 1);
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["ref"], "1");
        assert_eq!(frame["payload"]["access_token"], "jwt");
        assert_eq!(frame["payload"]["config"]["postgres_changes"][0]["table"], "reviews");
    }

    #[test]
    fn test_decode_postgres_changes() {
        let text = r#"{"topic":"realtime:public:visual_config","event":"postgres_changes","payload":{"data":{"type":"UPDATE","table":"visual_config","record":{"config_type":"typography"}}},"ref":null}"#;
        let event = decode_frame("visual_config", text).unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.record.unwrap()["config_type"], "typography");
    }

    #[test]
    fn test_decode_legacy_event_names() {
        let text = r#"{"topic":"realtime:public:reviews","event":"DELETE","payload":{"record":null},"ref":null}"#;
        let event = decode_frame("reviews", text).unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert!(event.record.is_none());
    }

    #[test]
    fn test_decode_ignores_other_frames() {
        let reply = r#"{"topic":"realtime:public:reviews","event":"phx_reply","payload":{"status":"ok"},"ref":"1"}"#;
        assert!(decode_frame("reviews", reply).is_none());
        let other_topic = r#"{"topic":"realtime:public:blog_posts","event":"INSERT","payload":{},"ref":null}"#;
        assert!(decode_frame("reviews", other_topic).is_none());
        assert!(decode_frame("reviews", "not json").is_none());
    }
}
