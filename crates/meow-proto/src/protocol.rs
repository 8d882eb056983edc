use serde::{Deserialize, Serialize};

use crate::notification::Permission;
use crate::schedule::{DeliveryStrategy, FireTime, LifecycleEvent, ScheduleOutcome};

/// Current protocol version.  Bump this when the wire format changes in a
/// breaking way.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame body either side accepts.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Messages sent to the daemon (from `deliver` or the CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Request {
    /// A notification lifecycle event observed outside the daemon.
    Lifecycle { event: LifecycleEvent },
    /// Re-read permission and re-arm now (sent after enabling notifications).
    Reschedule,
    GetStatus,
}

/// Replies from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply")]
pub enum Reply {
    Status { data: DaemonStatus },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonStatus {
    pub protocol_version: u32,
    pub strategy: DeliveryStrategy,
    pub permission: Permission,
    pub next_fire: Option<FireTime>,
    #[serde(default)]
    pub last_outcome: Option<ScheduleOutcome>,
}

/// Wrapper for socket communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    /// Length of the complete frame at the start of `data`, header included.
    /// `None` until the whole frame has arrived; an error when the header
    /// announces more than [`MAX_FRAME_LEN`].
    pub fn frame_len(data: &[u8]) -> anyhow::Result<Option<usize>> {
        if data.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("frame of {} bytes exceeds the {} byte limit", len, MAX_FRAME_LEN);
        }
        Ok((data.len() >= 4 + len).then_some(4 + len))
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        let Some(frame_len) = Self::frame_len(data)? else {
            anyhow::bail!("Insufficient data for message");
        };
        let msg: Self = serde_json::from_slice(&data[4..frame_len])?;
        Ok((msg, frame_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_request_wire_format() {
        let msg = Message::Request(Request::Lifecycle { event: LifecycleEvent::Closed });
        let encoded = msg.encode().unwrap();
        let body = std::str::from_utf8(&encoded[4..]).unwrap();
        assert_eq!(body, r#"{"cmd":"Lifecycle","event":"Closed"}"#);

        let (decoded, len) = Message::decode(&encoded).unwrap();
        assert_eq!(len, encoded.len());
        match decoded {
            Message::Request(Request::Lifecycle { event }) => assert_eq!(event, LifecycleEvent::Closed),
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_decode_waits_for_full_frame() {
        let encoded = Message::Request(Request::GetStatus).encode().unwrap();
        assert!(Message::decode(&encoded[..2]).is_err());
        assert!(Message::decode(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_frame_len() {
        let encoded = Message::Request(Request::GetStatus).encode().unwrap();
        assert_eq!(Message::frame_len(&encoded[..3]).unwrap(), None);
        assert_eq!(Message::frame_len(&encoded[..encoded.len() - 1]).unwrap(), None);

        let mut two = encoded.clone();
        two.extend_from_slice(&encoded);
        assert_eq!(Message::frame_len(&two).unwrap(), Some(encoded.len()));

        let oversized = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes();
        assert!(Message::frame_len(&oversized).is_err());
        assert!(Message::decode(&oversized).is_err());
    }

    #[test]
    fn test_unknown_command_is_decode_error() {
        let body = br#"{"cmd":"Nope"}"#;
        let mut frame = (body.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(body);
        assert_eq!(Message::frame_len(&frame).unwrap(), Some(frame.len()));
        assert!(Message::decode(&frame).is_err());
    }

    #[test]
    fn test_status_reply_decodes() {
        let status = DaemonStatus {
            protocol_version: PROTOCOL_VERSION,
            strategy: DeliveryStrategy::Timer,
            permission: Permission::Granted,
            next_fire: None,
            last_outcome: Some(ScheduleOutcome::Idle),
        };
        let encoded = Message::Reply(Reply::Status { data: status.clone() }).encode().unwrap();
        match Message::decode(&encoded).unwrap().0 {
            Message::Reply(Reply::Status { data }) => assert_eq!(data, status),
            other => panic!("Wrong message type: {:?}", other),
        }
    }
}
