use serde::{Deserialize, Serialize};

pub type SessionId = u64;

/// An attendance session as returned by the gateway.
///
/// `start_time` and `end_time` are nanoseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Opaque check-in code bound to `id` by the server
    pub qr_payload: String,
}

/// Where a timestamp falls relative to a session window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionWindow {
    NotStarted,
    Open,
    Ended,
}

impl Session {
    pub fn new(
        id: SessionId,
        name: String,
        start_time: i64,
        end_time: i64,
        qr_payload: String,
    ) -> Self {
        Self {
            id,
            name,
            start_time,
            end_time,
            qr_payload,
        }
    }

    /// Both bounds are inclusive.
    pub fn window_at(&self, now: i64) -> SessionWindow {
        if now < self.start_time {
            SessionWindow::NotStarted
        } else if now > self.end_time {
            SessionWindow::Ended
        } else {
            SessionWindow::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(7, "Algebra".to_string(), 1_000, 2_000, "QR-7".to_string())
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let s = session();
        assert_eq!(s.window_at(999), SessionWindow::NotStarted);
        assert_eq!(s.window_at(1_000), SessionWindow::Open);
        assert_eq!(s.window_at(2_000), SessionWindow::Open);
        assert_eq!(s.window_at(2_001), SessionWindow::Ended);
    }

    #[test]
    fn test_session_wire_format_is_camel_case() {
        let json = serde_json::to_value(session()).unwrap();
        assert_eq!(json["startTime"], 1_000);
        assert_eq!(json["qrPayload"], "QR-7");
    }
}
