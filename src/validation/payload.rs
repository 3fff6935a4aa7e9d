use crate::models::session::SessionId;

/// Literal prefix every attendance QR payload starts with
pub const PAYLOAD_PREFIX: &str = "QR-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Does not start with the attendance prefix
    MissingPrefix,
    /// Prefix present but the remainder is not a decimal session id
    InvalidSessionId,
}

/// Payload the gateway binds to a session, e.g. `QR-42`
pub fn session_payload(id: SessionId) -> String {
    format!("{}{}", PAYLOAD_PREFIX, id)
}

/// Extract the session id from a scanned or typed payload.
///
/// Only ASCII digits are accepted after the prefix; signs, whitespace and
/// trailing characters are rejected.
pub fn parse_session_payload(raw: &str) -> Result<SessionId, PayloadError> {
    let rest = raw
        .strip_prefix(PAYLOAD_PREFIX)
        .ok_or(PayloadError::MissingPrefix)?;

    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PayloadError::InvalidSessionId);
    }

    rest.parse::<SessionId>()
        .map_err(|_| PayloadError::InvalidSessionId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_payload() {
        assert_eq!(parse_session_payload("QR-7"), Ok(7));
        assert_eq!(parse_session_payload("QR-0042"), Ok(42));
    }

    #[test]
    fn test_missing_prefix() {
        for raw in ["ABC", "", "qr-7", " QR-7", "7", "QR7"] {
            assert_eq!(parse_session_payload(raw), Err(PayloadError::MissingPrefix), "{}", raw);
        }
    }

    #[test]
    fn test_invalid_session_id() {
        let malformed = [
            "QR-",
            "QR-abc",
            "QR--1",
            "QR-+1",
            "QR-1 ",
            "QR-1.5",
            "QR-99999999999999999999999",
        ];
        for raw in malformed {
            assert_eq!(parse_session_payload(raw), Err(PayloadError::InvalidSessionId), "{}", raw);
        }
    }

    #[test]
    fn test_payload_round_trip_for_generated_ids() {
        assert_eq!(session_payload(42), "QR-42");
        assert_eq!(parse_session_payload(&session_payload(42)), Ok(42));
    }
}
