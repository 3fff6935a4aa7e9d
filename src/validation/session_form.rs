use crate::core::error::SessionFormError;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Raw fields of the "new session" form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionForm {
    pub name: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `HH:MM`
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
}

/// A creation request that passed local validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl SessionForm {
    pub fn validate(&self) -> Result<ValidatedSession, SessionFormError> {
        let start_time = parse_local_datetime(&self.start_date, &self.start_time)?;
        let end_time = parse_local_datetime(&self.end_date, &self.end_time)?;
        validate_session(&self.name, start_time, end_time)
    }
}

/// Name must be non-blank and the window strictly positive
pub fn validate_session(
    name: &str,
    start_time: i64,
    end_time: i64,
) -> Result<ValidatedSession, SessionFormError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionFormError::EmptyName);
    }

    if end_time <= start_time {
        return Err(SessionFormError::EndNotAfterStart);
    }

    Ok(ValidatedSession {
        name: name.to_string(),
        start_time,
        end_time,
    })
}

/// Interpret a date/time pair in the local timezone as ns since epoch
pub fn parse_local_datetime(date: &str, time: &str) -> Result<i64, SessionFormError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| SessionFormError::InvalidDateTime(format!("date '{}': {}", date, e)))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|e| SessionFormError::InvalidDateTime(format!("time '{}': {}", time, e)))?;

    let local = NaiveDateTime::new(date, time)
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| {
            SessionFormError::InvalidDateTime(format!("{} {} does not exist locally", date, time))
        })?;

    // ns since epoch only covers 1677..2262
    local.timestamp_nanos_opt().ok_or_else(|| {
        SessionFormError::InvalidDateTime(format!("{} {} is out of range", date, time))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::NANOS_PER_SECOND;

    fn form(start: (&str, &str), end: (&str, &str)) -> SessionForm {
        SessionForm {
            name: "Monday Morning Class".to_string(),
            start_date: start.0.to_string(),
            start_time: start.1.to_string(),
            end_date: end.0.to_string(),
            end_time: end.1.to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let validated = form(("2025-03-04", "09:00"), ("2025-03-04", "10:30"))
            .validate()
            .unwrap();
        assert_eq!(validated.end_time - validated.start_time, 90 * 60 * NANOS_PER_SECOND);
        assert_eq!(validated.name, "Monday Morning Class");
    }

    #[test]
    fn test_end_equal_to_start_is_rejected() {
        let err = form(("2025-03-04", "09:00"), ("2025-03-04", "09:00"))
            .validate()
            .unwrap_err();
        assert_eq!(err, SessionFormError::EndNotAfterStart);
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let err = form(("2025-03-05", "09:00"), ("2025-03-04", "23:59"))
            .validate()
            .unwrap_err();
        assert_eq!(err, SessionFormError::EndNotAfterStart);
    }

    #[test]
    fn test_bad_date_or_time() {
        assert!(matches!(
            form(("2025-13-01", "09:00"), ("2025-03-04", "10:00")).validate(),
            Err(SessionFormError::InvalidDateTime(_))
        ));
        assert!(matches!(
            form(("2025-03-04", "9am"), ("2025-03-04", "10:00")).validate(),
            Err(SessionFormError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn test_far_future_date_is_error_not_overflow() {
        let err = form(("2300-01-01", "09:00"), ("2300-01-01", "10:00"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, SessionFormError::InvalidDateTime(_)));

        assert!(matches!(
            parse_local_datetime("1500-06-01", "12:00"),
            Err(SessionFormError::InvalidDateTime(_))
        ));
        assert!(parse_local_datetime("2262-01-01", "00:00").is_ok());
    }

    #[test]
    fn test_validate_session_bounds() {
        for (start, end) in [(10, 10), (10, 9), (0, -1), (i64::MAX, i64::MIN)] {
            assert_eq!(
                validate_session("x", start, end),
                Err(SessionFormError::EndNotAfterStart)
            );
        }
        assert!(validate_session("x", 10, 11).is_ok());
        assert_eq!(validate_session("   ", 10, 11), Err(SessionFormError::EmptyName));
    }
}
