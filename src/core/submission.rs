use crate::core::{Closure, Clock, Service};
use crate::utils::error::{ClosureError, Result};
use chrono::{Days, NaiveDate};

pub const MAX_NOTES_LENGTH: usize = 500;
pub const EMERGENCY_MAX_DAYS_AHEAD: u64 = 7;

/// Checks a submitted closure against the rules the edit form applies.
pub fn validate_submission(service: &Service, closure: &Closure, today: NaiveDate) -> Result<()> {
    if closure.start_date > closure.end_date {
        return Err(ClosureError::validation(
            "The closure must start before it ends",
        ));
    }
    if closure.start_date < today || closure.end_date < today {
        return Err(ClosureError::validation(
            "The closure cannot be in the past",
        ));
    }

    let reason = service
        .reasons_for_closure
        .get(&closure.reason.id)
        .ok_or_else(|| {
            ClosureError::validation(format!(
                "The reason must be a valid reason code (got {})",
                closure.reason.id
            ))
        })?;

    if reason.emergency {
        let limit = today
            .checked_add_days(Days::new(EMERGENCY_MAX_DAYS_AHEAD))
            .unwrap_or(NaiveDate::MAX);
        if closure.start_date > limit {
            return Err(ClosureError::validation(
                "Emergency closures cannot be more than a week away",
            ));
        }
    }

    let notes = closure.notes.as_deref().unwrap_or("");
    if reason.requires_notes && notes.trim().is_empty() {
        return Err(ClosureError::validation(format!(
            "Please state why the {} is closed",
            service.service_type.singular_text.to_lowercase()
        )));
    }
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ClosureError::validation(format!(
            "Your notes must be no longer than {} characters",
            MAX_NOTES_LENGTH
        )));
    }

    Ok(())
}

/// Validates a submission and stamps the fields the engine relies on: the
/// full reason record, added/modified times and days of notice.
pub fn prepare_submission(service: &Service, mut closure: Closure, clock: &dyn Clock) -> Result<Closure> {
    let now = clock.now();
    validate_submission(service, &closure, now.date())?;

    if let Some(reason) = service.reasons_for_closure.get(&closure.reason.id) {
        closure.reason = reason.clone();
    }
    if closure.date_added.is_none() {
        closure.date_added = Some(now);
    }
    closure.date_modified = Some(now);

    let added = closure.date_added.map_or(now.date(), |d| d.date());
    closure.days_notice = (closure.start_date - added).num_days().max(0) as i32;

    tracing::debug!(
        "Prepared closure for {} starting {} with {} days notice",
        service.name,
        closure.start_date,
        closure.days_notice
    );
    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::core::ClosureReason;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn school() -> Service {
        let mut service = Service::new("1", "Hillside");
        service.service_type = crate::core::ServiceType::new("School", "Schools");
        for reason in [
            ClosureReason {
                id: 1,
                reason: "Snow".to_string(),
                emergency: true,
                selectable: true,
                ..ClosureReason::default()
            },
            ClosureReason {
                id: 2,
                reason: "Other".to_string(),
                requires_notes: true,
                selectable: true,
                ..ClosureReason::default()
            },
            ClosureReason {
                id: 3,
                reason: "Training day".to_string(),
                selectable: true,
                ..ClosureReason::default()
            },
        ] {
            service.reasons_for_closure.insert(reason.id, reason);
        }
        service
    }

    fn closure(start: NaiveDate, end: NaiveDate, reason_id: i32) -> Closure {
        let mut closure = Closure::new(start, end);
        closure.reason.id = reason_id;
        closure
    }

    #[test]
    fn test_rejects_inverted_and_past_ranges() {
        let today = day(2024, 5, 1);
        assert!(validate_submission(&school(), &closure(day(2024, 5, 3), day(2024, 5, 2), 3), today).is_err());
        assert!(validate_submission(&school(), &closure(day(2024, 4, 30), day(2024, 5, 2), 3), today).is_err());
        assert!(validate_submission(&school(), &closure(day(2024, 5, 1), day(2024, 5, 1), 3), today).is_ok());
    }

    #[test]
    fn test_emergency_must_be_within_a_week() {
        let today = day(2024, 5, 1);
        assert!(validate_submission(&school(), &closure(day(2024, 5, 8), day(2024, 5, 8), 1), today).is_ok());
        assert!(validate_submission(&school(), &closure(day(2024, 5, 9), day(2024, 5, 9), 1), today).is_err());
        assert!(validate_submission(&school(), &closure(day(2024, 6, 9), day(2024, 6, 9), 3), today).is_ok());
    }

    #[test]
    fn test_notes_rules() {
        let today = day(2024, 5, 1);
        let mut c = closure(day(2024, 5, 2), day(2024, 5, 2), 2);
        let err = validate_submission(&school(), &c, today).unwrap_err();
        assert!(err.to_string().contains("Please state why the school is closed"));

        c.notes = Some("x".repeat(MAX_NOTES_LENGTH + 1));
        assert!(validate_submission(&school(), &c, today).is_err());

        c.notes = Some("Burst pipe".to_string());
        assert!(validate_submission(&school(), &c, today).is_ok());
    }

    #[test]
    fn test_unknown_reason() {
        let today = day(2024, 5, 1);
        assert!(validate_submission(&school(), &closure(day(2024, 5, 2), day(2024, 5, 2), 99), today).is_err());
    }

    #[test]
    fn test_prepare_stamps_reason_and_notice() {
        let clock = FixedClock::new(day(2024, 5, 1).and_hms_opt(8, 15, 0).unwrap());
        let prepared =
            prepare_submission(&school(), closure(day(2024, 5, 6), day(2024, 5, 7), 1), &clock)
                .unwrap();

        assert_eq!(prepared.reason.reason, "Snow");
        assert!(prepared.reason.emergency);
        assert_eq!(prepared.days_notice, 5);
        assert_eq!(prepared.date_added, Some(clock.now()));
        assert_eq!(prepared.date_modified, Some(clock.now()));
    }
}
