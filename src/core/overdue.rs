use crate::core::{Closure, ClosureDocument, Service};
use crate::utils::error::{ClosureError, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

/// A closure whose re-confirmation is overdue, with the display name of its service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueClosure {
    pub service_name: String,
    pub closure: Closure,
}

/// One entry per closure already stamped `confirmation_overdue`, in service then closure order.
pub fn find_overdue(services: &[Service]) -> Vec<OverdueClosure> {
    let overdue: Vec<OverdueClosure> = services
        .iter()
        .flat_map(|service| {
            service
                .closures
                .iter()
                .filter(|c| c.confirmation_overdue)
                .map(move |c| OverdueClosure {
                    service_name: service.name.clone(),
                    closure: c.clone(),
                })
        })
        .collect();

    tracing::debug!(
        "Found {} overdue confirmations across {} services",
        overdue.len(),
        services.len()
    );
    overdue
}

/// Records that a moderator has re-confirmed a closure: stamps `confirmed_date`
/// and clears the overdue flag. The code must identify exactly one service.
pub fn confirm_closure(
    document: &mut ClosureDocument,
    code: &str,
    closure_id: i32,
    now: NaiveDateTime,
) -> Result<Closure> {
    let mut services = document.services.iter_mut().filter(|s| s.code == code);
    let service = match (services.next(), services.next()) {
        (Some(service), None) => service,
        _ => return Err(ClosureError::not_found(format!("service {}", code))),
    };

    let closure = service
        .closures
        .iter_mut()
        .find(|c| c.id == closure_id)
        .ok_or_else(|| ClosureError::not_found(format!("closure {} for {}", closure_id, code)))?;
    closure.confirmed_date = Some(now);
    closure.confirmation_overdue = false;

    tracing::info!("Confirmed closure {} for {}", closure_id, service.name);
    Ok(closure.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn closure(overdue: bool) -> Closure {
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut closure = Closure::new(day, day);
        closure.confirmation_required = true;
        closure.confirmation_overdue = overdue;
        closure
    }

    #[test]
    fn test_empty_input() {
        assert!(find_overdue(&[]).is_empty());
    }

    #[test]
    fn test_no_flagged_closures() {
        let mut service = Service::new("1", "Hillside");
        service.closures = vec![closure(false), closure(false)];
        assert!(find_overdue(&[service]).is_empty());
    }

    #[test]
    fn test_pairs_each_overdue_closure_with_service_name() {
        let mut a = Service::new("1", "Hillside");
        a.closures = vec![closure(true), closure(false), closure(true)];
        let mut b = Service::new("2", "Brookvale");
        b.closures = vec![closure(true)];

        let overdue = find_overdue(&[a, b]);
        let names: Vec<&str> = overdue.iter().map(|o| o.service_name.as_str()).collect();
        assert_eq!(names, vec!["Hillside", "Hillside", "Brookvale"]);
        assert!(overdue.iter().all(|o| o.closure.confirmation_overdue));
    }

    #[test]
    fn test_confirmation_required_alone_is_not_overdue() {
        let mut service = Service::new("1", "Hillside");
        let mut c = closure(false);
        c.confirmation_required = true;
        service.closures = vec![c];
        assert!(find_overdue(&[service]).is_empty());
    }

    #[test]
    fn test_confirm_clears_overdue_flag() {
        let mut service = Service::new("1", "Hillside");
        let mut c = closure(true);
        c.id = 42;
        service.closures = vec![c, closure(true)];
        let mut document = ClosureDocument::with_services(vec![service]);
        let now = NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let confirmed = confirm_closure(&mut document, "1", 42, now).unwrap();
        assert_eq!(confirmed.confirmed_date, Some(now));
        assert!(!confirmed.confirmation_overdue);
        assert_eq!(find_overdue(&document.services).len(), 1);
    }

    #[test]
    fn test_confirm_unknown_or_shared_code() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut document = ClosureDocument::with_services(vec![
            Service::new("1", "Hillside"),
            Service::new("1", "Hillside annexe"),
        ]);
        assert!(matches!(
            confirm_closure(&mut document, "1", 1, now),
            Err(ClosureError::NotFound { .. })
        ));
        assert!(matches!(
            confirm_closure(&mut document, "2", 1, now),
            Err(ClosureError::NotFound { .. })
        ));
    }
}
