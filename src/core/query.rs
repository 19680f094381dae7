use crate::core::{Closure, ClosureDocument, Service, ShowAllServicesView};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// Hour of day after which "today" views switch to tomorrow.
pub const DEFAULT_CUTOFF_HOUR: u32 = 16;

/// Point-in-time reads over a parsed closure document.
///
/// Every query resolves missing or ambiguous data to an empty result or
/// `false`. "Now" is always supplied by the caller.
pub struct ClosureQuery<'a> {
    document: &'a ClosureDocument,
}

impl<'a> ClosureQuery<'a> {
    pub fn new(document: &'a ClosureDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &'a ClosureDocument {
        self.document
    }

    pub fn closures_on_day(service: &'a Service, day: NaiveDate) -> Vec<&'a Closure> {
        service.closures_on(day)
    }

    pub fn closures_today(service: &'a Service, now: NaiveDateTime) -> Vec<&'a Closure> {
        service.closures_on(now.date())
    }

    pub fn closures_tomorrow(service: &'a Service, now: NaiveDateTime) -> Vec<&'a Closure> {
        match next_day(now.date()) {
            Some(tomorrow) => service.closures_on(tomorrow),
            None => Vec::new(),
        }
    }

    /// The single service with exactly this code. Duplicate codes match nothing.
    pub fn service_by_code(&self, code: Option<&str>) -> Option<&'a Service> {
        let code = code.filter(|c| !c.is_empty())?;
        let mut matches = self.document.services.iter().filter(|s| s.code == code);
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!("Service code {} is shared by more than one service", code);
            return None;
        }
        Some(first)
    }

    pub fn closures_by_service_code(&self, code: Option<&str>) -> &'a [Closure] {
        self.service_by_code(code)
            .map(|s| s.closures.as_slice())
            .unwrap_or(&[])
    }

    pub fn closures_by_date_and_service_code(
        &self,
        day: NaiveDate,
        code: Option<&str>,
        emergency_only: bool,
    ) -> Vec<&'a Closure> {
        self.closures_by_service_code(code)
            .iter()
            .filter(|c| c.covers(day))
            .filter(|c| !emergency_only || c.reason.emergency)
            .collect()
    }

    pub fn closures_today_by_service_code(
        &self,
        now: NaiveDateTime,
        code: Option<&str>,
        emergency_only: bool,
    ) -> Vec<&'a Closure> {
        self.closures_by_date_and_service_code(now.date(), code, emergency_only)
    }

    pub fn closures_tomorrow_by_service_code(
        &self,
        now: NaiveDateTime,
        code: Option<&str>,
        emergency_only: bool,
    ) -> Vec<&'a Closure> {
        match next_day(now.date()) {
            Some(tomorrow) => self.closures_by_date_and_service_code(tomorrow, code, emergency_only),
            None => Vec::new(),
        }
    }

    /// Every closure in the document covering `day`, across all services.
    fn closures_covering(&self, day: NaiveDate) -> impl Iterator<Item = &'a Closure> + 'a {
        let document = self.document;
        document
            .services
            .iter()
            .flat_map(|s| s.closures.iter())
            .filter(move |c| c.covers(day))
    }

    pub fn emergency_closure_exists(&self, day: NaiveDate) -> bool {
        self.closures_covering(day).any(|c| c.reason.emergency)
    }

    pub fn closed_at_short_notice(&self, day: NaiveDate, max_days_notice: i32) -> bool {
        self.closures_covering(day)
            .any(|c| c.days_notice <= max_days_notice)
    }

    /// Short-notice check against the threshold stored in the document itself.
    pub fn closed_at_short_notice_on_document_threshold(&self, day: NaiveDate) -> bool {
        self.closed_at_short_notice(day, self.document.short_notice_days)
    }

    pub fn all_services_affected(&self, day: NaiveDate) -> bool {
        self.closures_covering(day)
            .any(|c| c.reason.may_affect_all_services)
    }

    pub fn should_show_all_services(&self, day: NaiveDate) -> bool {
        match self.document.show_all_services_view {
            ShowAllServicesView::Always => true,
            ShowAllServicesView::Never => false,
            ShowAllServicesView::Auto => self.all_services_affected(day),
        }
    }

    /// Services sorted by name, ordinal comparison. Ties keep document order.
    pub fn all_services(&self) -> Vec<&'a Service> {
        let mut services: Vec<&Service> = self.document.services.iter().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    pub fn emergency_closure_exists_for_display(&self, now: NaiveDateTime, cutoff_hour: u32) -> bool {
        self.emergency_closure_exists(display_day(now, cutoff_hour))
    }

    pub fn emergency_closure_exists_today(&self, now: NaiveDateTime) -> bool {
        self.emergency_closure_exists(now.date())
    }

    pub fn emergency_closure_exists_tomorrow(&self, now: NaiveDateTime) -> bool {
        next_day(now.date()).is_some_and(|d| self.emergency_closure_exists(d))
    }

    pub fn closed_today_at_short_notice(&self, now: NaiveDateTime, max_days_notice: i32) -> bool {
        self.closed_at_short_notice(now.date(), max_days_notice)
    }

    pub fn closed_tomorrow_at_short_notice(&self, now: NaiveDateTime, max_days_notice: i32) -> bool {
        next_day(now.date()).is_some_and(|d| self.closed_at_short_notice(d, max_days_notice))
    }

    pub fn all_services_affected_today(&self, now: NaiveDateTime) -> bool {
        self.all_services_affected(now.date())
    }

    pub fn all_services_affected_tomorrow(&self, now: NaiveDateTime) -> bool {
        next_day(now.date()).is_some_and(|d| self.all_services_affected(d))
    }
}

/// The day a "closed today" view should describe: tomorrow once `now` is past the cut-off hour.
pub fn display_day(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = now.date();
    match NaiveTime::from_hms_opt(cutoff_hour, 0, 0) {
        Some(cutoff) if now.time() > cutoff => next_day(today).unwrap_or(today),
        _ => today,
    }
}

fn next_day(day: NaiveDate) -> Option<NaiveDate> {
    day.checked_add_days(Days::new(1))
}
