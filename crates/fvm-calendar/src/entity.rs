//! Reading-window calendar for one meter
//!
//! Holds the most recent portal result for a meter, refreshes it at most once
//! per configured interval and answers "current event" and date-range queries.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use fvm_core::{
    LocationMeter, MeterController, ReadingTimeWindow, RefreshConfig, local_day, next_upcoming,
    overlapping,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CalendarError, Result};
use crate::models::CalendarEvent;

/// Calendar of dictation and reading windows for one meter
pub struct ReadingCalendar {
    name: String,
    unique_id: String,
    controller: Arc<MeterController>,
    meter: LocationMeter,
    min_refresh_interval: Duration,
    windows: Vec<ReadingTimeWindow>,
    last_refresh: Option<DateTime<Utc>>,
    loaded: bool,
    reauth_required: bool,
    event: Option<CalendarEvent>,
}

impl ReadingCalendar {
    /// Create a calendar for `meter`; `entry_id` scopes the unique id to one account entry
    pub fn new(entry_id: &str, controller: Arc<MeterController>, meter: LocationMeter) -> Self {
        let suffix = format!(
            "{}_{}_dictation_and_reading",
            meter.location_id, meter.meter_serial_number
        );

        Self {
            name: format!("fvm_{}", suffix),
            unique_id: format!("{}_{}", entry_id, suffix),
            controller,
            meter,
            min_refresh_interval: RefreshConfig::default().min_interval(),
            windows: Vec::new(),
            last_refresh: None,
            loaded: false,
            reauth_required: false,
            event: None,
        }
    }

    /// Set the minimum time between two portal refreshes
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn meter(&self) -> &LocationMeter {
        &self.meter
    }

    /// The next upcoming event as of the last [`update`](Self::update)
    pub fn event(&self) -> Option<&CalendarEvent> {
        self.event.as_ref()
    }

    /// Windows kept from the last successful refresh
    pub fn windows(&self) -> &[ReadingTimeWindow] {
        &self.windows
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Whether the portal rejected the credentials on the last attempt
    pub fn reauth_required(&self) -> bool {
        self.reauth_required
    }

    /// Allow the next call to hit the portal regardless of the throttle
    ///
    /// Also clears a pending reauthentication, e.g. after the account was
    /// reconfigured.
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
        self.reauth_required = false;
    }

    /// Refresh (throttled) and recompute the next upcoming event
    pub async fn update(&mut self) -> Result<()> {
        self.update_at(Utc::now(), Local::now().date_naive()).await
    }

    /// Events overlapping a timestamp range, compared by local calendar day
    pub async fn events<Tz: TimeZone>(
        &mut self,
        range_start: &DateTime<Tz>,
        range_end: &DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>> {
        let (start, end) = (local_day(range_start), local_day(range_end));
        self.events_between(start, end).await
    }

    /// Events overlapping an inclusive day range
    pub async fn events_between(
        &mut self,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        self.events_between_at(range_start, range_end, Utc::now(), Local::now().date_naive())
            .await
    }

    async fn update_at(&mut self, now: DateTime<Utc>, today: NaiveDate) -> Result<()> {
        self.refresh(now, today).await?;
        self.event = next_upcoming(&self.windows, today).map(|window| self.event_for(window));
        Ok(())
    }

    async fn events_between_at(
        &mut self,
        range_start: NaiveDate,
        range_end: NaiveDate,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        self.refresh(now, today).await?;

        Ok(overlapping(&self.windows, range_start, range_end)
            .into_iter()
            .map(|window| self.event_for(window))
            .collect())
    }

    /// Fetch windows from the portal unless the last attempt is too recent
    ///
    /// Failures keep the previous windows once a refresh has succeeded;
    /// before that they are returned as [`CalendarError::Portal`]. Rejected
    /// credentials surface as [`CalendarError::ReauthRequired`] on every call
    /// until [`invalidate`](Self::invalidate).
    async fn refresh(&mut self, now: DateTime<Utc>, today: NaiveDate) -> Result<()> {
        if self.reauth_required {
            return Err(CalendarError::ReauthRequired(self.controller.username().to_string()));
        }

        if let Some(last) = self.last_refresh {
            if now - last < self.min_refresh_interval {
                debug!(calendar = %self.name, "Refresh throttled");
                return Ok(());
            }
        }

        let result = self
            .controller
            .get_reading_windows(&self.meter.location_id, &self.meter.meter_serial_number)
            .await;

        match result {
            Ok(windows) => {
                self.last_refresh = Some(now);
                self.loaded = true;
                self.windows = windows
                    .into_iter()
                    .filter(|window| window.end() >= today)
                    .collect();
                info!(calendar = %self.name, "Refreshed {} reading windows", self.windows.len());
                Ok(())
            }
            Err(e) if e.is_authentication() => {
                warn!(calendar = %self.name, "Portal credentials rejected");
                self.reauth_required = true;
                Err(CalendarError::ReauthRequired(self.controller.username().to_string()))
            }
            Err(e) if self.loaded => {
                self.last_refresh = Some(now);
                warn!(
                    calendar = %self.name,
                    "Refresh failed, keeping {} cached windows: {}",
                    self.windows.len(),
                    e
                );
                Ok(())
            }
            Err(e) => {
                warn!(calendar = %self.name, "Refresh failed with nothing cached: {}", e);
                Err(CalendarError::Portal(e))
            }
        }
    }

    fn event_for(&self, window: &ReadingTimeWindow) -> CalendarEvent {
        CalendarEvent::from_window(window)
            .with_uid(format!("{}_{}", self.unique_id, window.start().format("%Y%m%d")))
    }
}

/// Create one calendar per meter registered for the controller's account
pub async fn setup_calendars(
    entry_id: &str,
    controller: Arc<MeterController>,
    refresh: &RefreshConfig,
) -> Result<Vec<ReadingCalendar>> {
    info!("Setting up FVM calendars for {}", controller.username());

    let meters = controller.get_locations_and_meters().await.map_err(|e| {
        if e.is_authentication() {
            CalendarError::ReauthRequired(controller.username().to_string())
        } else {
            CalendarError::Portal(e)
        }
    })?;

    let calendars: Vec<ReadingCalendar> = meters
        .into_iter()
        .map(|meter| {
            ReadingCalendar::new(entry_id, Arc::clone(&controller), meter)
                .with_min_refresh_interval(refresh.min_interval())
        })
        .collect();

    info!("Set up {} FVM calendars", calendars.len());
    Ok(calendars)
}
