//! Meter controller
//!
//! Orchestrates one portal session per call: root page priming, login,
//! data fetch, then mapping of the raw records into value types.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::models::{
    Credentials, LocationMeter, LocationsPayload, ReadingTimeWindow, ReadingWindowsPayload,
};
use crate::session::{HttpSessionFactory, PortalApi, SessionFactory};
use crate::{Error, Result};

/// Portal controller for a single account
#[derive(Clone)]
pub struct MeterController {
    credentials: Credentials,
    sessions: Arc<dyn SessionFactory>,
}

impl std::fmt::Debug for MeterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterController")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl MeterController {
    /// Create a controller talking to the portal described by `config`
    pub fn new(config: PortalConfig, credentials: Credentials) -> Self {
        Self::with_session_factory(credentials, Arc::new(HttpSessionFactory::new(config)))
    }

    /// Create a controller with a custom session factory
    pub fn with_session_factory(credentials: Credentials, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            credentials,
            sessions,
        }
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Get the registered locations and meters of the account
    pub async fn get_locations_and_meters(&self) -> Result<Vec<LocationMeter>> {
        let mut session = self.sessions.open()?;
        let result = self.locations_and_meters_in(session.as_ref()).await;
        session.close();
        result
    }

    /// Get the dictation and reading windows of one meter, sorted by start date
    pub async fn get_reading_windows(
        &self,
        location_id: &str,
        meter_serial: &str,
    ) -> Result<Vec<ReadingTimeWindow>> {
        let mut session = self.sessions.open()?;
        let result = self
            .reading_windows_in(session.as_ref(), location_id, meter_serial)
            .await;
        session.close();
        result
    }

    /// Check whether the portal accepts the stored credentials
    pub async fn verify_credentials(&self) -> Result<bool> {
        let mut session = self.sessions.open()?;
        let result = self.try_login(session.as_ref()).await;
        session.close();
        result
    }

    async fn try_login(&self, session: &dyn PortalApi) -> Result<bool> {
        session.fetch_root_page().await?;
        session.login(&self.credentials).await
    }

    async fn authenticate(&self, session: &dyn PortalApi) -> Result<()> {
        if !self.try_login(session).await? {
            warn!("Portal rejected credentials for {}", self.credentials.username);
            return Err(Error::Authentication(self.credentials.username.clone()));
        }
        Ok(())
    }

    async fn locations_and_meters_in(&self, session: &dyn PortalApi) -> Result<Vec<LocationMeter>> {
        self.authenticate(session).await?;

        let raw = session.fetch_locations_and_meters().await?;
        let meters = parse_locations(raw)?;

        info!("Fetched {} meters for {}", meters.len(), self.credentials.username);
        Ok(meters)
    }

    async fn reading_windows_in(
        &self,
        session: &dyn PortalApi,
        location_id: &str,
        meter_serial: &str,
    ) -> Result<Vec<ReadingTimeWindow>> {
        self.authenticate(session).await?;

        let raw = session.fetch_reading_windows(location_id, meter_serial).await?;
        let windows = parse_reading_windows(raw)?;

        info!(
            location_id,
            meter_serial,
            "Fetched {} reading windows",
            windows.len()
        );
        Ok(windows)
    }
}

/// Map the locations payload into meters, preserving portal order
pub fn parse_locations(raw: Value) -> Result<Vec<LocationMeter>> {
    let payload: LocationsPayload = from_payload(raw, "locations")?;
    Ok(payload
        .locations
        .entries
        .into_iter()
        .map(LocationMeter::from)
        .collect())
}

/// Map the reading windows payload, sorted ascending by start date
///
/// The sort is stable, so windows starting on the same day keep portal order.
pub fn parse_reading_windows(raw: Value) -> Result<Vec<ReadingTimeWindow>> {
    let payload: ReadingWindowsPayload = from_payload(raw, "reading windows")?;

    let mut windows = payload
        .data_model
        .entries
        .into_iter()
        .map(ReadingTimeWindow::try_from)
        .collect::<Result<Vec<_>>>()?;

    windows.sort_by_key(ReadingTimeWindow::start);
    debug!("Parsed {} reading windows", windows.len());
    Ok(windows)
}

fn from_payload<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T> {
    serde_json::from_value(raw)
        .map_err(|e| Error::Protocol(format!("unexpected {} payload: {}", what, e)))
}
