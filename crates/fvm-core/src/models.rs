//! Value types produced from portal responses

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Date format used by the portal (`2024.01.15`)
const PORTAL_DATE_FORMAT: &str = "%Y.%m.%d";

/// Portal login credentials
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Registered e-mail address
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One physical meter at one consumption location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationMeter {
    /// Location identifier (`ANLAGE`)
    pub location_id: String,
    /// Meter serial number (`SERGE`)
    pub meter_serial_number: String,
    /// Human readable location, usually the address (`FOGYH_MN`)
    pub location_name: String,
}

impl LocationMeter {
    pub fn new(
        location_id: impl Into<String>,
        meter_serial_number: impl Into<String>,
        location_name: impl Into<String>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            meter_serial_number: meter_serial_number.into(),
            location_name: location_name.into(),
        }
    }
}

/// A date range in which a meter dictation or reading is expected
///
/// `start <= end` always holds; both days are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingTimeWindow {
    start: NaiveDate,
    end: NaiveDate,
    mode: String,
}

impl ReadingTimeWindow {
    /// Create a window, rejecting ranges that end before they start
    pub fn new(start: NaiveDate, end: NaiveDate, mode: impl Into<String>) -> Result<Self> {
        if end < start {
            return Err(Error::Parse(format!(
                "reading window ends before it starts: {} - {}",
                start, end
            )));
        }

        Ok(Self {
            start,
            end,
            mode: mode.into(),
        })
    }

    /// Build a window from the portal's fixed-width `LEOIDOSZAK` field
    ///
    /// Characters `[0, 10)` hold the start date and `[11, 22)` the end date.
    pub fn from_period(period: &str, mode: impl Into<String>) -> Result<Self> {
        let start = period
            .get(0..10)
            .ok_or_else(|| Error::Parse(format!("reading period too short: {:?}", period)))?;

        // The end segment is eleven characters wide; only its leading date counts.
        let end_bound = period.len().min(22);
        let end = period
            .get(11..end_bound)
            .and_then(|segment| segment.get(..segment.len().min(10)))
            .ok_or_else(|| Error::Parse(format!("reading period too short: {:?}", period)))?;

        Self::new(parse_portal_date(start)?, parse_portal_date(end)?, mode)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }
}

impl fmt::Display for ReadingTimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}: {}", self.start, self.end, self.mode)
    }
}

/// Parse a `YYYY.MM.DD` date segment
pub fn parse_portal_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, PORTAL_DATE_FORMAT)
        .map_err(|e| Error::Parse(format!("invalid portal date {:?}: {}", value, e)))
}

// ============================================================================
// Raw portal payloads
// ============================================================================

/// `GetDiktLeolvIdoszakFogyHelyek` response
#[derive(Debug, Deserialize)]
pub(crate) struct LocationsPayload {
    #[serde(rename = "FogyHely")]
    pub locations: LocationList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationList {
    #[serde(rename = "T_FOGYH")]
    pub entries: Vec<RawLocation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLocation {
    #[serde(rename = "FOGYH_MN")]
    pub name: String,
    #[serde(rename = "ANLAGE")]
    pub location_id: String,
    #[serde(rename = "SERGE")]
    pub serial_number: String,
}

impl From<RawLocation> for LocationMeter {
    fn from(raw: RawLocation) -> Self {
        LocationMeter::new(raw.location_id, raw.serial_number, raw.name)
    }
}

/// `GetDiktalasiLeolvasasiIdoszakLisa` response
#[derive(Debug, Deserialize)]
pub(crate) struct ReadingWindowsPayload {
    #[serde(rename = "DataModel")]
    pub data_model: ReadingWindowList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadingWindowList {
    #[serde(rename = "LeolvDiktIdoszakok")]
    pub entries: Vec<RawReadingWindow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReadingWindow {
    #[serde(rename = "LEOIDOSZAK")]
    pub period: String,
    #[serde(rename = "LEOMOD")]
    pub mode: String,
}

impl TryFrom<RawReadingWindow> for ReadingTimeWindow {
    type Error = Error;

    fn try_from(raw: RawReadingWindow) -> Result<Self> {
        ReadingTimeWindow::from_period(&raw.period, raw.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_period() {
        let window = ReadingTimeWindow::from_period("2024.01.15-2024.02.15", "Diktálás").unwrap();
        assert_eq!(window.start(), date(2024, 1, 15));
        assert_eq!(window.end(), date(2024, 2, 15));
        assert_eq!(window.mode(), "Diktálás");
    }

    #[test]
    fn test_from_period_ignores_trailing_characters() {
        let window = ReadingTimeWindow::from_period("2024.01.15 2024.02.15 extra", "Leolvasás").unwrap();
        assert_eq!(window.start(), date(2024, 1, 15));
        assert_eq!(window.end(), date(2024, 2, 15));
    }

    #[test]
    fn test_from_period_fixed_width_with_markers() {
        let window = ReadingTimeWindow::from_period("2024.01.1502024.02.1502", "Diktálás").unwrap();
        assert_eq!(window.start(), date(2024, 1, 15));
        assert_eq!(window.end(), date(2024, 2, 15));
    }

    #[test]
    fn test_from_period_invalid_date() {
        let result = ReadingTimeWindow::from_period("2024-01-15-2024-02-15", "Diktálás");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_from_period_too_short() {
        let result = ReadingTimeWindow::from_period("2024.01.15", "Diktálás");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_window_rejects_reversed_range() {
        let result = ReadingTimeWindow::new(date(2024, 2, 1), date(2024, 1, 1), "x");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_window_display() {
        let window = ReadingTimeWindow::new(date(2024, 1, 1), date(2024, 1, 5), "Diktálás").unwrap();
        assert_eq!(window.to_string(), "2024-01-01-2024-01-05: Diktálás");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("user@example.com", "secret");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_locations_payload_parsing() {
        let json = serde_json::json!({
            "FogyHely": {
                "T_FOGYH": [
                    {"FOGYH_MN": "Budapest, Fő utca 1.", "ANLAGE": "1000123", "SERGE": "SN-42"}
                ]
            }
        });

        let payload: LocationsPayload = serde_json::from_value(json).unwrap();
        let meters: Vec<LocationMeter> = payload.locations.entries.into_iter().map(Into::into).collect();
        assert_eq!(meters, vec![LocationMeter::new("1000123", "SN-42", "Budapest, Fő utca 1.")]);
    }
}
