//! Calendar event model and iCalendar rendering

use chrono::{Days, NaiveDate, Utc};
use fvm_core::ReadingTimeWindow;

/// Portal address shown as the event location
pub const PORTAL_URL: &str = "https://ugyfelszolgalat.vizmuvek.hu/";

/// Prefix of every event summary
pub const SUMMARY_PREFIX: &str = "Fővárosi vízművek";

/// All-day calendar event for one reading window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Event unique identifier
    pub uid: Option<String>,
    /// Event summary/title
    pub summary: String,
    /// Event description
    pub description: Option<String>,
    /// First day of the event
    pub start: NaiveDate,
    /// Last day of the event (inclusive)
    pub end: NaiveDate,
    /// Event location
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Create a new calendar event
    pub fn new(summary: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            uid: None,
            summary: summary.into(),
            description: None,
            start,
            end,
            location: None,
        }
    }

    /// Event describing a dictation or reading window
    pub fn from_window(window: &ReadingTimeWindow) -> Self {
        Self::new(
            format!("{} - {}", SUMMARY_PREFIX, window.mode()),
            window.start(),
            window.end(),
        )
        .with_description(window.mode())
        .with_location(PORTAL_URL)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the unique identifier
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Render the event as a `VEVENT` block
    ///
    /// `DTEND` is exclusive in iCalendar, so it is one day after `end`.
    pub fn to_ical(&self) -> String {
        let mut ical = String::new();

        let uid = self.uid.clone().unwrap_or_else(|| {
            format!("{}-{}@fvm-calendar", self.start.format("%Y%m%d"), self.end.format("%Y%m%d"))
        });
        let exclusive_end = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);

        ical.push_str("BEGIN:VEVENT\r\n");
        ical.push_str(&format!("UID:{}\r\n", uid));
        ical.push_str(&format!("DTSTAMP:{}\r\n", Utc::now().format("%Y%m%dT%H%M%SZ")));
        ical.push_str(&format!("DTSTART;VALUE=DATE:{}\r\n", self.start.format("%Y%m%d")));
        ical.push_str(&format!("DTEND;VALUE=DATE:{}\r\n", exclusive_end.format("%Y%m%d")));
        ical.push_str(&format!("SUMMARY:{}\r\n", escape_text(&self.summary)));

        if let Some(ref desc) = self.description {
            ical.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(desc)));
        }

        if let Some(ref loc) = self.location {
            ical.push_str(&format!("LOCATION:{}\r\n", escape_text(loc)));
        }

        ical.push_str("END:VEVENT\r\n");
        ical
    }
}

/// Wrap events into a complete `VCALENDAR` document
pub fn calendar_to_ical(events: &[CalendarEvent]) -> String {
    let mut ical = String::new();

    ical.push_str("BEGIN:VCALENDAR\r\n");
    ical.push_str("VERSION:2.0\r\n");
    ical.push_str("PRODID:-//fvm-calendar//reading windows//HU\r\n");
    ical.push_str("CALSCALE:GREGORIAN\r\n");
    ical.push_str("METHOD:PUBLISH\r\n");

    for event in events {
        ical.push_str(&event.to_ical());
    }

    ical.push_str("END:VCALENDAR\r\n");
    ical
}

fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_window() {
        let window = ReadingTimeWindow::new(date(2024, 1, 15), date(2024, 2, 15), "Diktálás").unwrap();
        let event = CalendarEvent::from_window(&window);

        assert_eq!(event.summary, "Fővárosi vízművek - Diktálás");
        assert_eq!(event.description.as_deref(), Some("Diktálás"));
        assert_eq!(event.location.as_deref(), Some(PORTAL_URL));
        assert_eq!(event.start, date(2024, 1, 15));
        assert_eq!(event.end, date(2024, 2, 15));
        assert!(event.uid.is_none());
    }

    #[test]
    fn test_to_ical_all_day_exclusive_end() {
        let event = CalendarEvent::new("Leolvasás", date(2024, 1, 15), date(2024, 1, 31)).with_uid("meter-1");
        let ical = event.to_ical();

        assert!(ical.starts_with("BEGIN:VEVENT\r\n"));
        assert!(ical.contains("UID:meter-1\r\n"));
        assert!(ical.contains("DTSTART;VALUE=DATE:20240115\r\n"));
        assert!(ical.contains("DTEND;VALUE=DATE:20240201\r\n"));
        assert!(ical.ends_with("END:VEVENT\r\n"));
    }

    #[test]
    fn test_to_ical_escapes_text() {
        let event = CalendarEvent::new("a, b; c", date(2024, 1, 1), date(2024, 1, 1))
            .with_location("Budapest, Fő utca 1.");
        let ical = event.to_ical();

        assert!(ical.contains("SUMMARY:a\\, b\\; c\r\n"));
        assert!(ical.contains("LOCATION:Budapest\\, Fő utca 1.\r\n"));
        assert!(ical.contains("UID:20240101-20240101@fvm-calendar\r\n"));
    }

    #[test]
    fn test_calendar_to_ical() {
        let events = vec![
            CalendarEvent::new("first", date(2024, 1, 1), date(2024, 1, 2)),
            CalendarEvent::new("second", date(2024, 2, 1), date(2024, 2, 2)),
        ];
        let ical = calendar_to_ical(&events);

        assert!(ical.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert_eq!(ical.matches("BEGIN:VEVENT").count(), 2);
        assert!(ical.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_calendar_to_ical_empty() {
        let ical = calendar_to_ical(&[]);
        assert!(!ical.contains("VEVENT"));
    }
}
