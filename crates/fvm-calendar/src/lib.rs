//! fvm-calendar: Reading-window calendars for the FVM portal
//!
//! Exposes each registered water meter as a calendar whose events are the
//! meter's upcoming dictation and reading windows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fvm_calendar::{calendar_to_ical, setup_calendars};
//! use std::sync::Arc;
//!
//! let controller = Arc::new(MeterController::new(config.portal.clone(), credentials));
//! let mut calendars = setup_calendars("default", controller, &config.refresh).await?;
//!
//! for calendar in &mut calendars {
//!     calendar.update().await?;
//!     if let Some(event) = calendar.event() {
//!         println!("{}: {}", calendar.name(), event.summary);
//!     }
//! }
//! ```

pub mod entity;
pub mod error;
pub mod models;

pub use entity::{ReadingCalendar, setup_calendars};
pub use error::{CalendarError, Result};
pub use models::{CalendarEvent, calendar_to_ical};
