//! fvm-core: Fővárosi Vízművek customer portal client
//!
//! Replicates the portal's browser login handshake, fetches the registered
//! meters and their dictation/reading periods, and answers calendar-style
//! questions about those periods.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fvm_core::{Credentials, MeterController, PortalConfig, next_upcoming};
//!
//! let controller = MeterController::new(
//!     PortalConfig::default(),
//!     Credentials::new("user@example.com", "password"),
//! );
//!
//! for meter in controller.get_locations_and_meters().await? {
//!     let windows = controller
//!         .get_reading_windows(&meter.location_id, &meter.meter_serial_number)
//!         .await?;
//!     let today = chrono::Local::now().date_naive();
//!     println!("{}: {:?}", meter.location_name, next_upcoming(&windows, today));
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod registry;
pub mod session;
pub mod token;
pub mod window;

pub use config::{Config, PortalConfig, RefreshConfig};
pub use controller::MeterController;
pub use error::{Error, Result};
pub use models::{Credentials, LocationMeter, ReadingTimeWindow};
pub use registry::ControllerRegistry;
pub use session::{HttpSessionFactory, PortalApi, PortalSession, SessionFactory};
pub use token::extract_token;
pub use window::{local_day, next_upcoming, overlapping};
