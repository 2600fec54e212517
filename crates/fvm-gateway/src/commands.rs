//! Command implementations
//!
//! Every command walks the registered accounts in username order.

use anyhow::Context;
use chrono::NaiveDate;
use fvm_calendar::{CalendarEvent, ReadingCalendar, calendar_to_ical, setup_calendars};
use fvm_core::{ControllerRegistry, RefreshConfig};
use nu_ansi_term::{Color, Style};

/// Print every location and meter of every account
pub async fn list_meters(registry: &ControllerRegistry) -> anyhow::Result<()> {
    for username in registry.usernames().await {
        let Some(controller) = registry.get(&username).await else {
            continue;
        };

        let meters = controller
            .get_locations_and_meters()
            .await
            .with_context(|| format!("Failed to list meters for {}", username))?;

        println!("{}", Style::new().bold().paint(&username));
        if meters.is_empty() {
            println!("  (no meters)");
        }
        for meter in meters {
            println!(
                "  {}  location {}  meter {}",
                meter.location_name, meter.location_id, meter.meter_serial_number
            );
        }
    }

    Ok(())
}

/// Print the next upcoming window of every meter
pub async fn show_next(registry: &ControllerRegistry, refresh: &RefreshConfig) -> anyhow::Result<()> {
    for username in registry.usernames().await {
        let mut calendars = calendars_for(registry, &username, refresh).await?;

        for calendar in &mut calendars {
            calendar
                .update()
                .await
                .with_context(|| format!("Failed to update {}", calendar.name()))?;

            match calendar.event() {
                Some(event) => println!("{}  {}", label(calendar), format_event(event)),
                None => println!("{}  {}", label(calendar), Style::new().dimmed().paint("no upcoming window")),
            }
        }
    }

    Ok(())
}

/// Print every window overlapping `[from, to]`, as text or as one iCalendar document
pub async fn show_events(
    registry: &ControllerRegistry,
    refresh: &RefreshConfig,
    from: NaiveDate,
    to: NaiveDate,
    ics: bool,
) -> anyhow::Result<()> {
    let mut all_events = Vec::new();

    for username in registry.usernames().await {
        let mut calendars = calendars_for(registry, &username, refresh).await?;

        for calendar in &mut calendars {
            let events = calendar
                .events_between(from, to)
                .await
                .with_context(|| format!("Failed to read events of {}", calendar.name()))?;

            if !ics {
                for event in &events {
                    println!("{}  {}", label(calendar), format_event(event));
                }
            }
            all_events.extend(events);
        }
    }

    if ics {
        print!("{}", calendar_to_ical(&all_events));
    } else if all_events.is_empty() {
        println!("No reading windows between {} and {}", from, to);
    }

    Ok(())
}

/// Log in with every account and report which ones the portal accepts
pub async fn check_credentials(registry: &ControllerRegistry) -> anyhow::Result<()> {
    let mut rejected = 0;

    for username in registry.usernames().await {
        let Some(controller) = registry.get(&username).await else {
            continue;
        };

        match controller.verify_credentials().await {
            Ok(true) => println!("{}  {}", Color::Green.paint("ok"), username),
            Ok(false) => {
                rejected += 1;
                println!("{}  {}", Color::Red.paint("rejected"), username);
            }
            Err(e) => {
                rejected += 1;
                println!("{}  {}: {}", Color::Yellow.paint("error"), username, e);
            }
        }
    }

    if rejected > 0 {
        anyhow::bail!("{} account(s) could not log in", rejected);
    }

    Ok(())
}

async fn calendars_for(
    registry: &ControllerRegistry,
    username: &str,
    refresh: &RefreshConfig,
) -> anyhow::Result<Vec<ReadingCalendar>> {
    let controller = registry
        .get(username)
        .await
        .with_context(|| format!("No controller registered for {}", username))?;

    setup_calendars(username, controller, refresh)
        .await
        .with_context(|| format!("Failed to set up calendars for {}", username))
}

fn label(calendar: &ReadingCalendar) -> String {
    let meter = calendar.meter();
    Color::Cyan
        .bold()
        .paint(format!("{} [{}]", meter.location_name, meter.meter_serial_number))
        .to_string()
}

fn format_event(event: &CalendarEvent) -> String {
    format!("{} .. {}  {}", event.start, event.end, event.summary)
}
