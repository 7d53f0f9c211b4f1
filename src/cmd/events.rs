//! Event log and callback decoding: `grid events`, `grid callback`.

use anyhow::{Result, bail};

use grid::callback;
use grid::models::{Event, EventDetails};

use super::{Runtime, print_json};

fn describe(event: &Event) -> String {
    match &event.details {
        Some(EventDetails::PhaseChange(d)) => format!("{} → {}", d.from, d.to),
        Some(EventDetails::Approval(d)) => match &d.feedback {
            Some(feedback) => format!("{} {} ({})", d.artifact_id, d.status.as_str(), feedback),
            None => format!("{} {}", d.artifact_id, d.status.as_str()),
        },
        Some(EventDetails::TaskUpdate(d)) => format!("tasks {:?} {}", d.task_numbers, d.status),
        Some(EventDetails::Review(d)) => {
            format!("task {} {} {}", d.task_number, d.verdict.marker(), d.note)
        }
        None => String::new(),
    }
}

pub fn cmd_events(rt: &Runtime, project: &str, limit: usize) -> Result<()> {
    let store = rt.open_store()?;
    let events = store.list_events(project, Some(limit))?;
    if rt.json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No events.");
    }
    for event in &events {
        println!(
            "{:>5}  {}  {:<12} {}",
            event.id,
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.event_type.as_str(),
            describe(event)
        );
    }
    Ok(())
}

pub fn cmd_callback(rt: &Runtime, raw: &str) -> Result<()> {
    let Some(data) = callback::parse(raw) else {
        bail!("Invalid callback token: {}", raw);
    };
    if rt.json {
        return print_json(&data);
    }
    println!("action: {}", data.action.as_str());
    println!("id:     {}", data.id);
    if let Some(numbers) = data.task_numbers() {
        println!("tasks:  {:?}", numbers);
    } else if let Some(extra) = &data.extra {
        println!("extra:  {}", extra);
    }
    Ok(())
}
