pub mod account;
pub mod config;
pub mod doctor;
pub mod group;
pub mod queue;

use comfy_table::{presets, modifiers, Attribute, Cell, Table};
use owo_colors::OwoColorize;
use qd_models::{Group, GroupSummary, QueueItem};
use serde_json::{json, Value};

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    table
}

pub(crate) fn print_queue(items: &[QueueItem]) {
    if items.is_empty() {
        println!("{}", "Nothing to watch here yet.".bright_black());
        return;
    }

    let mut t = table(&["ID", "Name", "Service", "Added", "Poster"]);
    for item in items {
        let added = item
            .added_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let poster = if item.has_poster() { "✓".green().to_string() } else { "✗".red().to_string() };
        t.add_row(vec![
            Cell::new(item.id.as_str()),
            Cell::new(&item.name),
            Cell::new(&item.service),
            Cell::new(added),
            Cell::new(poster),
        ]);
    }
    println!("{}", t);
}

/// Group documents keep their id as the key, so put it back for JSON output
pub(crate) fn groups_json(groups: &[Group]) -> Value {
    Value::Array(
        groups
            .iter()
            .map(|g| json!({ "id": g.id, "group": g }))
            .collect(),
    )
}

pub(crate) fn print_groups(groups: &[Group]) {
    if groups.is_empty() {
        println!("{}", "No groups found.".bright_black());
        return;
    }

    let mut t = table(&["ID", "Name", "Members", "Items", "Created"]);
    for group in groups {
        t.add_row(vec![
            Cell::new(group.id.as_str()),
            Cell::new(&group.name),
            Cell::new(group.members.len()),
            Cell::new(group.queue.len()),
            Cell::new(group.created_at.format("%Y-%m-%d").to_string()),
        ]);
    }
    println!("{}", t);
}

pub(crate) fn print_summaries(groups: &[GroupSummary]) {
    if groups.is_empty() {
        println!("{}", "You are not in any groups yet.".bright_black());
        return;
    }

    let mut t = table(&["ID", "Name"]);
    for group in groups {
        t.add_row(vec![Cell::new(group.id.as_str()), Cell::new(&group.name)]);
    }
    println!("{}", t);
}
