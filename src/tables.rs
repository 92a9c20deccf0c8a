use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{entity::Entities, snapshot::Snapshot};

pub fn build_entities_table(entities: &Entities, snapshot: &Snapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table.set_header(vec!["Unique ID", "Name", "State"]);
    for sensor in &entities.sensors {
        let state = match sensor.read(snapshot) {
            Some(reading) => Cell::new(reading),
            None => Cell::new("n/a").add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(&sensor.unique_id).add_attribute(Attribute::Dim),
            Cell::new(&sensor.name),
            state.set_alignment(CellAlignment::Right),
        ]);
    }
    for tracker in &entities.trackers {
        let state = if tracker.is_connected(snapshot) {
            Cell::new("connected").fg(Color::Green)
        } else {
            Cell::new("disconnected").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&tracker.unique_id).add_attribute(Attribute::Dim),
            Cell::new(&tracker.name),
            state.set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
