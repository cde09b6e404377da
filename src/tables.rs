use comfy_table::{Attribute, Cell, CellAlignment, Table, modifiers, presets};

use crate::core::{poller::Readings, reading::descriptors};

/// Render one polling cycle the way the host platform would show it:
/// one row per data field per device.
pub fn build_readings_table(readings: &Readings) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table.set_header(vec!["Serial", "Device", "Field", "Value", "Unit"]);
    for (serial_number, reading) in readings {
        for descriptor in descriptors(reading.device_type) {
            table.add_row(vec![
                Cell::new(serial_number).add_attribute(Attribute::Dim),
                Cell::new(reading.device_type.model()).add_attribute(Attribute::Dim),
                Cell::new(descriptor.key),
                Cell::new(&reading.data[descriptor.key]).set_alignment(CellAlignment::Right),
                Cell::new(descriptor.unit.unwrap_or_default()).add_attribute(Attribute::Dim),
            ]);
        }
    }
    table
}
