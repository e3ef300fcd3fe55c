use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use psp_engine::RunOutcome;
use psp_model::RuleState;

pub fn print_section_table(outcome: &RunOutcome) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Section"),
        header_cell("State"),
        header_cell("Rules"),
        header_cell("Errors"),
        header_cell("Warnings"),
        header_cell("Infos"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for section in &outcome.sections {
        let name = if section.enabled {
            Cell::new(&section.name)
        } else {
            dim_cell(&section.name)
        };
        let state = if section.enabled {
            state_cell(section.state)
        } else {
            dim_cell("SKIPPED")
        };
        table.add_row(vec![
            name,
            state,
            Cell::new(section.rules.len()),
            count_cell(section.counts.error, Color::Red),
            count_cell(section.counts.warning, Color::Yellow),
            count_cell(section.counts.info, Color::Blue),
        ]);
    }
    let rules: usize = outcome
        .enabled_sections()
        .map(|section| section.rules.len())
        .sum();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        verdict_cell(outcome.is_valid()),
        Cell::new(rules).add_attribute(Attribute::Bold),
        count_cell(outcome.totals.error, Color::Red).add_attribute(Attribute::Bold),
        count_cell(outcome.totals.warning, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(outcome.totals.info, Color::Blue).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

pub fn dim_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::DarkGrey)
        .add_attribute(Attribute::Dim)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        Cell::new(count).fg(Color::DarkGrey)
    }
}

fn state_cell(state: RuleState) -> Cell {
    match state {
        RuleState::Finished => Cell::new(state.as_str()).fg(Color::Green),
        RuleState::Canceled => Cell::new(state.as_str()).fg(Color::Yellow),
        RuleState::Waiting | RuleState::Running => dim_cell(state.as_str()),
    }
}

fn verdict_cell(valid: bool) -> Cell {
    if valid {
        Cell::new("VALID")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("INVALID")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}
