use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use pager_cli::catalog::Album;
use pager_cli::types::{BrowseReport, SearchOutcome, SearchReport};

pub fn print_browse(report: &BrowseReport) {
    println!("Pages fetched: {}", report.pages);
    println!("Catalog requests: {}", report.requests);
    if !report.exhausted {
        println!("More albums available (stopped at page limit)");
    }
    if report.removed > 0 {
        println!("Removed locally: {}", report.removed);
    }
    if let Some(label) = &report.empty_label {
        println!("{label}");
        return;
    }
    println!("{}", album_table(&report.albums));
    println!("Final state: {}", report.state);
}

pub fn print_search(report: &SearchReport) {
    println!("Debounce: {} ms", report.debounce.as_millis());
    let mut table = Table::new();
    table.set_header(vec![header_cell("Typed"), header_cell("Outcome")]);
    apply_table_style(&mut table);
    for attempt in &report.attempts {
        table.add_row(vec![Cell::new(&attempt.text), outcome_cell(&attempt.outcome)]);
    }
    println!("{table}");
    println!("Catalog requests: {}", report.requests);
    if !report.results.is_empty() {
        println!("{}", album_table(&report.results));
    }
}

fn album_table(albums: &[Album]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Title"),
        header_cell("Artist"),
        header_cell("Year"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for album in albums {
        table.add_row(vec![
            dim_cell(album.id),
            Cell::new(&album.title).add_attribute(Attribute::Bold),
            Cell::new(&album.artist),
            Cell::new(album.year),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(albums.len()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    table
}

fn outcome_cell(outcome: &SearchOutcome) -> Cell {
    match outcome {
        SearchOutcome::Superseded => dim_cell("superseded"),
        SearchOutcome::Found(0) => Cell::new("no results").fg(Color::Yellow),
        SearchOutcome::Found(count) => Cell::new(format!("{count} found"))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        SearchOutcome::Failed(message) => Cell::new(message).fg(Color::Red),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
