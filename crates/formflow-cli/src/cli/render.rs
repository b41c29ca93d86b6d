//! Styled terminal output for drafts, save results and dropped transitions.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use formflow_types::draft::Draft;
use formflow_types::error::UnsendableTransition;
use formflow_types::id::EntityId;

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).fg(Color::White)).collect()
}

/// Unsaved entities show `new` instead of a temporary id.
fn id_cell(id: &EntityId) -> Cell {
    match id {
        EntityId::Real(id) => Cell::new(id).fg(Color::DarkGrey),
        EntityId::Temporary(_) => Cell::new("new").fg(Color::Yellow),
    }
}

fn stage_name(draft: &Draft, id: &EntityId) -> String {
    draft
        .stage(id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("<missing {id}>"))
}

pub fn print_draft(draft: &Draft) {
    println!();
    match draft.form_version_id {
        Some(id) => println!("  {} {}", style("Form version").bold(), style(id).cyan().bold()),
        None => println!("  {}", style("Unsaved form version").bold()),
    }
    println!();

    if draft.stages.is_empty() {
        println!("  {}", style("No stages yet.").dim());
        println!();
        return;
    }

    for stage in &draft.stages {
        let marker = if stage.is_initial {
            format!(" {}", style("(initial)").green())
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            style("──").dim(),
            style(&stage.name).cyan().bold(),
            marker
        );

        if stage.sections.is_empty() {
            println!("     {}", style("no sections").dim());
            println!();
            continue;
        }

        let mut t = table();
        t.set_header(header(&["Order", "Section", "ID", "Fields"]));
        for section in stage.sections_in_display_order() {
            let fields = section
                .fields
                .iter()
                .map(|f| f.label.clone().unwrap_or_else(|| format!("type {}", f.field_type_id)))
                .collect::<Vec<_>>()
                .join(", ");
            t.add_row(vec![
                Cell::new(section.order),
                Cell::new(&section.name).fg(Color::Cyan),
                id_cell(&section.id),
                Cell::new(fields),
            ]);
        }
        println!("{t}");
        println!();
    }

    if !draft.transitions.is_empty() {
        println!("  {}", style("── Transitions ──").dim());
        let mut t = table();
        t.set_header(header(&["ID", "From", "To", "Label", "Actions"]));
        for transition in &draft.transitions {
            let to = match (&transition.to_stage_id, transition.is_final) {
                (_, true) => Cell::new("● final").fg(Color::Green),
                (Some(to), false) => Cell::new(stage_name(draft, to)),
                (None, false) => Cell::new("-").fg(Color::DarkGrey),
            };
            t.add_row(vec![
                id_cell(&transition.id),
                Cell::new(stage_name(draft, &transition.from_stage_id)),
                to,
                Cell::new(&transition.label),
                Cell::new(transition.actions.len()),
            ]);
        }
        println!("{t}");
        println!();
    }
}

pub fn print_dropped(dropped: &[UnsendableTransition]) {
    if dropped.is_empty() {
        return;
    }
    println!(
        "  {} {} transition(s) were not sent:",
        style("!").yellow().bold(),
        dropped.len()
    );
    let mut t = table();
    t.set_header(header(&["Transition", "Label", "Reason"]));
    for item in dropped {
        t.add_row(vec![
            Cell::new(item.transition_id.to_string()).fg(Color::DarkGrey),
            Cell::new(&item.label),
            Cell::new(item.reason.to_string()).fg(Color::Yellow),
        ]);
    }
    println!("{t}");
    println!();
}

pub fn success(message: impl std::fmt::Display) {
    println!("  {} {}", style("✓").green().bold(), message);
}

pub fn warning(message: impl std::fmt::Display) {
    println!("  {} {}", style("!").yellow().bold(), message);
}
