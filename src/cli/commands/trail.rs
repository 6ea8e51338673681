//! Trail command implementations.

use super::{delete_record, fmt_opt, index_marker, Workspace};
use crate::cli::{TrailAddArgs, TrailCommands, TrailUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{RecordKey, RecordKind, Trail, TrailDraft};
use crate::storage::lock;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct TrailListOutput {
    trails: Vec<Trail>,
    count: usize,
}

/// Execute trail commands.
pub fn execute(command: &TrailCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        TrailCommands::Add(args) => add(args, ws, json),
        TrailCommands::Update(args) => update(args, ws, json),
        TrailCommands::Delete { id } => {
            delete_record(ws, RecordKey::new(RecordKind::Trail, *id), json)
        }
        TrailCommands::List { limit } => list(*limit, ws, json),
        TrailCommands::Show { id } => show(*id, ws, json),
    }
}

fn add(args: &TrailAddArgs, ws: &Workspace, json: bool) -> Result<()> {
    let draft = TrailDraft {
        label: args.label.clone(),
        description: args.description.clone(),
        gpx_path: args.gpx.clone(),
        difficulty: args.difficulty.parse()?,
        route_type: args.route_type.parse()?,
        distance: args.distance,
        duration: args.duration,
        elevation: args.elevation,
    };
    let trail = ws.catalog().create_trail(&draft)?;
    print_saved("Created", &trail, json)
}

fn update(args: &TrailUpdateArgs, ws: &Workspace, json: bool) -> Result<()> {
    let current = lock(ws.store())?
        .get_trail(args.id)?
        .ok_or(Error::TrailNotFound { id: args.id })?;

    let mut draft = TrailDraft::from(&current);
    if let Some(label) = &args.label {
        draft.label.clone_from(label);
    }
    if let Some(gpx) = &args.gpx {
        draft.gpx_path.clone_from(gpx);
    }
    if let Some(description) = &args.description {
        draft.description.clone_from(description);
    }
    if let Some(difficulty) = &args.difficulty {
        draft.difficulty = difficulty.parse()?;
    }
    if let Some(route_type) = &args.route_type {
        draft.route_type = route_type.parse()?;
    }
    if args.distance.is_some() {
        draft.distance = args.distance;
    }
    if args.duration.is_some() {
        draft.duration = args.duration;
    }
    if args.elevation.is_some() {
        draft.elevation = args.elevation;
    }

    let trail = ws.catalog().update_trail(args.id, &draft)?;
    print_saved("Updated", &trail, json)
}

fn print_saved(verb: &str, trail: &Trail, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", trail.id);
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string(trail)?);
    } else {
        println!("{verb} trail {}: {}", trail.id, trail.label.bold());
    }
    Ok(())
}

fn list(limit: Option<usize>, ws: &Workspace, json: bool) -> Result<()> {
    let trails = lock(ws.store())?.list_trails(limit)?;

    if crate::is_csv() {
        println!("id,label,difficulty,route_type,distance,duration,elevation,external_index_id");
        for t in &trails {
            println!(
                "{},{},{},{},{},{},{},{}",
                t.id,
                crate::csv_escape(&t.label),
                t.difficulty.as_str(),
                t.route_type.as_str(),
                t.distance.map(|d| d.to_string()).unwrap_or_default(),
                t.duration.map(|d| d.to_string()).unwrap_or_default(),
                t.elevation.map(|e| e.to_string()).unwrap_or_default(),
                t.external_index_id.map(|u| u.to_string()).unwrap_or_default(),
            );
        }
    } else if json {
        let output = TrailListOutput {
            count: trails.len(),
            trails,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if trails.is_empty() {
        println!("No trails found.");
    } else {
        println!("Trails ({} found):", trails.len());
        println!();
        for t in &trails {
            println!(
                "{} [{}] {} ({}, {})",
                index_marker(t.external_index_id),
                t.id,
                t.label,
                t.difficulty.label(),
                t.route_type.label()
            );
            println!(
                "        {}",
                format!(
                    "{} · {} · {}",
                    fmt_opt(t.distance, "m"),
                    fmt_opt(t.duration, "min"),
                    fmt_opt(t.elevation, "m")
                )
                .dimmed()
            );
        }
    }
    Ok(())
}

fn show(id: i64, ws: &Workspace, json: bool) -> Result<()> {
    let trail = lock(ws.store())?
        .get_trail(id)?
        .ok_or(Error::TrailNotFound { id })?;

    if json {
        println!("{}", serde_json::to_string(&trail)?);
        return Ok(());
    }

    println!("{}", trail.label.bold());
    println!("  ID:          {}", trail.id);
    println!("  Difficulty:  {}", trail.difficulty.label());
    println!("  Route:       {}", trail.route_type.label());
    println!("  Distance:    {}", fmt_opt(trail.distance, "m"));
    println!("  Duration:    {}", fmt_opt(trail.duration, "min"));
    println!("  Elevation:   {}", fmt_opt(trail.elevation, "m"));
    println!("  GPX:         {}", trail.gpx_path);
    println!(
        "  Index point: {}",
        trail
            .external_index_id
            .map_or_else(|| "not synced".dimmed().to_string(), |u| u.to_string())
    );
    if !trail.description.is_empty() {
        println!();
        println!("{}", trail.description);
    }
    Ok(())
}
