//! Chat command implementations.

use super::Workspace;
use crate::cli::ChatCommands;
use crate::error::Result;
use crate::storage::lock;
use colored::Colorize;

/// Execute chat commands.
pub fn execute(command: &ChatCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        ChatCommands::Ask {
            question,
            room,
            user,
        } => ask(question, room, user.as_deref(), ws, json),
        ChatCommands::History { room, limit } => history(room, *limit, ws, json),
    }
}

fn ask(question: &str, room: &str, user: Option<&str>, ws: &Workspace, json: bool) -> Result<()> {
    let chat = ws.services()?.chat()?;
    let user = user.unwrap_or_else(|| ws.catalog().actor());
    let reply = ws.block_on(chat.answer(room, user, question))?;

    if json {
        println!("{}", serde_json::to_string(&reply)?);
    } else {
        println!("{}", reply.answer);
        if reply.context_points == 0 {
            println!("{}", "(no knowledge matched this question)".dimmed());
        }
    }
    Ok(())
}

fn history(room: &str, limit: usize, ws: &Workspace, json: bool) -> Result<()> {
    let messages = lock(ws.store())?.list_messages(room, Some(limit))?;

    if crate::is_csv() {
        println!("id,author,content,created_at");
        for m in &messages {
            println!(
                "{},{},{},{}",
                m.id,
                crate::csv_escape(&m.author),
                crate::csv_escape(&m.content),
                m.created_at
            );
        }
    } else if json {
        let output = serde_json::json!({
            "room": room,
            "messages": messages,
            "count": messages.len(),
        });
        println!("{output}");
    } else if messages.is_empty() {
        println!("No messages in #{room}.");
    } else {
        for m in &messages {
            let author = if m.is_from_bot() {
                m.author.cyan().bold()
            } else {
                m.author.bold()
            };
            println!("{author}: {}", m.content);
        }
    }
    Ok(())
}
