//! Interactive console.
//!
//! Reads `gt` command lines from stdin and runs them against one open
//! workspace, so syncs scheduled by an edit wait out the debounce delay
//! and coalesce with later edits to the same record.

use super::{dispatch, print_error, Workspace};
use crate::cli::{Cli, Commands};
use crate::error::{Error, Result};
use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const PROMPT: &str = "gt> ";

/// Run the console until `exit` or end of input.
///
/// # Errors
///
/// Returns an error only if stdin cannot be read. Command errors are
/// printed and the console keeps going.
pub fn execute(ws: &Workspace, discard_pending: bool, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        println!(
            "Green Trail console. Edits sync {}s after the last change; `exit` to quit.",
            ws.config().sync_delay_secs
        );
    }

    loop {
        if !json {
            print!("{PROMPT}");
            std::io::stdout().flush()?;
        }
        let Some(line) = ws.block_on(lines.next_line())? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        run_line(line, ws, json);
    }

    let dropped = if discard_pending {
        ws.discard_pending()
    } else {
        0
    };
    if dropped > 0 && !json {
        println!("Discarded {dropped} pending sync(s).");
    }
    Ok(())
}

fn run_line(line: &str, ws: &Workspace, json: bool) {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            print_error(&Error::InvalidArgument(format!("cannot parse line: {e}")), json);
            return;
        }
    };
    debug!(?words, "Console command");

    let cli = match Cli::try_parse_from(std::iter::once("gt".to_string()).chain(words)) {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders help and usage errors itself
            let _ = e.print();
            return;
        }
    };

    let result = match &cli.command {
        Commands::Console { .. } => Err(Error::InvalidArgument(
            "already in the console".into(),
        )),
        command => dispatch(command, ws, json || cli.json),
    };
    if let Err(e) = result {
        print_error(&e, json);
    }
}
