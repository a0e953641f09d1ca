//! Line-oriented control commands read from stdin.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    SetRate(f64),
    Stats,
    ResetStats,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ControlCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "rate" | "r" => {
            let Some(raw) = parts.next() else {
                return Err("usage: rate <multiplier>".into());
            };
            let rate = raw
                .parse::<f64>()
                .map_err(|_| format!("invalid rate: {raw}"))?;
            ControlCommand::SetRate(rate)
        }
        "stats" | "s" => ControlCommand::Stats,
        "reset" => ControlCommand::ResetStats,
        "quit" | "q" | "exit" => ControlCommand::Quit,
        other => return Err(format!("unknown command: {other}")),
    };

    if parts.next().is_some() {
        return Err(format!("unexpected arguments after '{verb}'"));
    }
    Ok(Some(command))
}

/// Read stdin on a detached thread so an idle terminal never holds up
/// shutdown. The channel closes when stdin reaches EOF.
pub fn spawn_stdin_reader(tx: UnboundedSender<ControlCommand>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("elastic-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{e}"),
                }
            }
        })?;
    Ok(())
}
