//! Line-oriented selection commands read from stdin
//!
//! ```text
//! bg <index>   select a background image
//! bg none      show the camera feed
//! blur on|off  toggle background blur
//! status       log the current selection
//! quit         stop the pipeline
//! ```

use crate::error::ControlError;
use crate::selection::SelectionControl;
use std::io::BufRead;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetBackground(Option<usize>),
    SetBlur(bool),
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, ControlError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err(ControlError::Empty);
    };
    let argument = words.next();

    let invalid = |argument: Option<&str>| ControlError::InvalidArgument {
        command: command.to_string(),
        argument: argument.unwrap_or_default().to_string(),
    };

    match command.to_ascii_lowercase().as_str() {
        "bg" | "background" => match argument {
            Some("none") | Some("-1") => Ok(Command::SetBackground(None)),
            Some(value) => value
                .parse()
                .map(|index| Command::SetBackground(Some(index)))
                .map_err(|_| invalid(argument)),
            None => Err(invalid(argument)),
        },
        "blur" => match argument {
            Some("on") | Some("1") => Ok(Command::SetBlur(true)),
            Some("off") | Some("0") => Ok(Command::SetBlur(false)),
            _ => Err(invalid(argument)),
        },
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ControlError::UnknownCommand(other.to_string())),
    }
}

/// Apply one command; returns `false` once the user asked to quit
pub fn apply_command(control: &SelectionControl, command: Command) -> bool {
    match command {
        Command::SetBackground(index) => {
            if let Err(err) = control.set_background(index) {
                tracing::warn!("{}", err);
            }
        }
        Command::SetBlur(enabled) => control.set_blur(enabled),
        Command::Status => {
            let snapshot = control.snapshot();
            tracing::info!(
                "Selection: {:?} (blur {}, version {}, {} backgrounds)",
                snapshot.selection(),
                if snapshot.blur_enabled() { "on" } else { "off" },
                snapshot.version,
                control.library_len()
            );
        }
        Command::Quit => return false,
    }
    true
}

/// Read commands from stdin until EOF or `quit`
///
/// Returns `true` when the user asked to quit. Lines are read on a plain
/// thread so a pending read never holds up runtime shutdown.
pub async fn read_stdin(control: SelectionControl) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::warn!("Interactive commands unavailable: {}", err);
        return false;
    }

    while let Some(line) = rx.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if !apply_command(&control, command) {
                    return true;
                }
            }
            Err(err) => tracing::warn!("{}", err),
        }
    }
    false
}
