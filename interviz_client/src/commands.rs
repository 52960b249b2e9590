//! Playback and viewport controls.

use thiserror::Error;

/// A control action from the user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Toggle,
    Play,
    Pause,
    Seek(u64),
    ScrubBegin,
    ScrubMove(u64),
    ScrubEnd(u64),
    Resize { width: u32, height: u32 },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command} expects {expected}")]
    BadArguments {
        command: &'static str,
        expected: &'static str,
    },
}

impl ControlCommand {
    /// One-line help for the stdin control surface.
    pub const HELP: &'static str =
        "commands: play | pause | toggle | seek <i> | scrub-begin | scrub <i> | scrub-end <i> | resize <w> <h> | quit";
}

impl std::str::FromStr for ControlCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words.next().ok_or(ParseCommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        let index = |command: &'static str| -> Result<u64, ParseCommandError> {
            match args.as_slice() {
                [i] => i.parse::<u64>().map_err(|_| ParseCommandError::BadArguments { command, expected: "an index" }),
                _ => Err(ParseCommandError::BadArguments { command, expected: "an index" }),
            }
        };

        match head.to_lowercase().as_str() {
            "toggle" | "t" => Ok(ControlCommand::Toggle),
            "play" => Ok(ControlCommand::Play),
            "pause" => Ok(ControlCommand::Pause),
            "seek" => index("seek").map(ControlCommand::Seek),
            "scrub-begin" | "scrub_begin" => Ok(ControlCommand::ScrubBegin),
            "scrub" => index("scrub").map(ControlCommand::ScrubMove),
            "scrub-end" | "scrub_end" => index("scrub-end").map(ControlCommand::ScrubEnd),
            "resize" => match args.as_slice() {
                [w, h] => match (w.parse::<u32>(), h.parse::<u32>()) {
                    (Ok(width), Ok(height)) => Ok(ControlCommand::Resize { width, height }),
                    _ => Err(ParseCommandError::BadArguments { command: "resize", expected: "<width> <height>" }),
                },
                _ => Err(ParseCommandError::BadArguments { command: "resize", expected: "<width> <height>" }),
            },
            "quit" | "q" | "exit" => Ok(ControlCommand::Quit),
            _ => Err(ParseCommandError::Unknown(head.to_string())),
        }
    }
}
