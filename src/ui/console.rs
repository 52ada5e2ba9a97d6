use std::fmt;
use std::str::FromStr;

use crate::world::Gesture;

/// Commands the line console sends to the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageCommand {
    /// Start idle on every part
    IdleStart,

    /// Stop idle on every part
    IdleStop,

    /// Play a gesture from the animation manifest
    Play { gesture: Gesture },

    /// Cancel any one-shot and stop all playback
    Stop,

    /// Print avatar and frame loop status
    Status,

    /// Leave the console and tear the stage down
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for StageCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["idle", "start"] => Ok(StageCommand::IdleStart),
            ["idle", "stop"] => Ok(StageCommand::IdleStop),
            ["play", name] => name
                .parse()
                .map(|gesture| StageCommand::Play { gesture })
                .map_err(ParseCommandError),
            ["play"] => Err(ParseCommandError("usage: play <gesture>".to_string())),
            ["stop"] => Ok(StageCommand::Stop),
            ["status"] => Ok(StageCommand::Status),
            ["quit"] | ["exit"] => Ok(StageCommand::Quit),
            [] => Err(ParseCommandError("empty command".to_string())),
            _ => Err(ParseCommandError(format!("unknown command '{}'", line.trim()))),
        }
    }
}

pub const HELP: &str = "commands: idle start | idle stop | play <gesture> | stop | status | quit";
