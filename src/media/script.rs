use std::str::FromStr;

use crate::error::VizError;
use crate::visual::theme::ThemeColor;
use crate::visual::Algorithm;

/// What a scripted event does when its time comes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptAction {
    Play,
    Pause,
    Seek(f64),
    Color(ThemeColor),
    Algorithm(Algorithm),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptEvent {
    /// Host clock time (seconds of output) at which the action fires
    pub at: f64,
    pub action: ScriptAction,
}

impl FromStr for ScriptEvent {
    type Err = VizError;

    /// Parses `<seconds>:<action>`, e.g. `12.5:pause`, `20:seek=65`,
    /// `30:color=#33aaff`, `40:algorithm=bar`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VizError::InvalidEvent(s.to_string());
        let (at, action) = s.trim().split_once(':').ok_or_else(invalid)?;
        let at: f64 = at.trim().parse().map_err(|_| invalid())?;
        if !at.is_finite() || at < 0.0 {
            return Err(invalid());
        }

        let action = action.trim();
        let action = match action.split_once('=') {
            None if action == "play" => ScriptAction::Play,
            None if action == "pause" => ScriptAction::Pause,
            Some(("seek", to)) => {
                let to: f64 = to.trim().parse().map_err(|_| invalid())?;
                ScriptAction::Seek(to)
            }
            Some(("color", color)) => ScriptAction::Color(color.parse()?),
            Some(("algorithm", tag)) => ScriptAction::Algorithm(tag.parse()?),
            _ => return Err(invalid()),
        };

        Ok(Self { at, action })
    }
}

/// Time-ordered list of scripted events, consumed as the host clock advances.
#[derive(Debug, Default)]
pub struct MediaScript {
    events: Vec<ScriptEvent>,
    cursor: usize,
}

impl MediaScript {
    pub fn new(mut events: Vec<ScriptEvent>) -> Self {
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { events, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events that have not fired yet.
    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }

    /// Actions whose time is at or before `clock` and that have not fired yet.
    pub fn due(&mut self, clock: f64) -> Vec<ScriptAction> {
        let start = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].at <= clock {
            self.cursor += 1;
        }
        self.events[start..self.cursor].iter().map(|e| e.action).collect()
    }
}
