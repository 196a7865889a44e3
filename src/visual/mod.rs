pub mod renderer;
pub mod state;
pub mod theme;
pub mod transform;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::VizError;

/// Selectable visualization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Arc,
    ArcLine,
    ArcLineDotted,
    Bar,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Arc,
        Algorithm::ArcLine,
        Algorithm::ArcLineDotted,
        Algorithm::Bar,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::Arc => "arc",
            Algorithm::ArcLine => "arc-line",
            Algorithm::ArcLineDotted => "arc-line-dotted",
            Algorithm::Bar => "bar",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Algorithm {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.tag() == wanted)
            .ok_or_else(|| VizError::UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.tag().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!(" BAR ".parse::<Algorithm>().unwrap(), Algorithm::Bar);
        assert!("spiral".parse::<Algorithm>().is_err());
    }
}
