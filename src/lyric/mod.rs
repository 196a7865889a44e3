pub mod sync;

use crate::error::VizError;

/// A timestamped lyric line.
#[derive(Clone, Debug, PartialEq)]
pub struct LyricLine {
    pub start_time_seconds: f64,
    pub text: String,
}

/// The line active at some playback time, with the interval it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveLyricWindow {
    pub text: String,
    pub window_start: f64,
    pub window_end: f64,
}

impl ActiveLyricWindow {
    /// "No lyric" sentinel.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            window_start: 0.0,
            window_end: 0.0,
        }
    }

    /// Fraction of the window elapsed at `time`, in [0, 1]. A degenerate
    /// window (the final line) never reveals.
    pub fn percent(&self, time: f64) -> f32 {
        let span = self.window_end - self.window_start;
        if span <= 0.0 {
            return 0.0;
        }
        ((time - self.window_start) / span).clamp(0.0, 1.0) as f32
    }
}

/// Parse one `[mm:ss]text` or `[mm:ss.xx]text` line.
pub fn parse_line(raw: &str) -> Result<LyricLine, VizError> {
    let malformed = || VizError::MalformedLyricLine(raw.to_string());
    let rest = raw.strip_prefix('[').ok_or_else(malformed)?;
    let (stamp, text) = rest.split_once(']').ok_or_else(malformed)?;
    let (minutes, seconds) = stamp.split_once(':').ok_or_else(malformed)?;

    if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let minutes: f64 = minutes.parse().map_err(|_| malformed())?;
    let seconds: f64 = seconds.trim_end_matches('.').parse().map_err(|_| malformed())?;
    Ok(LyricLine {
        start_time_seconds: minutes * 60.0 + seconds,
        text: text.trim_end_matches(['\r', '\n']).to_string(),
    })
}

/// Parse raw lyric lines, keeping source order. Lines that are not
/// timestamped (metadata tags, blank lines) are dropped.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Vec<LyricLine> {
    let mut parsed = Vec::with_capacity(lines.len());
    for line in lines {
        match parse_line(line.as_ref()) {
            Ok(l) => parsed.push(l),
            Err(err) => log::debug!("Skipping lyric line: {}", err),
        }
    }
    log::debug!("Parsed {} of {} lyric lines", parsed.len(), lines.len());
    parsed
}

/// Find the line whose `[start, next_start)` interval holds `time`. The last
/// line stays active from its start onwards.
pub fn resolve_active(lines: &[LyricLine], time: f64) -> ActiveLyricWindow {
    for (i, line) in lines.iter().enumerate() {
        let start = line.start_time_seconds;
        match lines.get(i + 1) {
            Some(next) => {
                if time >= start && time < next.start_time_seconds {
                    return ActiveLyricWindow {
                        text: line.text.clone(),
                        window_start: start,
                        window_end: next.start_time_seconds,
                    };
                }
            }
            None => {
                if time >= start {
                    return ActiveLyricWindow {
                        text: line.text.clone(),
                        window_start: start,
                        window_end: start,
                    };
                }
            }
        }
    }
    ActiveLyricWindow::empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<LyricLine> {
        parse(&["[00:05]Hello", "garbage", "[01:10]World"])
    }

    #[test]
    fn parses_timestamped_lines_and_drops_the_rest() {
        let lines = sample();
        assert_eq!(
            lines,
            vec![
                LyricLine { start_time_seconds: 5.0, text: "Hello".into() },
                LyricLine { start_time_seconds: 70.0, text: "World".into() },
            ]
        );
    }

    #[test]
    fn parses_fractional_seconds() {
        let line = parse_line("[01:02.50]Again\r").unwrap();
        assert!((line.start_time_seconds - 62.5).abs() < 1e-9);
        assert_eq!(line.text, "Again");
        assert_eq!(parse_line("[00:07]").unwrap().text, "");
    }

    #[test]
    fn rejects_tags_and_broken_stamps() {
        for bad in ["[ar:Someone]", "[00:xx]a", "[:05]a", "[00:05 a", "00:05]a", "", "[00:.5]a"] {
            assert!(
                matches!(parse_line(bad), Err(VizError::MalformedLyricLine(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn source_order_is_kept() {
        let lines = parse(&["[00:10]b", "[00:02]a"]);
        assert_eq!(lines[0].text, "b");
        assert_eq!(lines[1].text, "a");
    }

    #[test]
    fn resolves_the_active_window() {
        let lines = sample();
        assert_eq!(
            resolve_active(&lines, 30.0),
            ActiveLyricWindow { text: "Hello".into(), window_start: 5.0, window_end: 70.0 }
        );
        assert_eq!(
            resolve_active(&lines, 70.0),
            ActiveLyricWindow { text: "World".into(), window_start: 70.0, window_end: 70.0 }
        );
        assert_eq!(resolve_active(&lines, 1.0), ActiveLyricWindow::empty());
        assert_eq!(resolve_active(&[], 1.0), ActiveLyricWindow::empty());
    }

    #[test]
    fn percent_is_clamped_and_zero_for_the_final_line() {
        let lines = sample();
        let window = resolve_active(&lines, 37.5);
        assert!((window.percent(37.5) - 0.5).abs() < 1e-6);
        assert_eq!(window.percent(100.0), 1.0);
        assert_eq!(resolve_active(&lines, 70.0).percent(70.0), 0.0);
        assert_eq!(ActiveLyricWindow::empty().percent(3.0), 0.0);
    }
}
