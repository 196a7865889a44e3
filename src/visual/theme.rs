use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::VizError;
use crate::render::canvas::Rgba;

/// Height, in pixels, at which the tunables below hold literally.
pub const REFERENCE_HEIGHT: f32 = 2160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThemeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn with_alpha(self, a: u8) -> Rgba {
        Rgba::new(self.r, self.g, self.b, a)
    }
}

impl Default for ThemeColor {
    fn default() -> Self {
        Self::new(236, 148, 70)
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for ThemeColor {
    type Err = VizError;

    /// Accepts `#rrggbb`, `rrggbb` or `r,g,b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VizError::InvalidColor(s.to_string());
        let trimmed = s.trim();

        if trimmed.contains(',') {
            let parts: Vec<u8> = trimmed
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| invalid())?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Self::new(*r, *g, *b)),
                _ => Err(invalid()),
            };
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for ThemeColor {
    type Error = VizError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-algorithm drawing parameters, at [`REFERENCE_HEIGHT`] scale.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub radius: f32,
    pub cover_inset: f32,
    pub bar_width: f32,
    pub bar_corner: f32,
    pub arc_gain: f32,
    pub line_gain: f32,
    pub line_width: f32,
    pub dotted_gain: f32,
    pub dotted_stride: usize,
    pub dot_radius: f32,
    /// Also draw the dotted ghost loop underneath the arc bars
    pub dotted_ghost: bool,
    pub min_height: f32,
    pub meter_width: f32,
    pub meter_gap: f32,
    pub meter_gain: f32,
    pub meter_floor: f32,
    pub cap_height: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub rotation_step: f32,
    pub peak_decay: f32,
    pub backdrop_blur: f32,
    pub lyric_font_size: f32,
    pub lyric_baseline: f32,
    /// When set, rotation and peak decay are scaled by elapsed time so that
    /// one step corresponds to one frame at this refresh rate.
    pub reference_hz: Option<f32>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            radius: 450.0,
            cover_inset: 30.0,
            bar_width: 5.0,
            bar_corner: 20.0,
            arc_gain: 0.5,
            line_gain: 0.8,
            line_width: 4.0,
            dotted_gain: 0.3,
            dotted_stride: 5,
            dot_radius: 4.0,
            dotted_ghost: false,
            min_height: 5.0,
            meter_width: 24.0,
            meter_gap: 4.0,
            meter_gain: 3.0,
            meter_floor: 10.0,
            cap_height: 5.0,
            margin_x: 200.0,
            margin_y: 400.0,
            rotation_step: 0.01,
            peak_decay: 1.0,
            backdrop_blur: 80.0,
            lyric_font_size: 80.0,
            lyric_baseline: 150.0,
            reference_hz: None,
        }
    }
}

impl Tunables {
    /// Reject values the renderer cannot lay out.
    pub fn validate(&self) -> Result<(), VizError> {
        let invalid = |msg: String| Err(VizError::InvalidTunable(msg));
        let lengths = [
            ("radius", self.radius),
            ("cover_inset", self.cover_inset),
            ("bar_width", self.bar_width),
            ("bar_corner", self.bar_corner),
            ("arc_gain", self.arc_gain),
            ("line_gain", self.line_gain),
            ("line_width", self.line_width),
            ("dotted_gain", self.dotted_gain),
            ("dot_radius", self.dot_radius),
            ("min_height", self.min_height),
            ("meter_width", self.meter_width),
            ("meter_gap", self.meter_gap),
            ("meter_gain", self.meter_gain),
            ("meter_floor", self.meter_floor),
            ("cap_height", self.cap_height),
            ("margin_x", self.margin_x),
            ("margin_y", self.margin_y),
            ("peak_decay", self.peak_decay),
            ("backdrop_blur", self.backdrop_blur),
            ("lyric_font_size", self.lyric_font_size),
            ("lyric_baseline", self.lyric_baseline),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        for (name, value) in [
            ("radius", self.radius),
            ("lyric_font_size", self.lyric_font_size),
            ("meter_width + meter_gap", self.meter_width + self.meter_gap),
        ] {
            if value <= 0.0 {
                return invalid(format!("{name} must be positive"));
            }
        }
        if self.dotted_stride == 0 {
            return invalid("dotted_stride must be at least 1".into());
        }
        if let Some(hz) = self.reference_hz {
            if !hz.is_finite() || hz <= 0.0 {
                return invalid(format!("reference_hz must be positive, got {hz}"));
            }
        }
        Ok(())
    }
}

/// Color and tunables shared by the renderer and the lyric overlay.
///
/// The color is replaced as a whole `Copy` value, so a reader never sees a
/// partially applied change.
#[derive(Debug, Clone, Default)]
pub struct ThemeState {
    color: ThemeColor,
    tunables: Tunables,
}

impl ThemeState {
    pub fn new(color: ThemeColor, tunables: Tunables) -> Self {
        Self { color, tunables }
    }

    pub fn color(&self) -> ThemeColor {
        self.color
    }

    pub fn set_color(&mut self, color: ThemeColor) {
        if color != self.color {
            log::debug!("Theme color {} -> {}", self.color, color);
        }
        self.color = color;
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn set_tunables(&mut self, tunables: Tunables) {
        self.tunables = tunables;
    }

    /// Geometry scale for a canvas of this size.
    pub fn scale_for(width: usize, height: usize) -> f32 {
        (width.min(height) as f32 / REFERENCE_HEIGHT).max(1e-3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_color_forms() {
        let expected = ThemeColor::new(236, 148, 70);
        assert_eq!("#ec9446".parse::<ThemeColor>().unwrap(), expected);
        assert_eq!("EC9446".parse::<ThemeColor>().unwrap(), expected);
        assert_eq!("236, 148, 70".parse::<ThemeColor>().unwrap(), expected);
        assert_eq!(expected.to_string(), "#ec9446");
        assert_eq!(ThemeColor::default(), expected);
    }

    #[test]
    fn rejects_bad_colors() {
        for bad in ["#ec94", "#gg0000", "1,2", "1,2,300", "", "#ec9446ff", "#+f+f+f", "+f+f+f"] {
            assert!(bad.parse::<ThemeColor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn color_change_is_visible_immediately() {
        let mut theme = ThemeState::default();
        theme.set_color(ThemeColor::new(1, 2, 3));
        assert_eq!(theme.color(), ThemeColor::new(1, 2, 3));
    }

    #[test]
    fn scale_follows_the_shorter_side() {
        assert_eq!(ThemeState::scale_for(3840, 2160), 1.0);
        assert_eq!(ThemeState::scale_for(1920, 1080), 0.5);
    }

    #[test]
    fn default_tunables_are_valid() {
        assert_eq!(Tunables::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_unusable_tunables() {
        let cases = [
            Tunables { meter_width: 0.0, meter_gap: 0.0, ..Tunables::default() },
            Tunables { radius: 0.0, ..Tunables::default() },
            Tunables { lyric_font_size: -4.0, ..Tunables::default() },
            Tunables { line_width: f32::NAN, ..Tunables::default() },
            Tunables { dotted_stride: 0, ..Tunables::default() },
            Tunables { reference_hz: Some(0.0), ..Tunables::default() },
        ];
        for tunables in cases {
            assert!(
                matches!(tunables.validate(), Err(VizError::InvalidTunable(_))),
                "{tunables:?} should be rejected"
            );
        }
    }
}
