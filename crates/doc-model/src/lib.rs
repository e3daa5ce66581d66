use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Markdown,
    Pdf,
}

impl DocumentKind {
    /// Detects the kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Only paged documents carry annotation tooling.
    pub fn supports_annotations(self) -> bool {
        matches!(self, Self::Pdf)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    #[default]
    None,
    Highlight,
    Pen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeId {
    #[default]
    Dark,
    Light,
}

impl ThemeId {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    #[default]
    SansSerif,
    Serif,
}

impl FontFamily {
    pub fn toggled(self) -> Self {
        match self {
            Self::SansSerif => Self::Serif,
            Self::Serif => Self::SansSerif,
        }
    }
}

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const HIGHLIGHT_YELLOW: Color = Color::new(255, 255, 0, 102);
    pub const PEN_CYAN: Color = Color::rgb(0, 255, 255);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0, step: 0.1 }
    }
}

impl ZoomBounds {
    /// Bounds that are safe to clamp with: non-positive or non-finite values
    /// fall back to the defaults and an inverted range is swapped.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let usable = |value: f32| value.is_finite() && value > 0.0;
        let mut min = if usable(self.min) { self.min } else { defaults.min };
        let mut max = if usable(self.max) { self.max } else { defaults.max };
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        let step = if usable(self.step) { self.step } else { defaults.step };
        Self { min, max, step }
    }

    pub fn clamp(&self, factor: f32) -> f32 {
        let bounds = self.normalized();
        if !factor.is_finite() {
            return 1.0_f32.clamp(bounds.min, bounds.max);
        }
        factor.clamp(bounds.min, bounds.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomAction {
    In,
    Out,
    Reset,
    Set(f32),
}

/// Top-of-viewport position, zoom-independent: the page under the top edge and
/// the fraction of that page's height scrolled past.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub page_index: u32,
    pub fraction: f32,
}

impl ScrollPosition {
    pub fn top_of(page_index: u32) -> Self {
        Self { page_index, fraction: 0.0 }
    }
}

/// Per-tab view state. Overrides fall back to the process-wide preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom: f32,
    pub scroll: ScrollPosition,
    pub tool: ToolMode,
    pub theme_override: Option<ThemeId>,
    pub font_override: Option<FontFamily>,
    pub search_query: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            scroll: ScrollPosition::default(),
            tool: ToolMode::None,
            theme_override: None,
            font_override: None,
            search_query: None,
        }
    }
}

impl ViewState {
    pub fn effective_theme(&self, default: ThemeId) -> ThemeId {
        self.theme_override.unwrap_or(default)
    }

    pub fn effective_font(&self, default: FontFamily) -> FontFamily {
        self.font_override.unwrap_or(default)
    }
}

pub fn apply_zoom_action(state: &mut ViewState, action: ZoomAction, bounds: &ZoomBounds) {
    let bounds = bounds.normalized();
    let next = match action {
        ZoomAction::In => state.zoom + bounds.step,
        ZoomAction::Out => state.zoom - bounds.step,
        ZoomAction::Reset => 1.0,
        ZoomAction::Set(factor) => factor,
    };
    // Steps accumulate float error; keep the factor on a 1/100 grid.
    state.zoom = (bounds.clamp(next) * 100.0).round() / 100.0;
}

pub const MIN_BRIGHTNESS: u8 = 20;
pub const MAX_BRIGHTNESS: u8 = 100;

pub fn clamp_brightness(value: u8) -> u8 {
    value.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Opacity of the black dimming layer for a brightness value; at most 90% dark.
pub fn dim_opacity(brightness: u8) -> f32 {
    let brightness = clamp_brightness(brightness);
    f32::from(MAX_BRIGHTNESS - brightness) / 100.0 * 0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: ThemeId,
    pub font: FontFamily,
    pub brightness: u8,
    pub zoom: ZoomBounds,
    pub highlight_color: Color,
    pub pen_color: Color,
    pub pen_width: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeId::Dark,
            font: FontFamily::SansSerif,
            brightness: MAX_BRIGHTNESS,
            zoom: ZoomBounds::default(),
            highlight_color: Color::HIGHLIGHT_YELLOW,
            pen_color: Color::PEN_CYAN,
            pen_width: 2.0,
        }
    }
}

impl Preferences {
    /// Brings hand-edited values back into range.
    pub fn normalized(mut self) -> Self {
        self.brightness = clamp_brightness(self.brightness);
        self.zoom = self.zoom.normalized();
        if !self.pen_width.is_finite() || self.pen_width <= 0.0 {
            self.pen_width = Self::default().pen_width;
        }
        self
    }
}
