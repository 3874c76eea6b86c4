//! Color schemes and multi-stop interpolation.

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Blue -> White -> Red (surface temperature)
    Thermal,
    /// Brown -> Yellow -> Green (vegetation index)
    Vegetation,
}

impl ColorScheme {
    pub const ALL: &'static [ColorScheme] = &[Self::Thermal, Self::Vegetation];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Thermal => "Thermal",
            Self::Vegetation => "Vegetation",
        }
    }

    pub fn stops(&self) -> &'static [ColorStop] {
        match self {
            Self::Thermal => THERMAL_STOPS,
            Self::Vegetation => VEGETATION_STOPS,
        }
    }

    /// Color of the lowest value.
    pub fn low(&self) -> Rgb {
        self.stops()[0].color
    }

    /// Color of the highest value.
    pub fn high(&self) -> Rgb {
        self.stops()[self.stops().len() - 1].color
    }
}

// ─── Color stop definitions ────────────────────────────────────────────

const THERMAL_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

const VEGETATION_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t.is_nan() || t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    stops
        .windows(2)
        .find(|w| t <= w[1].t)
        .map(|w| lerp_color(w[0].color, w[1].color, (t - w[0].t) / (w[1].t - w[0].t)))
        .unwrap_or(stops[stops.len() - 1].color)
}

/// Evaluate a color scheme at normalized position `t` ∈ [0, 1]; values
/// outside are clamped to the end colors.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    multi_stop(scheme.stops(), t)
}
