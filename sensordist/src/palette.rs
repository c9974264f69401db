use plotters::style::RGBColor;

/// Solid bar color used when there is no value to encode.
pub const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);

/// A colormap given by evenly spaced anchor colors, linearly interpolated.
#[derive(Debug, Clone, Copy)]
pub struct Colormap(&'static [RGBColor]);

/// Diverging red-yellow-blue (ColorBrewer RdYlBu), reversed so that low values
/// are blue and high values are red.
pub const RD_YL_BU_R: Colormap = Colormap(&[
    RGBColor(0x31, 0x36, 0x95),
    RGBColor(0x45, 0x75, 0xb4),
    RGBColor(0x74, 0xad, 0xd1),
    RGBColor(0xab, 0xd9, 0xe9),
    RGBColor(0xe0, 0xf3, 0xf8),
    RGBColor(0xff, 0xff, 0xbf),
    RGBColor(0xfe, 0xe0, 0x90),
    RGBColor(0xfd, 0xae, 0x61),
    RGBColor(0xf4, 0x6d, 0x43),
    RGBColor(0xd7, 0x30, 0x27),
    RGBColor(0xa5, 0x00, 0x26),
]);

impl Colormap {
    /// Color at `t`, clamped to `[0, 1]`.
    pub fn color_at(&self, t: f64) -> RGBColor {
        let anchors = self.0;
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (anchors.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(anchors.len() - 1);
        let upper = (lower + 1).min(anchors.len() - 1);
        let frac = scaled - lower as f64;
        let RGBColor(r0, g0, b0) = anchors[lower];
        let RGBColor(r1, g1, b1) = anchors[upper];
        RGBColor(lerp(r0, r1, frac), lerp(g0, g1, frac), lerp(b0, b1, frac))
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}
