use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Golden-angle hue step; consecutive traces stay far apart on the wheel.
const HUE_STEP: f32 = 137.508;

/// Colour of the `i`-th trace. Stable as more traces are added.
pub fn trace_color(i: usize) -> Color32 {
    let hue = (i as f32 * HUE_STEP) % 360.0;
    let hsl = Hsl::new(hue, 0.75, 0.55);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Trace colours: data item label → Color32
// ---------------------------------------------------------------------------

/// Assigns each data item a colour the first time it is seen.
#[derive(Debug, Clone, Default)]
pub struct TraceColors {
    mapping: BTreeMap<String, Color32>,
}

impl TraceColors {
    pub fn color_for(&mut self, label: &str) -> Color32 {
        let next = self.mapping.len();
        *self
            .mapping
            .entry(label.to_string())
            .or_insert_with(|| trace_color(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_are_stable_per_label() {
        let mut colors = TraceColors::default();
        let a = colors.color_for("mwmStar-1");
        let b = colors.color_for("apStar-1");
        assert_ne!(a, b);
        assert_eq!(colors.color_for("mwmStar-1"), a);
    }
}
