use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// `n` visually distinct colours from evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.70, 0.50);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Transition name → colour, so a line keeps its colour across redshifts.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(names: Vec<String>) -> Self {
        let palette = generate_palette(names.len());
        ColorMap {
            mapping: names.into_iter().zip(palette).collect(),
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, name: &str) -> Color32 {
        self.mapping
            .get(name)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Fill colour for shading a measurement window.
    pub fn shade_for(&self, name: &str) -> Color32 {
        let c = self.color_for(name);
        Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), 40)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for i in 0..p.len() {
            for j in (i + 1)..p.len() {
                assert_ne!(p[i], p[j]);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_unknown_name_is_gray() {
        let map = ColorMap::new(vec!["CIV 1548".into(), "CIV 1550".into()]);
        assert_ne!(map.color_for("CIV 1548"), map.color_for("CIV 1550"));
        assert_eq!(map.color_for("FeII 2382"), Color32::GRAY);
    }
}
