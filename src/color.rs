use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// Assigns each label of a chart's series column a stable colour, with hues
/// evenly spaced around the wheel in label order. Labels not seen at build
/// time fall back to gray.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    colors: BTreeMap<String, Color32>,
}

impl ColorMap {
    pub fn new<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let labels: Vec<String> = labels.into_iter().collect();
        let n = labels.len().max(1);
        let colors = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label, spaced_hue(i, n)))
            .collect();
        ColorMap { colors }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.colors.get(label).copied().unwrap_or(Color32::GRAY)
    }
}

fn spaced_hue(i: usize, n: usize) -> Color32 {
    let hsl = Hsl::new((i as f32 / n as f32) * 360.0, 0.75, 0.55);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_get_distinct_colors_and_unknowns_fall_back() {
        let map = ColorMap::new(["UK", "France", "Japan"].map(String::from));
        let distinct: std::collections::BTreeSet<[u8; 4]> = ["UK", "France", "Japan"]
            .iter()
            .map(|l| map.color_for(l).to_array())
            .collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(map.color_for("Mars"), Color32::GRAY);
    }
}
