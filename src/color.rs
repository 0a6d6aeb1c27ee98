use palette::{LinSrgb, Srgb};

/// 8-bit sRGB colour used throughout figure descriptions.
pub type Rgb = Srgb<u8>;

// ---------------------------------------------------------------------------
// Qualitative palette
// ---------------------------------------------------------------------------

/// The ten-colour "tab10" qualitative palette, also the default colour cycle.
const TAB10: [(u8, u8, u8); 10] = [
    (0x1f, 0x77, 0xb4),
    (0xff, 0x7f, 0x0e),
    (0x2c, 0xa0, 0x2c),
    (0xd6, 0x27, 0x28),
    (0x94, 0x67, 0xbd),
    (0x8c, 0x56, 0x4b),
    (0xe3, 0x77, 0xc2),
    (0x7f, 0x7f, 0x7f),
    (0xbc, 0xbd, 0x22),
    (0x17, 0xbe, 0xcf),
];

/// `i`-th colour of the default cycle (wraps after ten).
pub fn cycle_color(i: usize) -> Rgb {
    let (r, g, b) = TAB10[i % TAB10.len()];
    Srgb::new(r, g, b)
}

/// `n` colours sampled evenly across the palette: positions `t` spread over
/// `[0, 1]` map to slot `floor(t * 10)`, clamped to the last slot. Distinct
/// for up to ten series.
pub fn sample_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    let slots = TAB10.len();
    (0..n)
        .map(|i| {
            let t = if n == 1 {
                0.0
            } else {
                i as f64 / (n - 1) as f64
            };
            let slot = ((t * slots as f64) as usize).min(slots - 1);
            cycle_color(slot)
        })
        .collect()
}

/// Black or white, whichever reads better on `background`.
pub fn text_color_on(background: Rgb) -> Rgb {
    let linear: LinSrgb = background.into_format::<f32>().into_linear();
    let luminance = 0.2126 * linear.red + 0.7152 * linear.green + 0.0722 * linear.blue;
    if luminance > 0.35 {
        Srgb::new(0, 0, 0)
    } else {
        Srgb::new(255, 255, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_series_take_both_palette_ends() {
        assert_eq!(sample_palette(2), vec![cycle_color(0), cycle_color(9)]);
    }

    #[test]
    fn samples_are_distinct_up_to_ten() {
        for n in 1..=10 {
            let colors = sample_palette(n);
            assert_eq!(colors.len(), n);
            for (i, a) in colors.iter().enumerate() {
                for b in &colors[i + 1..] {
                    assert_ne!(a, b, "duplicate colour for n = {n}");
                }
            }
        }
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(cycle_color(10), cycle_color(0));
        assert!(sample_palette(0).is_empty());
    }

    #[test]
    fn contrast_text() {
        assert_eq!(text_color_on(Srgb::new(255, 255, 255)), Srgb::new(0, 0, 0));
        assert_eq!(text_color_on(cycle_color(0)), Srgb::new(255, 255, 255));
    }
}
