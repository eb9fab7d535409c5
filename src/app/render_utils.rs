use eframe::egui::Color32;

// Amount ramp for expense circles: green through amber to red.
const EXPENSE_RAMP: [Color32; 3] = [
    Color32::from_rgb(0x53, 0xcf, 0x8d),
    Color32::from_rgb(0xf7, 0xd2, 0x83),
    Color32::from_rgb(0xe8, 0x51, 0x51),
];

// Teal-to-pink variant used by the calendar strip cells.
const DAY_RAMP: [Color32; 3] = [
    Color32::from_rgb(0x53, 0xc3, 0xac),
    Color32::from_rgb(0xf7, 0xe8, 0x83),
    Color32::from_rgb(0xe8, 0x51, 0x78),
];

pub(super) fn expense_color(t: f32) -> Color32 {
    ramp(&EXPENSE_RAMP, t)
}

pub(super) fn day_color(t: f32) -> Color32 {
    ramp(&DAY_RAMP, t)
}

fn ramp(stops: &[Color32; 3], t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        lerp_color(stops[0], stops[1], t)
    } else {
        lerp_color(stops[1], stops[2], t - 1.0)
    }
}

fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let inverse = 1.0 - t;
    Color32::from_rgb(
        ((from.r() as f32 * inverse) + (to.r() as f32 * t)) as u8,
        ((from.g() as f32 * inverse) + (to.g() as f32 * t)) as u8,
        ((from.b() as f32 * inverse) + (to.b() as f32 * t)) as u8,
    )
}

pub(super) fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

/// Log-normalized position of `value` within `[min, max]`, 0.5 when the span
/// is degenerate. Day totals vary over orders of magnitude, so a linear scale
/// would wash most cells out.
pub fn log_fraction(value: f64, min: f64, max: f64) -> f32 {
    let min = min.max(0.01);
    let max = max.max(min);
    let value = value.clamp(min, max);

    let denominator = max.ln() - min.ln();
    if denominator.abs() < f64::EPSILON {
        return 0.5;
    }

    (((value.ln() - min.ln()) / denominator).clamp(0.0, 1.0)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_hits_its_stops() {
        assert_eq!(expense_color(0.0), EXPENSE_RAMP[0]);
        assert_eq!(expense_color(0.5), EXPENSE_RAMP[1]);
        assert_eq!(expense_color(1.0), EXPENSE_RAMP[2]);
        assert_eq!(day_color(1.0), DAY_RAMP[2]);
    }

    #[test]
    fn log_fraction_is_bounded_and_degenerate_safe() {
        assert_eq!(log_fraction(5.0, 5.0, 5.0), 0.5);
        assert_eq!(log_fraction(1.0, 1.0, 100.0), 0.0);
        assert_eq!(log_fraction(100.0, 1.0, 100.0), 1.0);
        let mid = log_fraction(10.0, 1.0, 100.0);
        assert!((mid - 0.5).abs() < 1e-6);
        // values outside the span clamp instead of extrapolating
        assert_eq!(log_fraction(0.0, 1.0, 100.0), 0.0);
    }
}
