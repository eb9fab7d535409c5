use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn format_amount(amount: f64) -> String {
    if amount >= 1000.0 {
        format!("${:.1}k", amount / 1000.0)
    } else if amount == amount.trunc() {
        format!("${amount:.0}")
    } else {
        format!("${amount:.2}")
    }
}

/// Deterministic pair in [-1, 1] derived from an identity key, used to seed
/// node positions so a given key always starts from the same spot.
pub fn stable_pair(key: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_amount_picks_precision() {
        assert_eq!(format_amount(8.0), "$8");
        assert_eq!(format_amount(12.5), "$12.50");
        assert_eq!(format_amount(2400.0), "$2.4k");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x1, y1) = stable_pair("expense-17");
        let (x2, y2) = stable_pair("expense-17");
        assert_eq!((x1, y1), (x2, y2));
        assert!((-1.0..=1.0).contains(&x1));
        assert!((-1.0..=1.0).contains(&y1));

        let other = stable_pair("expense-18");
        assert_ne!((x1, y1), other);
    }
}
