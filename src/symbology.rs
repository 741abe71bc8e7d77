//! Proportional symbol sizes for the case layer.

/// Bounds of the confirmed-circle fill opacity.
pub const MIN_OPACITY: f64 = 0.05;
pub const MAX_OPACITY: f64 = 0.4;

/// Base confirmed-circle radius in pixels, before zoom scaling.
#[inline(always)]
pub fn confirmed_radius(confirmed: u64, compact: bool) -> f64 {
    3.0 * (confirmed as f64 + 1.0).log10() * if compact { 0.5 } else { 1.0 }
}

/// Growth of symbols as the view zooms in. `zoom` is relative to the world
/// view; zooming out never shrinks symbols below their base size.
#[inline(always)]
pub fn radius_factor(zoom: f64) -> f64 {
    zoom.max(1.0).log10() * 0.5 + 1.0
}

/// Three nested circles for one location plus the fill opacity of the
/// outer one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Symbol {
    pub confirmed_radius: f64,
    pub recovered_radius: f64,
    pub deaths_radius: f64,
    pub opacity: f64,
}

impl Symbol {
    /// `None` when there are no confirmed cases to scale by.
    pub fn for_counts(confirmed: u64, recovered: u64, deaths: u64, zoom: f64, compact: bool) -> Option<Self> {
        if confirmed == 0 {
            return None;
        }
        let factor = radius_factor(zoom);
        let c = confirmed as f64;
        let r = recovered as f64;
        let d = deaths as f64;

        let confirmed_radius = confirmed_radius(confirmed, compact) * factor;
        // The inner circles scale the already-scaled outer radius by the
        // factor once more.
        let recovered_radius = ((r + d) / c).sqrt() * confirmed_radius * factor;
        let deaths_radius = (d / c).sqrt() * confirmed_radius * factor;
        let opacity = MIN_OPACITY + (MAX_OPACITY - MIN_OPACITY) * (c - r - d) / c;

        Some(Self {
            confirmed_radius,
            recovered_radius,
            deaths_radius,
            opacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_radius_is_logarithmic() {
        assert_eq!(confirmed_radius(0, false), 0.0);
        assert!((confirmed_radius(9, false) - 3.0).abs() < 1e-12);
        assert!((confirmed_radius(99, false) - 6.0).abs() < 1e-12);
        assert!((confirmed_radius(99, true) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_factor_is_one_at_world_view() {
        assert_eq!(radius_factor(1.0), 1.0);
        assert_eq!(radius_factor(0.5), 1.0);
        assert!((radius_factor(100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_symbol_without_confirmed_cases() {
        assert_eq!(Symbol::for_counts(0, 3, 1, 1.0, false), None);
    }

    #[test]
    fn test_all_active_is_most_opaque() {
        let symbol = Symbol::for_counts(99, 0, 0, 1.0, false).unwrap();
        assert!((symbol.opacity - MAX_OPACITY).abs() < 1e-12);
        assert_eq!(symbol.recovered_radius, 0.0);
        assert_eq!(symbol.deaths_radius, 0.0);
    }

    #[test]
    fn test_all_closed_is_least_opaque_and_nested() {
        let symbol = Symbol::for_counts(99, 75, 24, 1.0, false).unwrap();
        assert!((symbol.opacity - MIN_OPACITY).abs() < 1e-12);
        assert!((symbol.recovered_radius - symbol.confirmed_radius).abs() < 1e-9);
        assert!(symbol.deaths_radius < symbol.recovered_radius);
    }
}
