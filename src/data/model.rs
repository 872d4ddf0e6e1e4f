use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Spectrum – one row of a spectral table
// ---------------------------------------------------------------------------

/// A single 1-D spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Spectral axis.
    pub wavelength: Vec<f64>,
    /// Flux – same length as `wavelength`.
    pub flux: Vec<f64>,
    /// Remaining table columns, rendered as text.
    pub meta: BTreeMap<String, String>,
}

impl Spectrum {
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>) -> Self {
        Self {
            wavelength,
            flux,
            meta: BTreeMap::new(),
        }
    }

    /// Finite flux values, sorted ascending.
    fn sorted_finite_flux(&self) -> Vec<f64> {
        let mut v: Vec<f64> = self.flux.iter().copied().filter(|f| f.is_finite()).collect();
        v.sort_by(f64::total_cmp);
        v
    }

    /// Suggested y-range for spectra dominated by a few outliers.
    ///
    /// When `|max / median| >= 100` the range is clipped to the 1st and
    /// 99th percentiles scaled by 1.5, otherwise `None`. A zero median
    /// counts as an infinite ratio.
    pub fn smart_y_range(&self) -> Option<(f64, f64)> {
        const THRESHOLD: f64 = 100.0;
        const SCALE: f64 = 1.5;

        let sorted = self.sorted_finite_flux();
        let max = *sorted.last()?;
        let median = percentile(&sorted, 50.0)?;
        if median != 0.0 && (max / median).abs() < THRESHOLD {
            return None;
        }
        let lo = percentile(&sorted, 1.0)? * SCALE;
        let hi = percentile(&sorted, 99.0)? * SCALE;
        // All-zero flux gives an empty range.
        (lo < hi).then_some((lo, hi))
    }
}

/// Linear-interpolated percentile of sorted data.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
