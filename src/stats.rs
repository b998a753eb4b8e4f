// Summary statistics used when drawing distribution series.
//
// Plans carry raw column values; the renderer reduces them here.

use crate::data::Scalar;

/// Points sampled along a density curve
const KDE_GRID_POINTS: usize = 128;

/// Numeric entries of a column, kept sorted ascending.
/// Text, booleans, nulls and NaN never enter a sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample(Vec<f64>);

impl Sample {
    pub fn from_scalars(values: &[Scalar]) -> Self {
        Self::from_values(values.iter().filter_map(Scalar::as_f64))
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut nums: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        nums.sort_by(f64::total_cmp);
        Self(nums)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.0.iter().sum::<f64>() / self.len() as f64)
    }

    /// Value a fraction `q` of the way from the smallest to the largest entry,
    /// interpolating between neighbours
    pub fn quantile(&self, q: f64) -> Option<f64> {
        let last = self.len().checked_sub(1)?;
        let pos = q.clamp(0.0, 1.0) * last as f64;
        let below = pos.floor() as usize;
        let lo = self.0[below];
        Some(match self.0.get(below + 1) {
            Some(hi) if pos.fract() > 0.0 => lo + (hi - lo) * pos.fract(),
            _ => lo,
        })
    }

    /// Bessel-corrected standard deviation; needs two entries
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean().filter(|_| self.len() > 1)?;
        let squares: f64 = self.0.iter().map(|x| (x - mean) * (x - mean)).sum();
        Some((squares / (self.len() - 1) as f64).sqrt())
    }

    fn quartiles(&self) -> Option<(f64, f64, f64)> {
        Some((self.quantile(0.25)?, self.quantile(0.5)?, self.quantile(0.75)?))
    }

    /// Kernel width from Silverman's rule, falling back to 1 when the spread is zero or unknown
    pub fn bandwidth(&self) -> f64 {
        let (Some(sd), Some((q1, _, q3))) = (self.std_dev(), self.quartiles()) else {
            return 1.0;
        };
        let iqr = q3 - q1;
        let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
        if spread > 0.0 {
            0.9 * spread * (self.len() as f64).powf(-0.2)
        } else {
            1.0
        }
    }

    /// `None` for an empty sample
    pub fn summary(&self) -> Option<BoxSummary> {
        let mean = self.mean()?;
        let (q1, median, q3) = self.quartiles()?;
        let reach = 1.5 * (q3 - q1);
        let fences = (q1 - reach)..=(q3 + reach);

        // Whiskers stop at the most extreme entries inside the fences
        let lower_whisker = self.0.iter().copied().find(|v| fences.contains(v)).unwrap_or(q1);
        let upper_whisker = self.0.iter().rev().copied().find(|v| fences.contains(v)).unwrap_or(q3);
        let outliers = self.0.iter().copied().filter(|v| !fences.contains(v)).collect();

        Some(BoxSummary {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            mean,
            outliers,
        })
    }

    /// Density curve using the sample's own bandwidth
    pub fn density(&self) -> Density {
        kde(&self.0, self.bandwidth())
    }
}

/// Five-number summary with Tukey fences at 1.5 IQR
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub mean: f64,
    pub outliers: Vec<f64>,
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Density curve sampled on an evenly spaced grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Density {
    pub grid: Vec<f64>,
    /// Scaled so the peak is 1
    pub density: Vec<f64>,
}

/// Gaussian kernel density estimate over `sorted`, extended 3 bandwidths past either end
fn kde(sorted: &[f64], bandwidth: f64) -> Density {
    let n = sorted.len() as f64;
    if sorted.is_empty() {
        return Density::default();
    }

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let start = min - 3.0 * bandwidth;
    let end = max + 3.0 * bandwidth;

    let range = end - start;
    if range <= 0.0 {
        return Density { grid: vec![min], density: vec![1.0] };
    }

    let step = range / (KDE_GRID_POINTS - 1) as f64;
    let grid: Vec<f64> = (0..KDE_GRID_POINTS).map(|i| start + i as f64 * step).collect();
    let mut density: Vec<f64> = grid
        .iter()
        .map(|y| {
            let sum: f64 = sorted.iter().map(|xi| gaussian_kernel((y - xi) / bandwidth)).sum();
            sum / (n * bandwidth)
        })
        .collect();

    let peak = density.iter().fold(0.0f64, |a, &b| a.max(b));
    if peak > 0.0 {
        for d in &mut density {
            *d /= peak;
        }
    }

    Density { grid, density }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_skips_text_and_nan() {
        let values = vec![
            Scalar::from(3.0),
            Scalar::from("x"),
            Scalar::Null,
            Scalar::from(f64::NAN),
            Scalar::from(1.0),
        ];
        assert_eq!(Sample::from_scalars(&values).values(), &[1.0, 3.0]);
    }

    #[test]
    fn test_quantile() {
        let sample = Sample::from_values([4.0, 1.0, 3.0, 2.0]);
        assert_eq!(sample.quantile(0.0), Some(1.0));
        assert_eq!(sample.quantile(0.5), Some(2.5));
        assert_eq!(sample.quantile(1.0), Some(4.0));
        assert_eq!(sample.quantile(2.0), Some(4.0));
        assert_eq!(Sample::default().quantile(0.5), None);
        assert_eq!(Sample::from_values([7.0]).quantile(0.9), Some(7.0));
    }

    #[test]
    fn test_std_dev() {
        let sample = Sample::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(sample.mean(), Some(5.0));
        assert!((sample.std_dev().unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(Sample::from_values([1.0]).std_dev(), None);
    }

    #[test]
    fn test_box_summary_outliers() {
        let summary = Sample::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).summary().unwrap();
        assert_eq!(summary.q1, 2.25);
        assert_eq!(summary.median, 3.5);
        assert_eq!(summary.q3, 4.75);
        assert_eq!(summary.outliers, vec![100.0]);
        assert_eq!(summary.lower_whisker, 1.0);
        assert_eq!(summary.upper_whisker, 5.0);
    }

    #[test]
    fn test_box_summary_empty() {
        assert!(Sample::default().summary().is_none());
    }

    #[test]
    fn test_bandwidth() {
        assert_eq!(Sample::from_values([5.0]).bandwidth(), 1.0);
        assert_eq!(Sample::from_values([2.0, 2.0, 2.0]).bandwidth(), 1.0);

        // IQR 1.5 / 1.34 is narrower than the standard deviation here
        let sample = Sample::from_values([1.0, 2.0, 3.0, 4.0]);
        let expected = 0.9 * (1.5 / 1.34) * 4f64.powf(-0.2);
        assert!((sample.bandwidth() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_density_normalized() {
        let density = Sample::from_values([1.0, 2.0, 2.5, 3.0, 10.0]).density();
        assert_eq!(density.grid.len(), KDE_GRID_POINTS);
        let peak = density.density.iter().cloned().fold(0.0, f64::max);
        assert!((peak - 1.0).abs() < 1e-9);
        assert!(Sample::default().density().grid.is_empty());
    }
}
