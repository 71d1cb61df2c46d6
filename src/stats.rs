//! Descriptive statistics over present (non-missing) values.
//!
//! Every function returns `None` when the statistic is undefined for its
//! input, so callers have to say what "no data" means for them.

use std::collections::BTreeMap;

use crate::data::model::CellValue;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between the two closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Most frequent non-missing value. Ties go to the smallest value.
pub fn mode<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Option<CellValue> {
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    for v in values.into_iter().filter(|v| !v.is_missing()) {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(&CellValue, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

/// Pearson correlation over the rows where both values are present.
pub fn pearson(xs: &[CellValue], ys: &[CellValue]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_is_order_independent() {
        assert_eq!(median(&[25.0, 30.0, 28.0, 200.0]), Some(29.0));
        assert_eq!(median(&[200.0, 25.0, 28.0, 30.0]), Some(29.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [25.0, 30.0, 28.0, 200.0];
        assert_eq!(quantile(&v, 0.25), Some(27.25));
        assert_eq!(quantile(&v, 0.75), Some(72.5));
        assert_eq!(quantile(&v, 0.0), Some(25.0));
        assert_eq!(quantile(&v, 1.0), Some(200.0));
    }

    #[test]
    fn std_needs_two_values() {
        assert_eq!(std_dev(&[1.0]), None);
        let s = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn mode_prefers_smallest_on_ties() {
        let vals = vec![
            CellValue::from("b"),
            CellValue::from("a"),
            CellValue::Null,
            CellValue::Null,
            CellValue::Null,
        ];
        assert_eq!(mode(&vals), Some(CellValue::from("a")));
        assert_eq!(mode(&[CellValue::Null]), None);
    }

    #[test]
    fn pearson_skips_incomplete_pairs() {
        let xs = vec![1i64.into(), 2i64.into(), 3i64.into(), CellValue::Null];
        let ys = vec![2i64.into(), 4i64.into(), 6i64.into(), 100i64.into()];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }
}
