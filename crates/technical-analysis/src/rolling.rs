use statrs::statistics::Statistics;

/// Shift a series forward by n rows. The first n positions become NaN.
pub fn shift(data: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    for i in n..data.len() {
        out[i] = data[i - n];
    }
    out
}

/// First difference; NaN at row 0.
pub fn diff(data: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

/// Fractional change over `periods` rows; NaN where history or the
/// denominator is missing.
pub fn pct_change(data: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    for i in periods..data.len() {
        let base = data[i - periods];
        if base != 0.0 {
            out[i] = data[i] / base - 1.0;
        }
    }
    out
}

/// Rolling arithmetic mean over a full window; NaN until the window fills.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..data.len() {
        out[i] = data[i + 1 - window..=i].mean();
    }
    out
}

/// Rolling sample standard deviation (n-1 denominator).
pub fn rolling_std(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..data.len() {
        out[i] = data[i + 1 - window..=i].std_dev();
    }
    out
}

/// Rolling median; even windows average the two middle values.
pub fn rolling_median(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 {
        return out;
    }
    let mut buf = Vec::with_capacity(window);
    for i in (window - 1)..data.len() {
        let slice = &data[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        buf.clear();
        buf.extend_from_slice(slice);
        buf.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = window / 2;
        out[i] = if window % 2 == 1 {
            buf[mid]
        } else {
            (buf[mid - 1] + buf[mid]) / 2.0
        };
    }
    out
}

/// Rolling maximum over a full window. f64::max would silently skip NaN, so
/// incomplete windows are rejected up front like every other kernel here.
pub fn rolling_max(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..data.len() {
        let slice = &data[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        out[i] = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }
    out
}

/// Rolling minimum over a full window; NaN-bearing windows stay NaN.
pub fn rolling_min(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..data.len() {
        let slice = &data[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        out[i] = slice.iter().copied().fold(f64::INFINITY, f64::min);
    }
    out
}

/// Recursive exponential smoothing with a fixed alpha, seeded at the first
/// finite value. Positions before the seed are NaN.
pub fn ewm(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    let mut state: Option<f64> = None;
    for (i, &x) in data.iter().enumerate() {
        if !x.is_finite() {
            // Leading NaN rows stay NaN; once seeded the state carries over.
            if let Some(s) = state {
                out[i] = s;
            }
            continue;
        }
        let next = match state {
            None => x,
            Some(s) => s + alpha * (x - s),
        };
        state = Some(next);
        out[i] = next;
    }
    out
}

/// Wilder smoothing: exponential with alpha = 1/period.
pub fn wilder(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; data.len()];
    }
    ewm(data, 1.0 / period as f64)
}

/// Rolling percentile rank: share of the preceding window values strictly
/// less than the current value, in [0, 100]. The window spans `window` rows
/// including the current one; at least `min_periods` observations are
/// required, otherwise NaN.
pub fn rolling_percentile_rank(data: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window < 2 {
        return out;
    }
    for i in 0..data.len() {
        let current = data[i];
        if !current.is_finite() {
            continue;
        }
        let start = (i + 1).saturating_sub(window);
        let mut prior = 0usize;
        let mut below = 0usize;
        for &v in &data[start..i] {
            if v.is_finite() {
                prior += 1;
                if v < current {
                    below += 1;
                }
            }
        }
        if prior + 1 < min_periods || prior == 0 {
            continue;
        }
        out[i] = below as f64 / prior as f64 * 100.0;
    }
    out
}
