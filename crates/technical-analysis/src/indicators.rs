use crate::rolling::*;

/// Simple Moving Average, NaN until the window fills.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(data, period)
}

/// Mean-minus-median oscillator standing in for the 125-period average.
/// Deliberately NOT a plain SMA: the trend model reads the sign of
/// `close - sma_125`, and that sign semantics depends on this definition.
pub fn sma_oscillator(data: &[f64], mean_period: usize, median_period: usize) -> Vec<f64> {
    let mean = rolling_mean(data, mean_period);
    let median = rolling_median(data, median_period);
    mean.iter()
        .zip(median.iter())
        .map(|(m, md)| m - md)
        .collect()
}

/// Relative Strength Index under Wilder smoothing (alpha = 1/period),
/// seeded from the start of the series.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    if period == 0 || n == 0 {
        return vec![f64::NAN; n];
    }

    let deltas = diff(data);
    // f64::max would silently turn the leading NaN delta into 0 and shift the
    // smoothing seed one row early; keep it NaN instead.
    let gains: Vec<f64> = deltas
        .iter()
        .map(|d| if d.is_finite() { d.max(0.0) } else { f64::NAN })
        .collect();
    let losses: Vec<f64> = deltas
        .iter()
        .map(|d| if d.is_finite() { (-d).max(0.0) } else { f64::NAN })
        .collect();

    let avg_gain = wilder(&gains, period);
    let avg_loss = wilder(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| {
            if !g.is_finite() || !l.is_finite() || (g == 0.0 && l == 0.0) {
                f64::NAN
            } else if l == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect()
}

/// MACD lines, all full-length
pub struct MacdResult {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdResult {
    let n = data.len();
    if fast == 0 || slow == 0 || signal_period == 0 {
        return MacdResult {
            macd: vec![f64::NAN; n],
            signal: vec![f64::NAN; n],
            histogram: vec![f64::NAN; n],
        };
    }

    let ema_fast = ewm(data, 2.0 / (fast as f64 + 1.0));
    let ema_slow = ewm(data, 2.0 / (slow as f64 + 1.0));
    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal = ewm(&macd, 2.0 / (signal_period as f64 + 1.0));
    let histogram: Vec<f64> = macd
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdResult {
        macd,
        signal,
        histogram,
    }
}

/// Histogram zero-crossing marker: +1 crossing up through zero, -1 crossing
/// down, 0 otherwise (including NaN operands).
pub fn macd_crossover(histogram: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; histogram.len()];
    for i in 1..histogram.len() {
        let (prev, cur) = (histogram[i - 1], histogram[i]);
        if !prev.is_finite() || !cur.is_finite() {
            continue;
        }
        if cur > 0.0 && prev < 0.0 {
            out[i] = 1.0;
        } else if cur < 0.0 && prev > 0.0 {
            out[i] = -1.0;
        }
    }
    out
}

/// True range: max(H-L, |H-prevC|, |L-prevC|); plain H-L at row 0.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut out = vec![f64::NAN; n];
    if n == 0 {
        return out;
    }
    out[0] = high[0] - low[0];
    for i in 1..n {
        let hl = high[i] - low[i];
        let hc = (high[i] - close[i - 1]).abs();
        let lc = (low[i] - close[i - 1]).abs();
        out[i] = hl.max(hc).max(lc);
    }
    out
}

/// Wilder-smoothed Average True Range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    wilder(&true_range(high, low, close), period)
}

/// Directional movement system, all full-length
pub struct AdxResult {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> AdxResult {
    let n = high.len();
    if period == 0 || n == 0 {
        return AdxResult {
            adx: vec![f64::NAN; n],
            plus_di: vec![f64::NAN; n],
            minus_di: vec![f64::NAN; n],
        };
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let tr = true_range(high, low, close);
    let smoothed_tr = wilder(&tr, period);
    let smoothed_plus = wilder(&plus_dm, period);
    let smoothed_minus = wilder(&minus_dm, period);

    let mut plus_di = vec![f64::NAN; n];
    let mut minus_di = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        let (st, sp, sm) = (smoothed_tr[i], smoothed_plus[i], smoothed_minus[i]);
        if !st.is_finite() || !sp.is_finite() || !sm.is_finite() {
            continue;
        }
        let pdi = if st > 0.0 { 100.0 * sp / st } else { 0.0 };
        let mdi = if st > 0.0 { 100.0 * sm / st } else { 0.0 };
        plus_di[i] = pdi;
        minus_di[i] = mdi;
        let di_sum = pdi + mdi;
        dx[i] = if di_sum > 0.0 {
            100.0 * (pdi - mdi).abs() / di_sum
        } else {
            0.0
        };
    }

    AdxResult {
        adx: wilder(&dx, period),
        plus_di,
        minus_di,
    }
}

/// Rate of change over `period` rows, in percent.
pub fn roc(data: &[f64], period: usize) -> Vec<f64> {
    pct_change(data, period)
        .into_iter()
        .map(|v| v * 100.0)
        .collect()
}

/// Bollinger band columns, all full-length
pub struct BollingerResult {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub band_width: Vec<f64>,
    pub pct_b: Vec<f64>,
}

pub fn bollinger(data: &[f64], period: usize, k: f64) -> BollingerResult {
    let n = data.len();
    let middle = rolling_mean(data, period);
    let std = rolling_std(data, period);

    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut band_width = vec![f64::NAN; n];
    let mut pct_b = vec![f64::NAN; n];

    for i in 0..n {
        let (m, s) = (middle[i], std[i]);
        if !m.is_finite() || !s.is_finite() {
            continue;
        }
        let u = m + k * s;
        let l = m - k * s;
        upper[i] = u;
        lower[i] = l;
        if m != 0.0 {
            band_width[i] = 100.0 * (u - l) / m;
        }
        if u != l {
            pct_b[i] = 100.0 * (data[i] - l) / (u - l);
        }
    }

    BollingerResult {
        upper,
        middle,
        lower,
        band_width,
        pct_b,
    }
}

/// Annualized historical volatility of log returns, in percent.
pub fn historical_volatility(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut log_returns = vec![f64::NAN; n];
    for i in 1..n {
        if data[i] > 0.0 && data[i - 1] > 0.0 {
            log_returns[i] = (data[i] / data[i - 1]).ln();
        }
    }
    rolling_std(&log_returns, period)
        .into_iter()
        .map(|v| v * (252.0_f64).sqrt() * 100.0)
        .collect()
}

/// Rolling z-score: (x - rolling_mean) / rolling_std.
pub fn zscore(data: &[f64], period: usize) -> Vec<f64> {
    let mean = rolling_mean(data, period);
    let std = rolling_std(data, period);
    data.iter()
        .enumerate()
        .map(|(i, &x)| {
            if std[i].is_finite() && std[i] > 0.0 {
                (x - mean[i]) / std[i]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// 52-week (252-bar) range columns
pub struct RangeResult {
    pub high_52w: Vec<f64>,
    pub low_52w: Vec<f64>,
    pub range_position: Vec<f64>,
}

pub fn range_52w(close: &[f64]) -> RangeResult {
    let high_52w = rolling_max(close, 252);
    let low_52w = rolling_min(close, 252);
    let range_position = close
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let (hi, lo) = (high_52w[i], low_52w[i]);
            if hi.is_finite() && lo.is_finite() && hi > lo {
                100.0 * (c - lo) / (hi - lo)
            } else {
                f64::NAN
            }
        })
        .collect();
    RangeResult {
        high_52w,
        low_52w,
        range_position,
    }
}

/// On-Balance Volume: cumulative signed volume, zero-seeded.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![0.0; n];
    for i in 1..n {
        let delta = if close[i] > close[i - 1] {
            volume[i]
        } else if close[i] < close[i - 1] {
            -volume[i]
        } else {
            0.0
        };
        out[i] = out[i - 1] + delta;
    }
    out
}

/// Previous-session and weekly price levels, all shifted one row back so a
/// value at row i only sees rows < i.
pub struct PriceLevels {
    pub prev_day_high: Vec<f64>,
    pub prev_day_low: Vec<f64>,
    pub prev_day_close: Vec<f64>,
    pub prev_day_range_pct: Vec<f64>,
    pub prev_week_high: Vec<f64>,
    pub prev_week_low: Vec<f64>,
    pub weekly_return_pct: Vec<f64>,
    pub pivot_point: Vec<f64>,
    pub r1: Vec<f64>,
    pub r2: Vec<f64>,
    pub s1: Vec<f64>,
    pub s2: Vec<f64>,
}

pub fn price_levels(high: &[f64], low: &[f64], close: &[f64]) -> PriceLevels {
    let n = close.len();
    let prev_day_high = shift(high, 1);
    let prev_day_low = shift(low, 1);
    let prev_day_close = shift(close, 1);

    let mut prev_day_range_pct = vec![f64::NAN; n];
    for i in 0..n {
        let (h, l, c) = (prev_day_high[i], prev_day_low[i], prev_day_close[i]);
        if h.is_finite() && l.is_finite() && c.is_finite() && c != 0.0 {
            prev_day_range_pct[i] = 100.0 * (h - l) / c;
        }
    }

    let prev_week_high = rolling_max(&prev_day_high, 5);
    let prev_week_low = rolling_min(&prev_day_low, 5);
    let weekly_return_pct = shift(&roc(close, 5), 1);

    let mut pivot_point = vec![f64::NAN; n];
    let mut r1 = vec![f64::NAN; n];
    let mut r2 = vec![f64::NAN; n];
    let mut s1 = vec![f64::NAN; n];
    let mut s2 = vec![f64::NAN; n];
    for i in 0..n {
        let (h, l, c) = (prev_day_high[i], prev_day_low[i], prev_day_close[i]);
        if !h.is_finite() || !l.is_finite() || !c.is_finite() {
            continue;
        }
        let pivot = (h + l + c) / 3.0;
        pivot_point[i] = pivot;
        r1[i] = 2.0 * pivot - l;
        r2[i] = pivot + (h - l);
        s1[i] = 2.0 * pivot - h;
        s2[i] = pivot - (h - l);
    }

    PriceLevels {
        prev_day_high,
        prev_day_low,
        prev_day_close,
        prev_day_range_pct,
        prev_week_high,
        prev_week_low,
        weekly_return_pct,
        pivot_point,
        r1,
        r2,
        s1,
        s2,
    }
}
