//! Rolling indicator series.
//!
//! Each function returns one entry per input point, `None` while the window
//! is still warming up.

/// Series aligned with its input, `None` where undefined
pub type Series = Vec<Option<f64>>;

/// Last defined value of a series
pub fn last_defined(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().find_map(|v| *v)
}

/// Last two defined values as `(previous, current)`
pub fn last_two_defined(series: &[Option<f64>]) -> Option<(f64, f64)> {
    let mut defined = series.iter().rev().filter_map(|v| *v);
    let current = defined.next()?;
    let previous = defined.next()?;
    Some((previous, current))
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(n: usize) -> f64 {
    n as f64
}

/// Simple moving average
pub fn sma(values: &[f64], window: usize) -> Series {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / as_f64(window));
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / as_f64(window));
    }
    out
}

/// Exponential moving average seeded at the first value, defined from index `window - 1`
pub fn ema(values: &[f64], window: usize) -> Series {
    let mut out = vec![None; values.len()];
    if window == 0 || values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (as_f64(window) + 1.0);
    let mut current = values[0];
    for (i, &v) in values.iter().enumerate() {
        if i > 0 {
            current = alpha.mul_add(v, (1.0 - alpha) * current);
        }
        if i + 1 >= window {
            out[i] = Some(current);
        }
    }
    out
}

/// EMA over the defined suffix of an already-warming series
fn ema_of_defined(series: &[Option<f64>], window: usize) -> Series {
    let Some(start) = series.iter().position(Option::is_some) else {
        return vec![None; series.len()];
    };
    let tail: Vec<f64> = series[start..].iter().map(|v| v.unwrap_or_default()).collect();
    let mut out = vec![None; start];
    out.extend(ema(&tail, window));
    out
}

/// Relative strength index with Wilder smoothing
pub fn rsi(closes: &[f64], window: usize) -> Series {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() <= window {
        return out;
    }
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let n = as_f64(window);
    let mut avg_gain = gains[..window].iter().sum::<f64>() / n;
    let mut avg_loss = losses[..window].iter().sum::<f64>() / n;
    out[window] = Some(rsi_value(avg_gain, avg_loss));

    for i in window..gains.len() {
        avg_gain = avg_gain.mul_add(n - 1.0, gains[i]) / n;
        avg_loss = avg_loss.mul_add(n - 1.0, losses[i]) / n;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // Flat series reads neutral, pure gains read overbought
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line and its signal line
pub struct Macd {
    pub macd: Series,
    pub signal: Series,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Series = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of_defined(&line, signal);
    Macd {
        macd: line,
        signal: signal_line,
    }
}

/// Bollinger bands around an SMA with population standard deviation
pub struct Bands {
    pub low: Series,
    pub medium: Series,
    pub high: Series,
}

pub fn bollinger(closes: &[f64], window: usize, deviations: f64) -> Bands {
    let medium = sma(closes, window);
    let mut low = vec![None; closes.len()];
    let mut high = vec![None; closes.len()];

    for (i, mean) in medium.iter().enumerate() {
        let Some(mean) = *mean else { continue };
        let slice = &closes[i + 1 - window..=i];
        let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / as_f64(window);
        let width = deviations * variance.sqrt();
        low[i] = Some(mean - width);
        high[i] = Some(mean + width);
    }
    Bands { low, medium, high }
}

/// Average directional index (Wilder), defined from index `2 * window - 1`
pub fn adx(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Series {
    let len = close.len().min(high.len()).min(low.len());
    let mut out = vec![None; len];
    if window == 0 || len < 2 * window {
        return out;
    }

    let mut tr = vec![0.0; len];
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        let range = high[i] - low[i];
        tr[i] = range
            .max((high[i] - close[i - 1]).abs())
            .max((low[i] - close[i - 1]).abs());
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let n = as_f64(window);
    let mut tr_s: f64 = tr[1..=window].iter().sum();
    let mut plus_s: f64 = plus_dm[1..=window].iter().sum();
    let mut minus_s: f64 = minus_dm[1..=window].iter().sum();

    let dx_at = |tr_s: f64, plus_s: f64, minus_s: f64| {
        if tr_s == 0.0 {
            return 0.0;
        }
        let plus_di = 100.0 * plus_s / tr_s;
        let minus_di = 100.0 * minus_s / tr_s;
        let total = plus_di + minus_di;
        if total == 0.0 { 0.0 } else { 100.0 * (plus_di - minus_di).abs() / total }
    };

    let mut dx = vec![0.0; len];
    dx[window] = dx_at(tr_s, plus_s, minus_s);
    for i in window + 1..len {
        tr_s = tr_s - tr_s / n + tr[i];
        plus_s = plus_s - plus_s / n + plus_dm[i];
        minus_s = minus_s - minus_s / n + minus_dm[i];
        dx[i] = dx_at(tr_s, plus_s, minus_s);
    }

    let first = 2 * window - 1;
    let mut value = dx[window..=first].iter().sum::<f64>() / n;
    out[first] = Some(value);
    for i in first + 1..len {
        value = value.mul_add(n - 1.0, dx[i]) / n;
        out[i] = Some(value);
    }
    out
}
