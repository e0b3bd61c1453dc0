//! Indicator series aligned with their input: output `i` belongs to input
//! row `i`, with `None` where the lookback window is not yet filled.

/// Price fields the range-based indicators need. `high`/`low` are absent on
/// rows that only carry a close (the synthetic forecast row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
}

impl Candle {
    pub fn new(high: f64, low: f64, close: f64) -> Self {
        Self {
            high: Some(high),
            low: Some(low),
            close,
        }
    }

    pub fn close_only(close: f64) -> Self {
        Self {
            high: None,
            low: None,
            close,
        }
    }

    fn high_low(&self) -> Option<(f64, f64)> {
        match (self.high, self.low) {
            (Some(h), Some(l)) => Some((h, l)),
            _ => None,
        }
    }
}

/// Half-width of the band used to estimate a missing high/low.
const ESTIMATED_RANGE_PCT: f64 = 0.01;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let as_options: Vec<Option<f64>> = data.iter().copied().map(Some).collect();
    rolling_mean(&as_options, period)
}

/// Rolling mean over `period` rows. A window containing a `None` has no mean.
pub fn rolling_mean(data: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    for i in period - 1..data.len() {
        let window = &data[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        result[i] = sum.map(|s| s / period as f64);
    }
    result
}

/// Exponential Moving Average, seeded with the first value.
///
/// `ema[0] = data[0]`, `ema[i] = α·data[i] + (1−α)·ema[i−1]` with
/// `α = 2 / (span + 1)`. Every row has a value.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || data.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    for i in 1..data.len() {
        let ema_val = alpha * data[i] + (1.0 - alpha) * result[i - 1];
        result.push(ema_val);
    }

    result
}

/// True range per row: `max(H−L, |H−Cprev|, |L−Cprev|)`.
///
/// A row without high/low is estimated with a ±1% band around the previous
/// close. The first row has no previous close and uses `H−L` when available.
pub fn true_range(candles: &[Candle]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let tr = match (i.checked_sub(1).map(|p| candles[p].close), candle.high_low()) {
            (None, hl) => hl.map(|(h, l)| h - l),
            (Some(prev_close), Some((h, l))) => {
                let high_low = h - l;
                let high_close = (h - prev_close).abs();
                let low_close = (l - prev_close).abs();
                Some(high_low.max(high_close).max(low_close))
            }
            (Some(prev_close), None) => {
                let h = prev_close * (1.0 + ESTIMATED_RANGE_PCT);
                let l = prev_close * (1.0 - ESTIMATED_RANGE_PCT);
                let high_low = (h - l).abs();
                let high_close = (h - prev_close).abs();
                let low_close = (l - prev_close).abs();
                Some(high_low.max(high_close).max(low_close))
            }
        };
        result.push(tr);
    }

    result
}

/// Average True Range: rolling mean of the true range.
pub fn atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    rolling_mean(&true_range(candles), period)
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value appears at row `period`, seeded with the simple mean of
/// the first `period` gains and losses. No losses gives 100; no movement at
/// all gives 50.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period + 1 {
        return result;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    // gains[i] is the change into row i + 1
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}
