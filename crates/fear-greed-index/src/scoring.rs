//! Per-signal contributions to the composite Fear & Greed score.
//! Each returns -1, 0 or +1.

/// Short SMA above long SMA is bullish. An undefined average counts as bearish.
pub fn momentum_score(sma_short: Option<f64>, sma_long: Option<f64>) -> i32 {
    match (sma_short, sma_long) {
        (Some(s), Some(l)) if s > l => 1,
        _ => -1,
    }
}

pub fn rsi_score(rsi: Option<f64>) -> i32 {
    match rsi {
        Some(r) if r < 30.0 => -1,
        Some(r) if r > 70.0 => 1,
        _ => 0,
    }
}

/// ATR above its own rolling mean means rising volatility.
pub fn volatility_score(atr: Option<f64>, atr_mean: Option<f64>) -> i32 {
    match (atr, atr_mean) {
        (Some(a), Some(m)) if a > m => -1,
        _ => 1,
    }
}

pub fn interest_rate_score(rate: f64) -> i32 {
    if rate < 5.0 {
        1
    } else if rate > 7.0 {
        -1
    } else {
        0
    }
}

/// GDP in USD: above 5T greed, above 3T neutral, otherwise fear.
pub fn gdp_score(gdp: f64) -> i32 {
    if gdp > 5e12 {
        1
    } else if gdp > 3e12 {
        0
    } else {
        -1
    }
}

pub fn inflation_score(inflation: f64) -> i32 {
    if inflation < 4.0 {
        1
    } else if inflation <= 6.0 {
        0
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_momentum() {
        assert_eq!(momentum_score(Some(110.0), Some(100.0)), 1);
        assert_eq!(momentum_score(Some(100.0), Some(100.0)), -1);
        assert_eq!(momentum_score(Some(110.0), None), -1);
    }

    #[test]
    fn test_rsi_thresholds() {
        assert_eq!(rsi_score(Some(29.9)), -1);
        assert_eq!(rsi_score(Some(30.0)), 0);
        assert_eq!(rsi_score(Some(70.0)), 0);
        assert_eq!(rsi_score(Some(70.1)), 1);
        assert_eq!(rsi_score(None), 0);
    }

    #[test]
    fn test_volatility() {
        assert_eq!(volatility_score(Some(12.0), Some(10.0)), -1);
        assert_eq!(volatility_score(Some(10.0), Some(10.0)), 1);
        assert_eq!(volatility_score(Some(12.0), None), 1);
    }

    #[test]
    fn test_macro_tiers() {
        assert_eq!(interest_rate_score(4.9), 1);
        assert_eq!(interest_rate_score(6.0), 0);
        assert_eq!(interest_rate_score(7.5), -1);

        assert_eq!(gdp_score(5.1e12), 1);
        assert_eq!(gdp_score(3.5e12), 0);
        assert_eq!(gdp_score(3.0e12), -1);

        assert_eq!(inflation_score(3.9), 1);
        assert_eq!(inflation_score(6.0), 0);
        assert_eq!(inflation_score(6.1), -1);
    }
}
