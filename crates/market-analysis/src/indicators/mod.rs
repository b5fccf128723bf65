//! Indicator Engine
//!
//! Turns a candle window into an [`IndicatorSnapshot`] and detects moving-average
//! crosses. Undefined leading values are skipped, so a short window yields absent
//! fields instead of an error.

pub mod series;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};
use crate::model::{Candle, IndicatorSnapshot};
use series::{adx, bollinger, last_defined, last_two_defined, macd, rsi, sma};

pub const RSI_WINDOW: usize = 14;
pub const ADX_WINDOW: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_DEVIATIONS: f64 = 2.0;
pub const SMA_FAST: usize = 10;
pub const SMA_MEDIUM: usize = 25;
pub const SMA_SLOW: usize = 50;

/// Minimum candles for any indicator computation
pub const MIN_CANDLES: usize = 2;

/// CMF placeholder; the provider reports no volume
pub const CMF_PLACEHOLDER: f64 = 0.0;

fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Compute the latest value of every indicator over the window
pub fn compute_indicators(candles: &[Candle]) -> Result<IndicatorSnapshot> {
    if candles.len() < MIN_CANDLES {
        return Err(AdvisorError::InsufficientData {
            needed: MIN_CANDLES,
            got: candles.len(),
        });
    }

    let close = closes(candles);
    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let macd = macd(&close, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bands = bollinger(&close, BOLLINGER_WINDOW, BOLLINGER_DEVIATIONS);

    Ok(IndicatorSnapshot {
        price: close[close.len() - 1],
        prev_close: close[close.len() - 2],
        rsi: last_defined(&rsi(&close, RSI_WINDOW)),
        macd: last_defined(&macd.macd),
        macd_signal: last_defined(&macd.signal),
        sma_10: last_defined(&sma(&close, SMA_FAST)),
        sma_25: last_defined(&sma(&close, SMA_MEDIUM)),
        sma_50: last_defined(&sma(&close, SMA_SLOW)),
        adx: last_defined(&adx(&high, &low, &close, ADX_WINDOW)),
        bb_low: last_defined(&bands.low),
        bb_medium: last_defined(&bands.medium),
        bb_high: last_defined(&bands.high),
        cmf: CMF_PLACEHOLDER,
        dominance: None,
    })
}

/// Golden/death cross flags for the latest step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSignal {
    pub golden: bool,
    pub death: bool,
}

/// SMA10/25/50 values at one step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmaTriple {
    pub fast: f64,
    pub medium: f64,
    pub slow: f64,
}

/// Cross rule between two consecutive SMA triples
///
/// Golden requires both the fast/medium and medium/slow pairs to cross upward
/// in the same step; death is the downward mirror.
pub fn cross_between(prev: SmaTriple, curr: SmaTriple) -> CrossSignal {
    let golden = (prev.fast < prev.medium && curr.fast >= curr.medium)
        && (prev.medium < prev.slow && curr.medium >= curr.slow);
    let death = (prev.fast > prev.medium && curr.fast <= curr.medium)
        && (prev.medium > prev.slow && curr.medium <= curr.slow);
    CrossSignal { golden, death }
}

/// Cross signal over the last two defined SMA10/25/50 values
pub fn detect_cross(candles: &[Candle]) -> CrossSignal {
    let close = closes(candles);
    let pairs = (
        last_two_defined(&sma(&close, SMA_FAST)),
        last_two_defined(&sma(&close, SMA_MEDIUM)),
        last_two_defined(&sma(&close, SMA_SLOW)),
    );
    let (Some(fast), Some(medium), Some(slow)) = pairs else {
        return CrossSignal::default();
    };

    cross_between(
        SmaTriple {
            fast: fast.0,
            medium: medium.0,
            slow: slow.0,
        },
        SmaTriple {
            fast: fast.1,
            medium: medium.1,
            slow: slow.1,
        },
    )
}

/// Most recent SMA10/SMA25 crosses over a whole window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverScan {
    pub last_bullish: Option<DateTime<Utc>>,
    pub last_bearish: Option<DateTime<Utc>>,
}

impl CrossoverScan {
    pub const fn is_empty(&self) -> bool {
        self.last_bullish.is_none() && self.last_bearish.is_none()
    }
}

/// Rolling SMA10/SMA25 scan reporting when each cross direction last happened
pub fn scan_crossovers(candles: &[Candle]) -> CrossoverScan {
    let close = closes(candles);
    let fast = sma(&close, SMA_FAST);
    let medium = sma(&close, SMA_MEDIUM);

    let mut scan = CrossoverScan::default();
    let mut previous: Option<(f64, f64)> = None;

    for (i, candle) in candles.iter().enumerate() {
        let (Some(f), Some(m)) = (fast[i], medium[i]) else {
            continue;
        };
        if let Some((pf, pm)) = previous {
            if pf < pm && f >= m {
                scan.last_bullish = Some(candle.timestamp);
            } else if pf > pm && f <= m {
                scan.last_bearish = Some(candle.timestamp);
            }
        }
        previous = Some((f, m));
    }

    tracing::debug!(
        candles = candles.len(),
        bullish = ?scan.last_bullish,
        bearish = ?scan.last_bearish,
        "Crossover scan finished"
    );
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::candles_from_closes;

    fn wave(len: u32) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + 5.0 * (f64::from(i) * 0.2).sin() + f64::from(i) * 0.1)
            .collect()
    }

    #[test]
    fn test_short_window_is_insufficient() {
        for len in 0..2 {
            let candles = candles_from_closes(&vec![100.0; len]);
            let err = compute_indicators(&candles).unwrap_err();
            assert!(matches!(err, AdvisorError::InsufficientData { needed: 2, .. }));
        }
    }

    #[test]
    fn test_two_candles_yield_absent_fields() {
        let snapshot = compute_indicators(&candles_from_closes(&[100.0, 101.0])).unwrap();
        assert!((snapshot.price - 101.0).abs() < f64::EPSILON);
        assert!((snapshot.prev_close - 100.0).abs() < f64::EPSILON);
        assert!(snapshot.sma_10.is_none());
        assert!(snapshot.rsi.is_none());
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_fifty_candles_are_complete() {
        for len in [50, 75, 120] {
            let snapshot = compute_indicators(&candles_from_closes(&wave(len))).unwrap();
            assert!(snapshot.is_complete(), "incomplete snapshot at {len} candles");
            assert!(snapshot.dominance.is_none());
        }
    }

    #[test]
    fn test_cross_rule() {
        let prev = SmaTriple { fast: 9.0, medium: 10.0, slow: 11.0 };
        let curr = SmaTriple { fast: 12.0, medium: 11.0, slow: 11.0 };
        assert_eq!(cross_between(prev, curr), CrossSignal { golden: true, death: false });
        assert_eq!(cross_between(curr, prev), CrossSignal::default());

        let prev = SmaTriple { fast: 12.0, medium: 11.0, slow: 10.0 };
        let curr = SmaTriple { fast: 10.0, medium: 10.0, slow: 10.0 };
        assert_eq!(cross_between(prev, curr), CrossSignal { golden: false, death: true });
    }

    #[test]
    fn test_golden_and_death_are_exclusive() {
        let values = [9.0, 10.0, 11.0];
        for &a in &values {
            for &b in &values {
                for &c in &values {
                    for &d in &values {
                        let prev = SmaTriple { fast: a, medium: b, slow: c };
                        let curr = SmaTriple { fast: d, medium: b, slow: a };
                        let signal = cross_between(prev, curr);
                        assert!(!(signal.golden && signal.death));
                    }
                }
            }
        }
    }

    #[test]
    fn test_detect_cross_needs_defined_smas() {
        let candles = candles_from_closes(&wave(30));
        assert_eq!(detect_cross(&candles), CrossSignal::default());
    }

    #[test]
    fn test_flat_series_has_no_cross() {
        let candles = candles_from_closes(&[100.0; 80]);
        assert_eq!(detect_cross(&candles), CrossSignal::default());
        assert!(scan_crossovers(&candles).is_empty());
    }

    #[test]
    fn test_scan_finds_bullish_cross_after_decline() {
        let mut closes: Vec<f64> = (0..40).map(|i| 140.0 - f64::from(i)).collect();
        closes.extend((0..40).map(|i| 101.0 + f64::from(i) * 2.0));
        let candles = candles_from_closes(&closes);

        let scan = scan_crossovers(&candles);
        let bullish = scan.last_bullish.unwrap();
        assert!(bullish > candles[40].timestamp);
        assert!(scan.last_bearish.is_none());
    }
}
