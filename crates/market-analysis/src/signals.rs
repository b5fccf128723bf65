//! Signal Aggregator
//!
//! Combines the indicator snapshot and the cross detector into alert lines.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::indicators::{CrossSignal, compute_indicators, detect_cross};
use crate::model::{Candle, IndicatorSnapshot};

/// Band width under this share of price counts as converging
pub const CONVERGENCE_RATIO: f64 = 0.005;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Price above the upper band while the bands are converging
    ConvergentBreakout,
    GoldenCross,
    DeathCross,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self {
            Self::ConvergentBreakout => {
                "Señal de entrada: Precio cruza banda superior con bandas convergiendo."
            }
            Self::GoldenCross => "Golden Cross detectado en SMA (10, 25, 50).",
            Self::DeathCross => "Death Cross detectado en SMA (10, 25, 50).",
        };
        f.write_str(line)
    }
}

/// Signals fired by a snapshot and a cross result, in report order
pub fn evaluate_signals(snapshot: &IndicatorSnapshot, cross: CrossSignal) -> Vec<Signal> {
    let mut signals = Vec::new();

    if let (Some(low), Some(high)) = (snapshot.bb_low, snapshot.bb_high) {
        let converging = (high - low) < CONVERGENCE_RATIO * snapshot.price;
        if converging && snapshot.price > high {
            signals.push(Signal::ConvergentBreakout);
        }
    }
    if cross.golden {
        signals.push(Signal::GoldenCross);
    }
    if cross.death {
        signals.push(Signal::DeathCross);
    }
    signals
}

/// Alert text for a candle window, one line per signal; empty when nothing fired
pub fn aggregate_signals(candles: &[Candle]) -> Result<String> {
    let snapshot = compute_indicators(candles)?;
    let signals = evaluate_signals(&snapshot, detect_cross(candles));

    Ok(signals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}
