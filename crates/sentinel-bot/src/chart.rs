//! Chart Renderer
//!
//! Price charts as PNG bytes, drawn with `plotters` on an in-memory bitmap.
//! The image carries no text; the caption travels with the photo message.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use market_analysis::Candle;
use market_analysis::indicators::series::sma;
use plotters::prelude::*;

use crate::error::{BotError, Result};

/// Candles shown in one chart
pub const CHART_CANDLES: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChartStyle {
    #[default]
    Line,
    Candlestick,
}

/// Reference lines drawn over the price series
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlays {
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    /// Lowest close in the window
    pub support: Option<f64>,
    /// Highest close in the window
    pub resistance: Option<f64>,
}

impl Overlays {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        Self {
            sma_20: sma(&closes, 20),
            sma_50: sma(&closes, 50),
            support: closes.iter().copied().reduce(f64::min),
            resistance: closes.iter().copied().reduce(f64::max),
        }
    }
}

pub trait ChartRenderer: Send + Sync {
    fn render(&self, candles: &[Candle], style: ChartStyle, overlays: &Overlays) -> Result<Vec<u8>>;
}

const BACKGROUND: RGBColor = RGBColor(0x0f, 0x0f, 0x0f);
const UP: RGBColor = RGBColor(0x00, 0xff, 0x00);
const DOWN: RGBColor = RGBColor(0xff, 0x45, 0x00);
const SMA_20_COLOR: RGBColor = RGBColor(0x00, 0xff, 0xff);
const SMA_50_COLOR: RGBColor = RGBColor(0xff, 0x00, 0xff);
const SUPPORT_COLOR: RGBColor = RGBColor(0xff, 0xff, 0x00);
const RESISTANCE_COLOR: RGBColor = RGBColor(0xff, 0xa5, 0x00);

/// Dark-theme bitmap renderer
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl PlottersRenderer {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn draw(&self, buffer: &mut [u8], candles: &[Candle], style: ChartStyle, overlays: &Overlays) -> Result<()> {
        let (low, high) = value_range(candles, overlays);
        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&BACKGROUND).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .build_cartesian_2d(0..candles.len(), low..high)
            .map_err(chart_err)?;

        match style {
            ChartStyle::Line => {
                chart
                    .draw_series(LineSeries::new(
                        candles.iter().enumerate().map(|(i, c)| (i, c.close)),
                        UP.stroke_width(2),
                    ))
                    .map_err(chart_err)?;
            }
            ChartStyle::Candlestick => {
                chart
                    .draw_series(candles.iter().enumerate().map(|(i, c)| {
                        CandleStick::new(i, c.open, c.high, c.low, c.close, UP.filled(), DOWN.filled(), 5)
                    }))
                    .map_err(chart_err)?;
            }
        }

        for (series, color) in [(&overlays.sma_20, SMA_20_COLOR), (&overlays.sma_50, SMA_50_COLOR)] {
            let points = series.iter().enumerate().filter_map(|(i, v)| v.map(|v| (i, v)));
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(1)))
                .map_err(chart_err)?;
        }

        let last = candles.len().saturating_sub(1);
        for (level, color) in [(overlays.support, SUPPORT_COLOR), (overlays.resistance, RESISTANCE_COLOR)] {
            if let Some(level) = level {
                chart
                    .draw_series(LineSeries::new([(0, level), (last, level)], color.stroke_width(1)))
                    .map_err(chart_err)?;
            }
        }

        root.present().map_err(chart_err)?;
        Ok(())
    }
}

fn chart_err<E: std::fmt::Display>(err: E) -> BotError {
    BotError::Chart(err.to_string())
}

/// Y range covering every candle and overlay, padded so flat series still render
fn value_range(candles: &[Candle], overlays: &Overlays) -> (f64, f64) {
    let overlay_values = overlays
        .sma_20
        .iter()
        .chain(&overlays.sma_50)
        .filter_map(|v| *v)
        .chain(overlays.support)
        .chain(overlays.resistance);
    let values = candles.iter().flat_map(|c| [c.low, c.high]).chain(overlay_values);

    let (low, high) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((high - low) * 0.05).max(high.abs() * 0.001).max(1e-6);
    (low - pad, high + pad)
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, candles: &[Candle], style: ChartStyle, overlays: &Overlays) -> Result<Vec<u8>> {
        if candles.is_empty() {
            return Err(BotError::Chart("no candles to draw".into()));
        }

        let pixels = usize::try_from(u64::from(self.width) * u64::from(self.height) * 3)
            .map_err(chart_err)?;
        let mut buffer = vec![0u8; pixels];
        self.draw(&mut buffer, candles, style, overlays)?;

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&buffer, self.width, self.height, image::ColorType::Rgb8)
            .map_err(chart_err)?;
        Ok(png)
    }
}
