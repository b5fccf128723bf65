//! Intent classification
//!
//! Pure keyword rules, evaluated top to bottom; the first match wins.
//! State-dependent rules (pending actions, asset selection) live in the router.

use market_analysis::AssetSymbol;

use crate::chart::ChartStyle;

/// Candle interval requested by the user, with the provider lookback that serves it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeframe {
    label: &'static str,
    lookback_days: u32,
}

/// Accepted tokens, the interval they map to and the lookback in days
const TIMEFRAMES: &[(&str, &str, u32)] = &[
    ("1m", "1m", 1),
    ("3m", "3m", 1),
    ("5m", "5m", 1),
    ("10m", "5m", 1),
    ("15m", "15m", 1),
    ("30m", "30m", 1),
    ("1h", "1h", 2),
    ("2h", "2h", 2),
    ("4h", "4h", 14),
    ("6h", "6h", 14),
    ("8h", "8h", 30),
    ("12h", "12h", 30),
    ("1d", "1d", 90),
    ("3d", "3d", 180),
    ("1w", "1w", 365),
    ("1M", "1M", 365),
];

impl Timeframe {
    pub const DEFAULT: Self = Self {
        label: "1h",
        lookback_days: 2,
    };

    /// Exact token lookup; "1M" (month) is case-sensitive, everything else is not
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let lowered = token.to_lowercase();
        TIMEFRAMES
            .iter()
            .find(|(key, _, _)| *key == token)
            .or_else(|| TIMEFRAMES.iter().find(|(key, _, _)| *key != "1M" && *key == lowered))
            .map(|&(_, label, lookback_days)| Self { label, lookback_days })
    }

    /// First recognized timeframe token in free text, else the default
    pub fn extract(text: &str) -> Self {
        words(text).find_map(Self::parse).unwrap_or(Self::DEFAULT)
    }

    pub const fn label(self) -> &'static str {
        self.label
    }

    pub const fn lookback_days(self) -> u32 {
        self.lookback_days
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorKind {
    Rsi,
    Macd,
    Sma,
    Cmf,
    Adx,
}

impl IndicatorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::Sma => "SMA",
            Self::Cmf => "CMF",
            Self::Adx => "ADX",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "rsi" => Some(Self::Rsi),
            "macd" => Some(Self::Macd),
            "cmf" => Some(Self::Cmf),
            "adx" => Some(Self::Adx),
            w if w
                .strip_prefix("sma")
                .is_some_and(|period| period.chars().all(|c| c.is_ascii_digit())) =>
            {
                Some(Self::Sma)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Chart { timeframe: Timeframe, style: ChartStyle },
    Dominance,
    Crossover { historical: bool },
    Analysis,
    Price,
    Report,
    Indicator(IndicatorKind),
    Unknown,
}

const GREETINGS: &[&str] = &["hola", "buenos", "buenas", "saludos", "hey", "hello"];
const CHART_KEYWORDS: &[&str] = &["grafico", "gráfico"];
const CANDLE_KEYWORDS: &[&str] = &["vela", "candlestick", "japonesas"];
const DOMINANCE_KEYWORDS: &[&str] = &["dominancia", "dominance"];
const CROSS_KEYWORDS: &[&str] = &["cruce"];
const HISTORICAL_KEYWORDS: &[&str] = &["histori", "históri"];
const ANALYSIS_KEYWORDS: &[&str] = &[
    "analiza",
    "análisis",
    "analisis",
    "compara",
    "estrategia",
    "entrada",
    "recomienda",
    "opinas",
    "predic",
];
const PRICE_KEYWORDS: &[&str] = &["precio", "price", "cotiza"];
const REPORT_KEYWORDS: &[&str] = &["indicador", "reporte", "informe"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Alphanumeric words of a message, original case
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// Classify free text into an intent
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let mut lower_words = words(&lower);

    if lower_words.any(|w| GREETINGS.contains(&w)) {
        return Intent::Greeting;
    }
    if contains_any(&lower, CHART_KEYWORDS) {
        let style = if contains_any(&lower, CANDLE_KEYWORDS) {
            ChartStyle::Candlestick
        } else {
            ChartStyle::Line
        };
        return Intent::Chart {
            timeframe: Timeframe::extract(text),
            style,
        };
    }
    if contains_any(&lower, DOMINANCE_KEYWORDS) {
        return Intent::Dominance;
    }
    if contains_any(&lower, CROSS_KEYWORDS) {
        return Intent::Crossover {
            historical: contains_any(&lower, HISTORICAL_KEYWORDS),
        };
    }
    if contains_any(&lower, ANALYSIS_KEYWORDS) {
        return Intent::Analysis;
    }
    if contains_any(&lower, PRICE_KEYWORDS) {
        return Intent::Price;
    }
    if contains_any(&lower, REPORT_KEYWORDS) {
        return Intent::Report;
    }
    if let Some(kind) = words(&lower).find_map(IndicatorKind::from_word) {
        return Intent::Indicator(kind);
    }
    Intent::Unknown
}

/// First known asset ticker appearing as a word in the message
pub fn mentioned_asset(text: &str) -> Option<AssetSymbol> {
    words(text).find_map(AssetSymbol::from_token)
}

const AFFIRMATIVE: &[&str] = &["sí", "si", "por favor", "claro"];

/// Whether a reply confirms a pending question
pub fn is_affirmative(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c == '¡' || c == '¿')
        .to_lowercase();

    AFFIRMATIVE.iter().any(|token| {
        normalized
            .strip_prefix(token)
            .is_some_and(|rest| rest.chars().next().is_none_or(|c| !c.is_alphanumeric()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        assert_eq!(classify("Hola, ¿precio de BTC?"), Intent::Greeting);
        assert_eq!(classify("gráfico de dominancia"), Intent::Chart {
            timeframe: Timeframe::DEFAULT,
            style: ChartStyle::Line
        });
        assert_eq!(classify("dominancia y cruces"), Intent::Dominance);
        assert_eq!(classify("analiza el precio"), Intent::Analysis);
        assert_eq!(classify("precio y rsi"), Intent::Price);
        assert_eq!(classify("rsi y demás indicadores"), Intent::Report);
        assert_eq!(classify("qué tal el tiempo"), Intent::Unknown);
    }

    #[test]
    fn test_greeting_needs_whole_word() {
        assert_eq!(classify("chola"), Intent::Unknown);
        assert_eq!(classify("Buenos días"), Intent::Greeting);
    }

    #[test]
    fn test_chart_style_and_timeframe() {
        assert_eq!(classify("grafico de velas japonesas 4h"), Intent::Chart {
            timeframe: Timeframe::parse("4h").unwrap(),
            style: ChartStyle::Candlestick
        });
        match classify("gráfico 10m") {
            Intent::Chart { timeframe, style } => {
                assert_eq!(timeframe.label(), "5m");
                assert_eq!(style, ChartStyle::Line);
            }
            other => panic!("expected chart, got {other:?}"),
        }
    }

    #[test]
    fn test_timeframe_table() {
        assert_eq!(Timeframe::extract("dame 7x y 1d").label(), "1d");
        assert_eq!(Timeframe::extract("sin temporalidad").label(), "1h");
        assert_eq!(Timeframe::parse("1M").unwrap().label(), "1M");
        assert_eq!(Timeframe::parse("1m").unwrap().label(), "1m");
        assert_eq!(Timeframe::parse("1H").unwrap().label(), "1h");
        assert!(Timeframe::parse("7x").is_none());
    }

    #[test]
    fn test_crossover_qualifier() {
        assert_eq!(classify("hay cruces?"), Intent::Crossover { historical: false });
        assert_eq!(classify("cruces históricos"), Intent::Crossover { historical: true });
        assert_eq!(classify("cruce historico de BNB"), Intent::Crossover { historical: true });
    }

    #[test]
    fn test_indicator_words() {
        assert_eq!(classify("rsi"), Intent::Indicator(IndicatorKind::Rsi));
        assert_eq!(classify("MACD BTC"), Intent::Indicator(IndicatorKind::Macd));
        assert_eq!(classify("sma50?"), Intent::Indicator(IndicatorKind::Sma));
        assert_eq!(classify("adx"), Intent::Indicator(IndicatorKind::Adx));
        assert_eq!(classify("cmf"), Intent::Indicator(IndicatorKind::Cmf));
        assert_eq!(classify("sma"), Intent::Indicator(IndicatorKind::Sma));
    }

    #[test]
    fn test_sma_needs_period_or_nothing() {
        assert_eq!(IndicatorKind::from_word("sma200"), Some(IndicatorKind::Sma));
        assert_eq!(IndicatorKind::from_word("smart"), None);
        assert_eq!(IndicatorKind::from_word("sma50x"), None);
        assert_ne!(classify("smart money"), Intent::Indicator(IndicatorKind::Sma));
    }

    #[test]
    fn test_mentioned_asset() {
        assert_eq!(mentioned_asset("precio de btc?"), Some(AssetSymbol::Btc));
        assert_eq!(mentioned_asset("BNB/USDT"), Some(AssetSymbol::Bnb));
        assert_eq!(mentioned_asset("bnbx"), None);
    }

    #[test]
    fn test_affirmative() {
        for yes in ["sí", "Si", "SÍ!", "por favor", "claro, dale", "¡claro!"] {
            assert!(is_affirmative(yes), "{yes} should confirm");
        }
        for no in ["no", "sigue", "tal vez", "clarooo"] {
            assert!(!is_affirmative(no), "{no} should not confirm");
        }
    }
}
