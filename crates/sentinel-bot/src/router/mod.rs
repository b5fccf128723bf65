//! Conversation Router
//!
//! One inbound text per call. Pending questions are resolved first, then the
//! classified intent picks a branch. Each branch that reaches an external
//! service is fault-isolated: its error becomes the reply, the chat state
//! stays consistent and the next message is handled normally.

pub mod intent;

use std::fmt::Write as _;
use std::sync::Arc;

use agent_core::{Conversation, GenerationOptions, LlmProvider, Message};
use market_analysis::{
    AssetSymbol, IndicatorSnapshot, MarketDataProvider, compute_indicators, detect_cross,
    resolve_asset_id, scan_crossovers,
};

use crate::chart::{CHART_CANDLES, ChartRenderer, ChartStyle, Overlays};
use crate::error::{BotError, Result};
use crate::state::{ConversationState, ConversationStore, PendingAction};
use crate::telegram::IncomingText;
use intent::{IndicatorKind, Intent, Timeframe, classify, is_affirmative, mentioned_asset};

pub const ASSET_PROMPT: &str = "¿Sobre qué activo quieres la información? Responde BNB o BTC.";
pub const ASSET_REPROMPT: &str = "No reconozco ese activo. Responde exactamente BNB o BTC.";
pub const FALLBACK: &str = "Por favor, sé más específico. Puedo darte precio, RSI, MACD, SMA, CMF, ADX, \
cruces de medias, dominancia de BTC, un informe de indicadores, un análisis o un gráfico.";

const PERSONA: &str = "Eres un agente de inteligencia de mercado que vigila criptoactivos en tiempo real. \
Dirígete al usuario como 'agente @nombre'. Responde en español, de forma concisa y seria, \
basándote en los indicadores que se te entregan y sin inventar datos.";

/// Outbound answer for a single message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo { png: Vec<u8>, caption: String },
}

impl Reply {
    /// What the history records for this reply
    pub fn transcript(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Photo { caption, .. } => caption,
        }
    }
}

/// Router settings taken from the bot configuration
#[derive(Clone, Debug)]
pub struct RouterSettings {
    /// Default chart pair, e.g. "BNB/USDT"
    pub symbol: String,
    /// Interval behind indicator answers
    pub timeframe: Timeframe,
    /// Lookback for the historical crossover scan
    pub history_days: u32,
    pub generation: GenerationOptions,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            symbol: "BNB/USDT".into(),
            timeframe: Timeframe::DEFAULT,
            history_days: 30,
            generation: GenerationOptions::default(),
        }
    }
}

pub struct ConversationRouter {
    market: Arc<dyn MarketDataProvider>,
    llm: Arc<dyn LlmProvider>,
    charts: Arc<dyn ChartRenderer>,
    store: Arc<ConversationStore>,
    settings: RouterSettings,
}

impl ConversationRouter {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        llm: Arc<dyn LlmProvider>,
        charts: Arc<dyn ChartRenderer>,
        store: Arc<ConversationStore>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            market,
            llm,
            charts,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one inbound message and record the exchange in the chat history
    pub async fn handle(&self, message: &IncomingText) -> Reply {
        let slot = self.store.entry(message.chat_id);
        let mut state = slot.lock().await;

        let reply = self.dispatch(&mut state, message).await;

        state
            .history
            .push(Message::user(message.text.as_str()).with_name(message.sender.as_str()));
        state.history.push(Message::assistant(reply.transcript()));
        reply
    }

    async fn dispatch(&self, state: &mut ConversationState, message: &IncomingText) -> Reply {
        let text = message.text.trim();
        let chat_id = message.chat_id;

        match state.pending {
            Some(PendingAction::AwaitingAssetSelection) => {
                return match AssetSymbol::from_token(text) {
                    Some(asset) => {
                        state.selected_asset = Some(asset);
                        state.pending = None;
                        tracing::info!(chat_id, asset = %asset, "Asset selected");
                        Reply::Text(format!("Activo seleccionado: {asset}. ¿Qué quieres saber?"))
                    }
                    None => Reply::Text(ASSET_REPROMPT.into()),
                };
            }
            Some(PendingAction::AwaitingHistoricalCrossConfirmation) => {
                state.pending = None;
                if is_affirmative(text) {
                    let Some(asset) = state.selected_asset else {
                        state.pending = Some(PendingAction::AwaitingAssetSelection);
                        return Reply::Text(ASSET_PROMPT.into());
                    };
                    let result = self.historical_crossovers(asset).await;
                    return recover("historical_crossovers", chat_id, result);
                }
            }
            None => {}
        }

        let intent = classify(text);
        tracing::debug!(chat_id, ?intent, "Classified message");

        match intent {
            Intent::Greeting => return Reply::Text(greeting(&message.sender)),
            Intent::Chart { timeframe, style } => {
                let result = self.chart(text, timeframe, style).await;
                return recover("chart", chat_id, result);
            }
            Intent::Dominance => return recover("dominance", chat_id, self.dominance().await),
            _ => {}
        }

        let Some(asset) = mentioned_asset(text).or(state.selected_asset) else {
            state.pending = Some(PendingAction::AwaitingAssetSelection);
            return Reply::Text(ASSET_PROMPT.into());
        };
        state.selected_asset = Some(asset);

        let result = match intent {
            Intent::Crossover { historical: true } => {
                state.pending = Some(PendingAction::AwaitingHistoricalCrossConfirmation);
                Ok(Reply::Text(format!(
                    "¿Quieres que revise los cruces SMA10/SMA25 de {asset} en los últimos {} días? \
                     Responde 'sí' para continuar.",
                    self.settings.history_days
                )))
            }
            Intent::Crossover { historical: false } => self.current_cross(asset).await,
            Intent::Analysis => self.analysis(asset, &state.history, message).await,
            Intent::Price => self.price(asset).await,
            Intent::Report => self.report(asset).await,
            Intent::Indicator(kind) => self.indicator(asset, kind).await,
            Intent::Greeting | Intent::Chart { .. } | Intent::Dominance | Intent::Unknown => {
                Ok(Reply::Text(FALLBACK.into()))
            }
        };
        recover("intent", chat_id, result)
    }

    async fn snapshot(&self, asset: AssetSymbol) -> Result<IndicatorSnapshot> {
        let candles = self
            .market
            .fetch_candles(asset.provider_id(), self.settings.timeframe.lookback_days())
            .await?;
        let snapshot = compute_indicators(&candles)?;

        if !asset.has_dominance() {
            return Ok(snapshot);
        }
        match self.market.fetch_market_dominance("btc").await {
            Ok(dominance) => Ok(snapshot.with_dominance(dominance)),
            Err(e) => {
                tracing::warn!(error = %e, "Dominance unavailable, reporting without it");
                Ok(snapshot)
            }
        }
    }

    async fn price(&self, asset: AssetSymbol) -> Result<Reply> {
        let price = self.market.fetch_spot_price(asset.provider_id()).await?;
        Ok(Reply::Text(format!("Precio actual de {asset}: ${}", price.round_dp(2))))
    }

    async fn indicator(&self, asset: AssetSymbol, kind: IndicatorKind) -> Result<Reply> {
        let snapshot = self.snapshot(asset).await?;
        let label = kind.label();
        let missing = || format!("No hay suficientes datos para calcular el {label} de {asset}.");

        let text = match kind {
            IndicatorKind::Rsi => snapshot
                .rsi
                .map_or_else(missing, |v| format!("RSI de {asset}: {v:.2}")),
            IndicatorKind::Adx => snapshot
                .adx
                .map_or_else(missing, |v| format!("ADX de {asset}: {v:.2}")),
            IndicatorKind::Macd => snapshot.macd.map_or_else(missing, |v| {
                format!("MACD de {asset}: {v:.2} (Señal: {})", fmt_value(snapshot.macd_signal))
            }),
            IndicatorKind::Sma => {
                if snapshot.sma_10.is_none() {
                    missing()
                } else {
                    format!(
                        "SMA de {asset}: SMA10 {} | SMA25 {} | SMA50 {}",
                        fmt_value(snapshot.sma_10),
                        fmt_value(snapshot.sma_25),
                        fmt_value(snapshot.sma_50)
                    )
                }
            }
            IndicatorKind::Cmf => format!(
                "CMF de {asset}: {:.2} (el proveedor no reporta volumen)",
                snapshot.cmf
            ),
        };
        Ok(Reply::Text(text))
    }

    async fn report(&self, asset: AssetSymbol) -> Result<Reply> {
        let snapshot = self.snapshot(asset).await?;
        Ok(Reply::Text(indicator_report(asset, &snapshot)))
    }

    async fn current_cross(&self, asset: AssetSymbol) -> Result<Reply> {
        let candles = self
            .market
            .fetch_candles(asset.provider_id(), self.settings.timeframe.lookback_days())
            .await?;
        let cross = detect_cross(&candles);

        let text = if cross.golden {
            format!("Golden Cross detectado en {asset}: SMA10, SMA25 y SMA50 cruzan al alza.")
        } else if cross.death {
            format!("Death Cross detectado en {asset}: SMA10, SMA25 y SMA50 cruzan a la baja.")
        } else {
            format!("No hay cruces de SMA (10, 25, 50) en la última vela de {asset}.")
        };
        Ok(Reply::Text(text))
    }

    async fn historical_crossovers(&self, asset: AssetSymbol) -> Result<Reply> {
        let days = self.settings.history_days;
        let candles = self.market.fetch_candles(asset.provider_id(), days).await?;
        let scan = scan_crossovers(&candles);

        if scan.is_empty() {
            return Ok(Reply::Text(format!(
                "No encontré cruces SMA10/SMA25 de {asset} en los últimos {days} días."
            )));
        }
        let when = |ts: Option<chrono::DateTime<chrono::Utc>>| {
            ts.map_or_else(|| "ninguno".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        };
        Ok(Reply::Text(format!(
            "Cruces SMA10/SMA25 de {asset} en los últimos {days} días:\n\
             - Último cruce alcista: {}\n\
             - Último cruce bajista: {}",
            when(scan.last_bullish),
            when(scan.last_bearish)
        )))
    }

    async fn dominance(&self) -> Result<Reply> {
        let price = self.market.fetch_spot_price(AssetSymbol::Btc.provider_id()).await?;
        let dominance = self.market.fetch_market_dominance("btc").await?;

        Ok(Reply::Text(format!(
            "BTC: ${} | Dominancia: {dominance:.2}%\n\
             Si BTC cae mientras su dominancia sube, el capital está saliendo de las altcoins: \
             riesgo de manipulación y posible entrada en corto para altcoins.",
            price.round_dp(2)
        )))
    }

    async fn chart(&self, text: &str, timeframe: Timeframe, style: ChartStyle) -> Result<Reply> {
        let (asset_id, label) = mentioned_asset(text).map_or_else(
            || (resolve_asset_id(&self.settings.symbol), self.settings.symbol.clone()),
            |asset| (asset.provider_id().to_string(), asset.ticker().to_string()),
        );

        let mut candles = self.market.fetch_candles(&asset_id, timeframe.lookback_days()).await?;
        let excess = candles.len().saturating_sub(CHART_CANDLES);
        candles.drain(..excess);
        let overlays = Overlays::from_candles(&candles);

        let charts = Arc::clone(&self.charts);
        let png = tokio::task::spawn_blocking(move || charts.render(&candles, style, &overlays))
            .await
            .map_err(|e| BotError::Chart(e.to_string()))??;

        Ok(Reply::Photo {
            png,
            caption: format!("Gráfico de {label} - {}", timeframe.label()),
        })
    }

    async fn analysis(
        &self,
        asset: AssetSymbol,
        history: &Conversation,
        message: &IncomingText,
    ) -> Result<Reply> {
        let snapshot = self.snapshot(asset).await?;
        let context = context_block(&message.sender, asset, &snapshot, &message.text);

        let mut messages = vec![Message::system(PERSONA)];
        messages.extend(history.messages().iter().cloned());
        messages.push(Message::user(context).with_name(message.sender.as_str()));

        let completion = self.llm.complete(&messages, &self.settings.generation).await?;
        tracing::info!(
            chat_id = message.chat_id,
            provider = self.llm.name(),
            model = %completion.model,
            "Language model answered"
        );
        Ok(Reply::Text(completion.content))
    }
}

/// Turn a branch failure into its user-facing reply
fn recover(branch: &str, chat_id: i64, result: Result<Reply>) -> Reply {
    result.unwrap_or_else(|e| {
        tracing::error!(chat_id, branch, error = %e, "Branch failed");
        Reply::Text(e.user_message())
    })
}

fn greeting(sender: &str) -> String {
    format!(
        "Hola agente @{sender}. Vigilo el mercado en tiempo real: pregúntame por precio, RSI, MACD, \
         SMA, ADX, cruces de medias o dominancia, o pídeme un gráfico."
    )
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "N/D".into(), |v| format!("{v:.2}"))
}

/// Every indicator in one message; BTC also carries dominance
pub fn indicator_report(asset: AssetSymbol, snapshot: &IndicatorSnapshot) -> String {
    let mut report = format!(
        "Indicadores de {asset}:\n\
         - Precio: ${:.2} (cierre anterior: ${:.2})\n\
         - RSI: {}\n\
         - MACD: {} (Señal: {})\n\
         - SMA10: {} | SMA25: {} | SMA50: {}\n\
         - ADX: {}\n\
         - Bollinger: {} / {} / {}\n\
         - CMF: {:.2}",
        snapshot.price,
        snapshot.prev_close,
        fmt_value(snapshot.rsi),
        fmt_value(snapshot.macd),
        fmt_value(snapshot.macd_signal),
        fmt_value(snapshot.sma_10),
        fmt_value(snapshot.sma_25),
        fmt_value(snapshot.sma_50),
        fmt_value(snapshot.adx),
        fmt_value(snapshot.bb_low),
        fmt_value(snapshot.bb_medium),
        fmt_value(snapshot.bb_high),
        snapshot.cmf,
    );
    if let Some(dominance) = snapshot.dominance {
        let _ = write!(report, "\n- Dominancia: {dominance:.2}%");
    }
    report
}

/// Indicator context handed to the language model
pub fn context_block(sender: &str, asset: AssetSymbol, snapshot: &IndicatorSnapshot, question: &str) -> String {
    let mut context = format!(
        "Hola agente @{sender}.\n\n\
         Indicadores técnicos actualizados de {asset}:\n\
         - Precio actual: ${:.2}\n\
         - RSI: {}\n\
         - MACD: {} (Señal: {})\n\
         - SMA10: {} | SMA25: {} | SMA50: {}\n\
         - CMF: {:.2}\n",
        snapshot.price,
        fmt_value(snapshot.rsi),
        fmt_value(snapshot.macd),
        fmt_value(snapshot.macd_signal),
        fmt_value(snapshot.sma_10),
        fmt_value(snapshot.sma_25),
        fmt_value(snapshot.sma_50),
        snapshot.cmf,
    );
    if let Some(dominance) = snapshot.dominance {
        let _ = writeln!(context, "- Dominancia BTC: {dominance:.2}%");
    }
    let _ = write!(
        context,
        "\nBandas de Bollinger:\nLow: ${}\nMedium: ${}\nHigh: ${}\n\nPregunta: {question}",
        fmt_value(snapshot.bb_low),
        fmt_value(snapshot.bb_medium),
        fmt_value(snapshot.bb_high),
    );
    context
}
