//! Daily report: day summary, model-written text and the energy-flow chart.

use tracing::{info, warn};

use super::BotState;
use super::replies::{self, CHART_CAPTION, Reply};
use crate::battery::{DailySummary, FALLBACK_SUN_HOURS, SnapshotError};
use crate::chart::{self, ChartKind};
use crate::claude::Completion;

const MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone)]
pub struct DailyReport {
    pub text: Reply,
    pub chart: Option<Vec<u8>>,
    /// False when the text is the template used after a model failure.
    pub from_model: bool,
}

impl DailyReport {
    /// Text first, then the chart if there is one.
    pub fn replies(&self) -> Vec<Reply> {
        let mut out = vec![self.text.clone()];
        if let Some(png) = &self.chart {
            out.push(Reply::Photo {
                png: png.clone(),
                caption: CHART_CAPTION.to_string(),
            });
        }
        out
    }
}

pub fn daily_prompt(summary: &DailySummary) -> String {
    format!(
        r#"You are an assistant that writes short, friendly and funny daily energy summaries for a solar+battery user.
Use the provided data to highlight what was interesting about the day. Do not use all the data, just the most interesting bits.
For example:
- how sunny it was
- the sunniest hour
- when energy was cheap or expensive
- how the battery was used (charging/discharging and SOC swings)
- how much money was saved or earned
- how much energy was self-consumed versus exported
- grid dependence percentage

At the end include how many sun hours are expected tomorrow and how it will impact the energy consumption and prices.

Make the summary 1-3 sentences long, include as many emojis as possible,
and keep it positive and easy to understand. Please use units and include quantity where possible.
Make it as fun as you can!

Here is the data:
{}

Now write a natural-language summary and just return the summary text, without any extra commentary."#,
        summary.to_json()
    )
}

/// Build a fresh report. Only a missing or broken snapshot is an error.
pub async fn generate<C: Completion>(state: &BotState<C>) -> Result<DailyReport, SnapshotError> {
    let snapshot = state.load_snapshot()?;

    let sun_hours = match state.weather.sun_hours_tomorrow().await {
        Ok(hours) => hours,
        Err(e) => {
            warn!("Weather forecast unavailable, assuming {FALLBACK_SUN_HOURS} sun hours: {e}");
            FALLBACK_SUN_HOURS
        }
    };
    let summary = DailySummary::from_snapshot(&snapshot, sun_hours);

    let (text, from_model) = match state.llm.complete(&daily_prompt(&summary), MAX_TOKENS).await {
        Ok(text) => (Reply::Plain(text.trim().to_string()), true),
        Err(e) => {
            warn!("Daily summary generation failed, using template: {e}");
            (Reply::Html(replies::daily_fallback(&summary)), false)
        }
    };

    let chart = match chart::render_blocking(snapshot, ChartKind::EnergyFlow).await {
        Ok(png) => Some(png),
        Err(e) => {
            warn!("Daily chart skipped: {e}");
            None
        }
    };

    info!(
        "📝 Daily report for {} ready (model: {}, chart: {})",
        summary.date,
        from_model,
        chart.is_some()
    );
    Ok(DailyReport { text, chart, from_model })
}
