//! Free-text questions answered by the model with battery context.

use tracing::{info, warn};

use super::BotState;
use super::replies::{CHAT_FALLBACK, Reply};
use crate::battery::ChatContext;
use crate::claude::Completion;

const MAX_TOKENS: u32 = 200;

pub fn chat_prompt(context: &ChatContext, question: &str) -> String {
    format!(
        "Du bist ein intelligenter Batterie-Assistent. Du hilfst dem Nutzer bei Fragen zu seiner Solar-Batterie-Anlage.

AKTUELLE BATTERIE-DATEN:
- Ladestand: {soc:.1}%
- Heutige Einsparungen: {savings:.2}€
- Solar-Produktion: {solar:.1} kWh
- Batterie geladen: {charged:.1} kWh
- Batterie entladen: {discharged:.1} kWh
- Peak-Preis: {peak:.3}€/kWh um {peak_time}
- Netzabhängigkeit: {grid:.1}%

NUTZER-FRAGE: {question}

Antworte freundlich, hilfreich und mit vielen Emojis. Erkläre Dinge einfach und verständlich.
Falls die Frage nichts mit der Batterie zu tun hat, erkläre höflich, dass du nur bei Batterie-Fragen helfen kannst.
Antworte auf Deutsch und in 1-3 Sätzen.",
        soc = context.current_soc * 100.0,
        savings = context.total_savings,
        solar = context.solar_production,
        charged = context.battery_charged,
        discharged = context.battery_discharged,
        peak = context.peak_price,
        peak_time = context.peak_time,
        grid = context.grid_dependence,
    )
}

/// Answer a user's question. Never fails: problems turn into an apology.
pub async fn answer<C: Completion>(state: &BotState<C>, question: &str) -> Reply {
    let snapshot = match state.load_snapshot() {
        Ok(s) => s,
        Err(e) => {
            warn!("Chat without battery data: {e}");
            return Reply::Plain(CHAT_FALLBACK.to_string());
        }
    };

    let prompt = chat_prompt(&ChatContext::from_snapshot(&snapshot), question);
    match state.llm.complete(&prompt, MAX_TOKENS).await {
        Ok(text) => {
            info!("🤖 Answered question ({} chars)", text.len());
            Reply::Plain(text.trim().to_string())
        }
        Err(e) => {
            warn!("Chat completion failed: {e}");
            Reply::Plain(CHAT_FALLBACK.to_string())
        }
    }
}
