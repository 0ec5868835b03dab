//! Reply payloads and the fixed texts the bot sends.

use crate::battery::{DailySummary, StatusFigures};

pub const CHART_CAPTION: &str = "📊 Deine Batterie-Charts für heute!";

pub const CHAT_FALLBACK: &str = "🔋 Entschuldigung, ich hatte ein Problem beim Verarbeiten deiner Frage. \
Versuche es nochmal oder tippe /help für Hilfe!";

/// One outgoing Telegram message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Text with Telegram HTML markup.
    Html(String),
    /// Text sent as-is, e.g. model output.
    Plain(String),
    Photo { png: Vec<u8>, caption: String },
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::Html(text) | Reply::Plain(text) => text.trim().is_empty(),
            Reply::Photo { png, .. } => png.is_empty(),
        }
    }
}

pub fn welcome() -> String {
    "🔋 <b>Battery Buddy Bot</b> ist da! ⚡\n\n\
Ich bin dein intelligenter Batterie-Assistent und sende dir täglich witzige Updates über deine Batterie-Performance!\n\n\
<b>Verfügbare Kommandos:</b>\n\
/daily - Täglichen Report anfordern\n\
/status - Aktuellen Status abfragen\n\
/chart - Batterie-Chart generieren\n\
/help - Hilfe anzeigen\n\n\
Lass uns deine Batterie optimieren! 💚"
        .to_string()
}

pub fn help() -> String {
    "🔋 <b>Battery Buddy Bot - Hilfe</b>\n\n\
<b>Kommandos:</b>\n\
/daily - Generiert einen täglichen Batterie-Report\n\
/status - Zeigt aktuellen Batterie-Status\n\
/chart - Erstellt Batterie-Chart\n\
/help - Diese Hilfe anzeigen\n\n\
<b>Features:</b>\n\
⚡ Tägliche Einsparungs-Updates\n\
☀️ Sonnen-Tag Feiern\n\
💰 Wirtschaftlichkeits-Berichte\n\
📊 Automatische Charts\n\
🌤️ Wetter-Prognosen\n\n\
Stell mir einfach eine Frage zu deiner Batterie oder tippe /daily für deinen ersten Report!"
        .to_string()
}

pub fn status(figures: &StatusFigures) -> String {
    let state = if figures.is_charged() { "🔋 geladen" } else { "⚡ entladen" };
    format!(
        "🔋 <b>Aktueller Batterie-Status</b>\n\n\
<b>Ladestand:</b> {soc:.1}% {level}\n\
<b>Heutige Einsparungen:</b> {savings:.2}€\n\
<b>Aktueller Strompreis:</b> {price:.3}€/kWh\n\
<b>Peak-Preis heute:</b> {peak:.3}€/kWh um {peak_time}\n\n\
<b>Batterie ist {state}</b>",
        soc = figures.current_soc * 100.0,
        level = figures.level().label(),
        savings = figures.total_savings,
        price = figures.current_price,
        peak = figures.peak_price,
        peak_time = figures.peak_time,
    )
}

/// Daily report used when the model is unavailable.
pub fn daily_fallback(summary: &DailySummary) -> String {
    format!(
        "🔋 <b>Batterie-Report für {date}</b>\n\n\
<b>Solar-Produktion:</b> {solar} kWh\n\
<b>Einsparungen:</b> {savings}€\n\
<b>Batterie geladen:</b> {charged} kWh\n\
<b>Batterie entladen:</b> {discharged} kWh\n\
<b>Peak-Preis:</b> {peak}€/kWh um {peak_time}\n\n\
<b>Morgen erwartet:</b> {sun:.1} Sonnenstunden ☀️",
        date = summary.date,
        solar = summary.total_solar,
        savings = summary.savings,
        charged = summary.battery_charged,
        discharged = summary.battery_discharged,
        peak = summary.peak_price,
        peak_time = summary.peak_price_time,
        sun = summary.sun_hours_tomorrow,
    )
}

pub fn status_error(err: &dyn std::fmt::Display) -> Reply {
    Reply::Plain(format!("❌ Fehler beim Laden des Status: {err}"))
}

pub fn chart_error(err: &dyn std::fmt::Display) -> Reply {
    Reply::Plain(format!("❌ Fehler beim Erstellen des Charts: {err}"))
}

pub fn report_error(err: &dyn std::fmt::Display) -> Reply {
    Reply::Plain(format!("❌ Fehler beim Generieren des Reports: {err}"))
}
