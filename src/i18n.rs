use serde::{Deserialize, Serialize};

use crate::models::RoiReport;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    // Callback data of the language keyboard
    pub fn from_code(code: &str) -> Option<Language> {
        match code {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Language::En => "English 🇬🇧",
            Language::Es => "Español 🇪🇸",
        }
    }

    pub fn text(self, text: Text) -> String {
        match self {
            Language::En => english(text),
            Language::Es => spanish(text),
        }
    }
}

pub const LANGUAGES: [Language; 2] = [Language::En, Language::Es];

pub enum Text<'a> {
    Welcome { user: &'a str },
    Help,
    SelectGpu,
    SelectedGpu { gpu_id: &'a str },
    RoiResult(&'a RoiReport),
    InvalidCost,
    NoGpuSelected,
    UnknownGpu,
    UpstreamFailure,
    CalculationFailed,
    LanguageOptions,
    LanguageSelected,
}

fn english(text: Text) -> String {
    match text {
        Text::Welcome { user } => format!(
            "Hi {}! I calculate how many months a GPU needs to pay for itself mining ETH.\nUse /calculateRoi to start or /help to see all commands.",
            user
        ),
        Text::Help => "Commands:\n/calculateRoi - select a GPU and calculate its ROI\n/language - change the bot language\n/help - show this message".to_string(),
        Text::SelectGpu => "Select your GPU model:".to_string(),
        Text::SelectedGpu { gpu_id } => format!(
            "Selected GPU: {}\nHow much did it cost? Reply with the price in USD.",
            gpu_id
        ),
        Text::RoiResult(report) => format!(
            "<b>GPU:</b> {}\n<b>Hashrate:</b> {}\n<b>Power:</b> {} W\n<b>Cost:</b> ${}\n<b>Daily revenue:</b> ${}\n<b>Monthly revenue:</b> ${}\n<b>ROI:</b> {} months",
            report.gpu_id,
            report.display_hash_rate,
            report.watts,
            report.cost,
            report.daily_revenue_usd,
            report.monthly_revenue_usd,
            report.roi_months
        ),
        Text::InvalidCost => "Invalid input, please send the GPU cost as a number (e.g. 750).".to_string(),
        Text::NoGpuSelected => "Select a GPU first with /calculateRoi.".to_string(),
        Text::UnknownGpu => "This GPU is not supported.".to_string(),
        Text::UpstreamFailure => "Could not fetch the current ETH price or block reward, please try again later.".to_string(),
        Text::CalculationFailed => "Could not calculate the ROI with the current market data, please select the GPU again.".to_string(),
        Text::LanguageOptions => "*Select a language:*".to_string(),
        Text::LanguageSelected => "Selected language: English 🇬🇧".to_string(),
    }
}

fn spanish(text: Text) -> String {
    match text {
        Text::Welcome { user } => format!(
            "¡Hola {}! Calculo cuántos meses necesita una GPU para pagarse minando ETH.\nUsa /calculateRoi para empezar o /help para ver todos los comandos.",
            user
        ),
        Text::Help => "Comandos:\n/calculateRoi - elige una GPU y calcula su ROI\n/language - cambia el idioma del bot\n/help - muestra este mensaje".to_string(),
        Text::SelectGpu => "Elige tu modelo de GPU:".to_string(),
        Text::SelectedGpu { gpu_id } => format!(
            "GPU seleccionada: {}\n¿Cuánto costó? Responde con el precio en USD.",
            gpu_id
        ),
        Text::RoiResult(report) => format!(
            "<b>GPU:</b> {}\n<b>Hashrate:</b> {}\n<b>Consumo:</b> {} W\n<b>Costo:</b> ${}\n<b>Ingreso diario:</b> ${}\n<b>Ingreso mensual:</b> ${}\n<b>ROI:</b> {} meses",
            report.gpu_id,
            report.display_hash_rate,
            report.watts,
            report.cost,
            report.daily_revenue_usd,
            report.monthly_revenue_usd,
            report.roi_months
        ),
        Text::InvalidCost => "Entrada inválida, envía el costo de la GPU como un número (p. ej. 750).".to_string(),
        Text::NoGpuSelected => "Primero elige una GPU con /calculateRoi.".to_string(),
        Text::UnknownGpu => "Esta GPU no está soportada.".to_string(),
        Text::UpstreamFailure => "No se pudo obtener el precio de ETH o la recompensa de bloque, inténtalo más tarde.".to_string(),
        Text::CalculationFailed => "No se pudo calcular el ROI con los datos actuales, elige la GPU de nuevo.".to_string(),
        Text::LanguageOptions => "*Elige un idioma:*".to_string(),
        Text::LanguageSelected => "Idioma seleccionado: Español 🇪🇸".to_string(),
    }
}
