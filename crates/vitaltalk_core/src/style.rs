//! Qualitative style of the doctor's message, plus a keyword heuristic used
//! when the evaluator model does not name one.
//!
//! The word lists are deliberately small. The model's own classification is
//! preferred whenever it is available.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Empathetic,
    Factual,
    Dismissive,
}

impl ResponseStyle {
    pub const ALL: [ResponseStyle; 3] = [
        ResponseStyle::Empathetic,
        ResponseStyle::Factual,
        ResponseStyle::Dismissive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empathetic => "empathetic",
            Self::Factual => "factual",
            Self::Dismissive => "dismissive",
        }
    }
}

impl fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStyle {
    type Err = String;

    /// Accepts both the bare label and the `_response` suffixed form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.trim_end_matches("_response") {
            "empathetic" => Ok(Self::Empathetic),
            "factual" => Ok(Self::Factual),
            "dismissive" => Ok(Self::Dismissive),
            _ => Err(format!("unknown response style '{}'", s)),
        }
    }
}

const EMPATHETIC: &[&str] = &[
    "i'm sorry",
    "i am sorry",
    "so sorry",
    "i understand",
    "i hear you",
    "i can see",
    "i can only imagine",
    "must be",
    "this is hard",
    "so hard",
    "difficult",
    "take your time",
    "here for you",
    "with you",
    "how are you feeling",
    "how are you holding up",
    "it's okay to",
    "that's understandable",
];

const DISMISSIVE: &[&str] = &[
    "calm down",
    "nothing more",
    "nothing else",
    "no point",
    "you need to accept",
    "you have to accept",
    "just accept",
    "not my problem",
    "i don't have time",
    "i'm busy",
    "whatever",
    "stop asking",
    "get over",
    "be realistic",
    "as i said",
    "i already told you",
];

/// Classify a message by keyword hits. Dismissive cues outweigh empathetic
/// ones on a tie; a message with neither is factual.
pub fn classify_style(text: &str) -> ResponseStyle {
    let lower = text.to_lowercase();
    let empathetic = EMPATHETIC.iter().filter(|w| lower.contains(*w)).count();
    let dismissive = DISMISSIVE.iter().filter(|w| lower.contains(*w)).count();

    if dismissive > 0 && dismissive >= empathetic {
        ResponseStyle::Dismissive
    } else if empathetic > 0 {
        ResponseStyle::Empathetic
    } else {
        ResponseStyle::Factual
    }
}
