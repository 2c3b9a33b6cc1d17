//! The fixed transition graph between grief states.
//!
//! `allowed_next(current, style)` is the authoritative constraint on every
//! evaluated transition. Model suggestions outside the allowed set are
//! clamped, never accepted.

use crate::emotion::EmotionalState::{self, *};
use crate::style::ResponseStyle::{self, *};

/// Allowed next states for `(current, style)`. The first entry of each row
/// is the clamp target when the current state is not itself allowed.
pub fn allowed_next(current: EmotionalState, style: ResponseStyle) -> &'static [EmotionalState] {
    match (current, style) {
        (Denial, Empathetic) => &[Denial, Sadness, Anger],
        (Denial, Factual) => &[Denial, Anger],
        (Denial, Dismissive) => &[Anger],

        (Anger, Empathetic) => &[Anger, Sadness, Bargaining],
        (Anger, Factual) => &[Anger],
        (Anger, Dismissive) => &[Anger],

        (Bargaining, Empathetic) => &[Bargaining, Sadness, Acceptance],
        (Bargaining, Factual) => &[Bargaining, Sadness],
        (Bargaining, Dismissive) => &[Anger, Bargaining],

        (Sadness, Empathetic) => &[Sadness, Acceptance],
        (Sadness, Factual) => &[Sadness],
        (Sadness, Dismissive) => &[Sadness, Anger],

        (Acceptance, Empathetic) => &[Acceptance],
        (Acceptance, Factual) => &[Acceptance],
        (Acceptance, Dismissive) => &[Sadness, Acceptance],

        // Bootstrap: the first turn may land anywhere in the graph.
        (Neutral, Empathetic) => &[Sadness, Denial, Anger, Bargaining, Acceptance],
        (Neutral, Factual) => &[Denial, Anger, Bargaining, Sadness, Acceptance],
        (Neutral, Dismissive) => &[Anger, Denial, Bargaining, Sadness, Acceptance],
    }
}

/// Resolve a suggested next state against the table.
///
/// An allowed suggestion is taken as is. Otherwise the current state is kept
/// when it is itself allowed, and the row's first entry is used when it is
/// not (denial + dismissive, or leaving the neutral bootstrap).
pub fn clamp_transition(
    current: EmotionalState,
    style: ResponseStyle,
    suggested: EmotionalState,
) -> EmotionalState {
    let allowed = allowed_next(current, style);
    if allowed.contains(&suggested) {
        suggested
    } else if allowed.contains(&current) {
        current
    } else {
        allowed[0]
    }
}
