//! Weighted match scoring.
//!
//! Each criterion contributes at most its weight and the total never exceeds 100, so a racket
//! that misses the exact intersection can still rank below exact matches instead of vanishing.

use crate::domain::preference::{PlayStyle, PreferenceSelection, EVEN_BALANCE_TAG};
use crate::domain::racket::{Racket, RecommendedRacket};

pub const STYLE_WEIGHT: u8 = 40;
pub const BALANCE_WEIGHT: u8 = 25;
/// Credit for an even-balance racket when the player asked for all-round play.
pub const BALANCE_ADJACENT_CREDIT: u8 = 15;
pub const LEVEL_WEIGHT: u8 = 15;
pub const BUDGET_WEIGHT: u8 = 20;
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub style: u8,
    pub balance: u8,
    pub level: u8,
    pub budget: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = u16::from(self.style)
            + u16::from(self.balance)
            + u16::from(self.level)
            + u16::from(self.budget);
        sum.min(u16::from(MAX_SCORE)) as u8
    }
}

pub fn score_breakdown(racket: &Racket, selection: &PreferenceSelection) -> ScoreBreakdown {
    let style = match selection.playstyle {
        Some(style) if racket.style_tag == style.label() => STYLE_WEIGHT,
        _ => 0,
    };

    // An unset balance contributes nothing, adjacency credit included.
    let balance = match selection.balance {
        None => 0,
        Some(balance) if balance.accepts(&racket.balance_tag) => BALANCE_WEIGHT,
        Some(_)
            if selection.playstyle == Some(PlayStyle::AllRound)
                && racket.balance_tag == EVEN_BALANCE_TAG =>
        {
            BALANCE_ADJACENT_CREDIT
        }
        Some(_) => 0,
    };

    let level = match &selection.level {
        Some(choice) if choice.mentions(racket.player_level.as_deref()) => LEVEL_WEIGHT,
        _ => 0,
    };

    let budget = match selection.budget_range() {
        Some(range) if range.contains(racket.price) => BUDGET_WEIGHT,
        _ => 0,
    };

    ScoreBreakdown {
        style,
        balance,
        level,
        budget,
    }
}

pub fn match_percentage(racket: &Racket, selection: &PreferenceSelection) -> u8 {
    score_breakdown(racket, selection).total()
}

/// Orders by match percentage, highest first. Equal scores keep catalog order.
pub fn rank(mut items: Vec<RecommendedRacket>) -> Vec<RecommendedRacket> {
    items.sort_by(|a, b| b.match_percentage.cmp(&a.match_percentage));
    items
}
