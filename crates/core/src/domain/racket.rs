use serde::{Deserialize, Serialize};

/// Shown by consumers when a racket has no stored image.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/400x400?text=No+Image";

/// A catalog listing. Tags stay as strings: the store owns their closed sets and a record may
/// carry several comma-separated style tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Racket {
    pub id: i64,
    pub brand: String,
    pub model_name: String,
    pub style_tag: String,
    pub balance_tag: String,
    #[serde(default)]
    pub player_level: Option<String>,
    #[serde(default)]
    pub flex: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedRacket {
    #[serde(flatten)]
    pub racket: Racket,
    pub image_url: Option<String>,
    pub match_percentage: u8,
    pub match_tier: MatchTier,
}

impl RecommendedRacket {
    pub fn new(racket: Racket, image_url: Option<String>, match_percentage: u8) -> Self {
        Self {
            racket,
            image_url,
            match_percentage,
            match_tier: MatchTier::from_percentage(match_percentage),
        }
    }

    pub fn display_image_url(&self) -> &str {
        self.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE_URL)
    }
}

/// Coarse bucket of a match percentage, used to colour the match badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Strong,
    Good,
    Fair,
}

impl MatchTier {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            85..=u8::MAX => MatchTier::Strong,
            70..=84 => MatchTier::Good,
            _ => MatchTier::Fair,
        }
    }
}
