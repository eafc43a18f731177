use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_REVIEWER_NAME: &str = "Guest";
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub racket_id: i64,
    pub reviewer_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A review that passed client-side validation and may be sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub racket_id: i64,
    pub rating: u8,
    pub comment: String,
    pub reviewer_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewValidationError {
    MissingRating,
    RatingOutOfRange(u8),
}

impl fmt::Display for ReviewValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewValidationError::MissingRating => {
                write!(f, "please pick a star rating before submitting")
            }
            ReviewValidationError::RatingOutOfRange(r) => {
                write!(f, "rating must be between 1 and {MAX_RATING} stars (got {r})")
            }
        }
    }
}

impl std::error::Error for ReviewValidationError {}

impl NewReview {
    pub fn new(
        racket_id: i64,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<Self, ReviewValidationError> {
        match rating {
            0 => Err(ReviewValidationError::MissingRating),
            r if r > MAX_RATING => Err(ReviewValidationError::RatingOutOfRange(r)),
            _ => Ok(Self {
                racket_id,
                rating,
                comment: comment.into().trim().to_string(),
                reviewer_name: DEFAULT_REVIEWER_NAME.to_string(),
            }),
        }
    }

    pub fn with_reviewer_name(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.reviewer_name = name.to_string();
        }
        self
    }
}
