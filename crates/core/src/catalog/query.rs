use crate::domain::preference::{BalancePreference, BudgetRange, PreferenceSelection};
use crate::domain::racket::Racket;

pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    StyleTag,
    BalanceTag,
    PlayerLevel,
    Price,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::StyleTag => "style_tag",
            Column::BalanceTag => "balance_tag",
            Column::PlayerLevel => "player_level",
            Column::Price => "price",
        }
    }

    fn text<'a>(self, racket: &'a Racket) -> Option<&'a str> {
        match self {
            Column::StyleTag => Some(racket.style_tag.as_str()),
            Column::BalanceTag => Some(racket.balance_tag.as_str()),
            Column::PlayerLevel => racket.player_level.as_deref(),
            Column::Price => None,
        }
    }

    fn number(self, racket: &Racket) -> Option<f64> {
        match self {
            Column::Price => Some(racket.price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: Column, value: String },
    ContainsIgnoreCase { column: Column, needle: String },
    AtMost { column: Column, value: f64 },
    AtLeast { column: Column, value: f64 },
    Between { column: Column, min: f64, max: f64 },
}

impl Filter {
    /// Evaluates the filter against a single record, the way the remote store would.
    pub fn matches(&self, racket: &Racket) -> bool {
        match self {
            Filter::Eq { column, value } => column.text(racket) == Some(value.as_str()),
            Filter::ContainsIgnoreCase { column, needle } => column
                .text(racket)
                .map(|t| t.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Filter::AtMost { column, value } => {
                column.number(racket).map(|n| n <= *value).unwrap_or(false)
            }
            Filter::AtLeast { column, value } => {
                column.number(racket).map(|n| n >= *value).unwrap_or(false)
            }
            Filter::Between { column, min, max } => column
                .number(racket)
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
        }
    }
}

impl From<BudgetRange> for Filter {
    fn from(range: BudgetRange) -> Self {
        let column = Column::Price;
        match range {
            BudgetRange::Below { max } => Filter::AtMost {
                column,
                value: f64::from(max),
            },
            BudgetRange::AtLeast { min } => Filter::AtLeast {
                column,
                value: f64::from(min),
            },
            BudgetRange::Between { min, max } => Filter::Between {
                column,
                min: f64::from(min),
                max: f64::from(max),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub filters: Vec<Filter>,
    pub limit: usize,
}

impl CatalogQuery {
    /// No filters, only the record cap.
    pub fn broad(limit: usize) -> Self {
        Self {
            filters: Vec::new(),
            limit,
        }
    }

    /// One filter per chosen field; unset fields and the `Any` balance add nothing.
    pub fn for_selection(selection: &PreferenceSelection, limit: usize) -> Self {
        let mut filters = Vec::new();

        if let Some(style) = selection.playstyle {
            filters.push(Filter::ContainsIgnoreCase {
                column: Column::StyleTag,
                needle: style.label().to_string(),
            });
        }

        match selection.balance {
            Some(BalancePreference::Any) | None => {}
            Some(balance) => filters.push(Filter::Eq {
                column: Column::BalanceTag,
                value: balance.label().to_string(),
            }),
        }

        if let Some(level) = selection.level_value() {
            filters.push(Filter::Eq {
                column: Column::PlayerLevel,
                value: level.name().to_string(),
            });
        }

        if let Some(range) = selection.budget_range() {
            filters.push(range.into());
        }

        Self { filters, limit }
    }

    pub fn matches(&self, racket: &Racket) -> bool {
        self.filters.iter().all(|f| f.matches(racket))
    }
}
