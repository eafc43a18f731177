use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a label does not belong to a closed option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelError {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} option: {:?}", self.field, self.value)
    }
}

impl std::error::Error for LabelError {}

// Case, spaces and separators are ignored so "Control-Defense" and "Control / Defense" agree.
fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayStyle {
    #[serde(rename = "All-round")]
    AllRound,
    #[serde(rename = "Fast attack")]
    FastAttack,
    #[serde(rename = "Power smash")]
    PowerSmash,
    #[serde(rename = "Control / Defense")]
    ControlDefense,
}

impl PlayStyle {
    pub const ALL: [PlayStyle; 4] = [
        PlayStyle::AllRound,
        PlayStyle::FastAttack,
        PlayStyle::PowerSmash,
        PlayStyle::ControlDefense,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlayStyle::AllRound => "All-round",
            PlayStyle::FastAttack => "Fast attack",
            PlayStyle::PowerSmash => "Power smash",
            PlayStyle::ControlDefense => "Control / Defense",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PlayStyle::AllRound => "ทำได้ทุกอย่างกลาง ๆ เล่นคู่เล่นเดี่ยวได้หมด",
            PlayStyle::FastAttack => "ชอบบุกเร็ว ตัดจบไว เน้นสปีดการเล่น",
            PlayStyle::PowerSmash => "เน้นฟาดหนัก กดคู่ต่อสู้ด้วยลูกตบ",
            PlayStyle::ControlDefense => "เน้นรับ คุมจังหวะ วางลูกแม่น ๆ",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, LabelError> {
        let wanted = normalize(label);
        Self::ALL
            .into_iter()
            .find(|s| normalize(s.label()) == wanted)
            .ok_or_else(|| LabelError {
                field: "playstyle",
                value: label.to_string(),
            })
    }
}

impl FromStr for PlayStyle {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

pub const EVEN_BALANCE_TAG: &str = "Even balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancePreference {
    /// Sentinel: the user does not care about balance.
    Any,
    #[serde(rename = "Head-light")]
    HeadLight,
    #[serde(rename = "Even balance")]
    EvenBalance,
    #[serde(rename = "Head-heavy")]
    HeadHeavy,
}

impl BalancePreference {
    pub const ALL: [BalancePreference; 4] = [
        BalancePreference::Any,
        BalancePreference::HeadLight,
        BalancePreference::EvenBalance,
        BalancePreference::HeadHeavy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BalancePreference::Any => "Any",
            BalancePreference::HeadLight => "Head-light",
            BalancePreference::EvenBalance => EVEN_BALANCE_TAG,
            BalancePreference::HeadHeavy => "Head-heavy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BalancePreference::Any => "ไม่ซีเรียสเรื่องบาลานซ์",
            BalancePreference::HeadLight => "เหมาะกับสายเล่นหน้าเน็ต เคลื่อนตัวไว ตีโต้เร็ว",
            BalancePreference::EvenBalance => {
                "เล่นได้ทุกสไตล์ ทั้งหน้า–หลัง เหมาะกับสาย all-round"
            }
            BalancePreference::HeadHeavy => "เหมาะกับสายตบหนัก กดเกมจากด้านหลังคอร์ท",
        }
    }

    /// Exact tag comparison; `Any` accepts every tag.
    pub fn accepts(self, balance_tag: &str) -> bool {
        match self {
            BalancePreference::Any => true,
            other => balance_tag == other.label(),
        }
    }

    pub fn from_label(label: &str) -> Result<Self, LabelError> {
        let wanted = normalize(label);
        Self::ALL
            .into_iter()
            .find(|b| normalize(b.label()) == wanted)
            .ok_or_else(|| LabelError {
                field: "balance",
                value: label.to_string(),
            })
    }
}

impl FromStr for BalancePreference {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// Detection order matters: the first name found in a label wins.
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    /// The value stored in the catalog's `player_level` column.
    pub fn name(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner (เพิ่งเริ่มเล่น)",
            Level::Intermediate => "Intermediate (เล่นก๊วนประจำ)",
            Level::Advanced => "Advanced (แข่งบ้างเป็นบางครั้ง)",
        }
    }

    pub fn detect(text: &str) -> Option<Level> {
        Self::ALL.into_iter().find(|l| text.contains(l.name()))
    }
}

/// A level label as picked by the user, with the level parsed out of it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChoice {
    pub label: String,
    pub level: Option<Level>,
}

impl LevelChoice {
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let level = Level::detect(&label);
        Self { label, level }
    }

    /// True when the label mentions the racket's (non-empty) player level.
    pub fn mentions(&self, player_level: Option<&str>) -> bool {
        match player_level {
            Some(pl) if !pl.is_empty() => self.label.contains(pl),
            _ => false,
        }
    }
}

impl From<Level> for LevelChoice {
    fn from(level: Level) -> Self {
        Self {
            label: level.label().to_string(),
            level: Some(level),
        }
    }
}

const BELOW_MARKERS: [&str; 4] = ["ต่ำกว่า", "below", "under", "less than"];
const ABOVE_MARKERS: [&str; 4] = ["ขึ้นไป", "and above", "or more", "+"];

/// Price bounds, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetRange {
    Below { max: u32 },
    AtLeast { min: u32 },
    Between { min: u32, max: u32 },
}

impl BudgetRange {
    pub fn contains(self, price: f64) -> bool {
        match self {
            BudgetRange::Below { max } => price <= f64::from(max),
            BudgetRange::AtLeast { min } => price >= f64::from(min),
            BudgetRange::Between { min, max } => price >= f64::from(min) && price <= f64::from(max),
        }
    }

    /// Parses a descriptive label such as "ต่ำกว่า 1,500", "1,500 – 3,000" or "3,000 ขึ้นไป".
    /// Labels without usable integers yield `None`.
    pub fn parse(label: &str) -> Option<BudgetRange> {
        let nums = extract_integers(&label.replace(',', ""));
        let lower = label.to_lowercase();
        let first = nums.first().copied().filter(|n| *n > 0);

        if let Some(n) = first.filter(|_| BELOW_MARKERS.iter().any(|m| lower.contains(m))) {
            return Some(BudgetRange::Below { max: n });
        }
        if let Some(n) = first.filter(|_| ABOVE_MARKERS.iter().any(|m| lower.contains(m))) {
            return Some(BudgetRange::AtLeast { min: n });
        }
        match nums.as_slice() {
            [min, max, ..] => Some(BudgetRange::Between {
                min: *min,
                max: *max,
            }),
            _ => None,
        }
    }

    pub fn label(self) -> String {
        match self {
            BudgetRange::Below { max } => format!("ต่ำกว่า {}", group_thousands(max)),
            BudgetRange::AtLeast { min } => format!("{} ขึ้นไป", group_thousands(min)),
            BudgetRange::Between { min, max } => {
                format!("{} – {}", group_thousands(min), group_thousands(max))
            }
        }
    }
}

fn extract_integers(text: &str) -> Vec<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok())
        .collect()
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A budget label as picked by the user, with the range parsed out of it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetChoice {
    pub label: String,
    pub range: Option<BudgetRange>,
}

impl BudgetChoice {
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let range = BudgetRange::parse(&label);
        Self { label, range }
    }

    pub fn presets() -> [BudgetChoice; 3] {
        [
            BudgetRange::Below { max: 1500 }.into(),
            BudgetRange::Between {
                min: 1500,
                max: 3000,
            }
            .into(),
            BudgetRange::AtLeast { min: 3000 }.into(),
        ]
    }
}

impl From<BudgetRange> for BudgetChoice {
    fn from(range: BudgetRange) -> Self {
        Self {
            label: range.label(),
            range: Some(range),
        }
    }
}

/// How unset fields are treated, fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Start empty; nothing is fetched until every field is chosen.
    #[default]
    RequireAll,
    /// Start from defaults; an unset field means "no filter".
    Prefilled,
}

impl FromStr for SelectionPolicy {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "requireall" => Ok(SelectionPolicy::RequireAll),
            "prefilled" | "defaults" => Ok(SelectionPolicy::Prefilled),
            _ => Err(LabelError {
                field: "selection policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSelection {
    pub playstyle: Option<PlayStyle>,
    pub balance: Option<BalancePreference>,
    pub level: Option<LevelChoice>,
    pub budget: Option<BudgetChoice>,
}

impl PreferenceSelection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prefilled() -> Self {
        Self {
            playstyle: Some(PlayStyle::AllRound),
            balance: Some(BalancePreference::EvenBalance),
            level: Some(Level::Beginner.into()),
            budget: Some(
                BudgetRange::Between {
                    min: 1500,
                    max: 3000,
                }
                .into(),
            ),
        }
    }

    pub fn initial(policy: SelectionPolicy) -> Self {
        match policy {
            SelectionPolicy::RequireAll => Self::empty(),
            SelectionPolicy::Prefilled => Self::prefilled(),
        }
    }

    pub fn set_playstyle(&mut self, value: Option<PlayStyle>) {
        self.playstyle = value;
    }

    pub fn set_balance(&mut self, value: Option<BalancePreference>) {
        self.balance = value;
    }

    pub fn set_level(&mut self, value: Option<LevelChoice>) {
        self.level = value;
    }

    pub fn set_budget(&mut self, value: Option<BudgetChoice>) {
        self.budget = value;
    }

    pub fn is_complete(&self) -> bool {
        self.playstyle.is_some()
            && self.balance.is_some()
            && self.level.is_some()
            && self.budget.is_some()
    }

    pub fn budget_range(&self) -> Option<BudgetRange> {
        self.budget.as_ref().and_then(|b| b.range)
    }

    pub fn level_value(&self) -> Option<Level> {
        self.level.as_ref().and_then(|l| l.level)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionItem {
    pub value: String,
    pub description: Option<&'static str>,
}

/// Every label the selection UI offers, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct OptionCatalog {
    pub playstyles: Vec<OptionItem>,
    pub balances: Vec<OptionItem>,
    pub levels: Vec<OptionItem>,
    pub budgets: Vec<OptionItem>,
}

impl OptionCatalog {
    pub fn standard() -> Self {
        Self {
            playstyles: PlayStyle::ALL
                .into_iter()
                .map(|s| OptionItem {
                    value: s.label().to_string(),
                    description: Some(s.description()),
                })
                .collect(),
            balances: BalancePreference::ALL
                .into_iter()
                .map(|b| OptionItem {
                    value: b.label().to_string(),
                    description: Some(b.description()),
                })
                .collect(),
            levels: Level::ALL
                .into_iter()
                .map(|l| OptionItem {
                    value: l.label().to_string(),
                    description: None,
                })
                .collect(),
            budgets: BudgetChoice::presets()
                .into_iter()
                .map(|b| OptionItem {
                    value: b.label,
                    description: None,
                })
                .collect(),
        }
    }
}
