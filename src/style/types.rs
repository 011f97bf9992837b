use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[derive(Default)]
pub enum StyleCategory {
    Visual,
    Auditory,
    ReadingWriting,
    Kinesthetic,
    /// Produced only when the resolver finds a tie.
    Multimodal,
    #[default]
    Unset,
}

impl StyleCategory {
    /// Categories an answer can vote for, in canonical order.
    pub const VOTING: [StyleCategory; 4] = [
        StyleCategory::Visual,
        StyleCategory::Auditory,
        StyleCategory::ReadingWriting,
        StyleCategory::Kinesthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::ReadingWriting => "readingWriting",
            Self::Kinesthetic => "kinesthetic",
            Self::Multimodal => "multimodal",
            Self::Unset => "unset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "visual" => Some(Self::Visual),
            "auditory" => Some(Self::Auditory),
            "readingwriting" | "reading_writing" | "reading" => Some(Self::ReadingWriting),
            "kinesthetic" => Some(Self::Kinesthetic),
            "multimodal" => Some(Self::Multimodal),
            "unset" => Some(Self::Unset),
            _ => None,
        }
    }

    /// Whether an answer option may imply this category.
    pub fn is_voting(&self) -> bool {
        !matches!(self, Self::Multimodal | Self::Unset)
    }
}

impl std::fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[derive(Default)]
pub enum AgeBand {
    EarlyYears,
    #[default]
    Primary,
    Secondary,
    Adult,
}

impl AgeBand {
    pub const ALL: [AgeBand; 4] = [
        AgeBand::EarlyYears,
        AgeBand::Primary,
        AgeBand::Secondary,
        AgeBand::Adult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EarlyYears => "earlyYears",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Adult => "adult",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "earlyyears" | "early_years" | "early" => Some(Self::EarlyYears),
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "adult" => Some(Self::Adult),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub style: StyleCategory,
    /// Percentage of items that voted for the winning category, 0..=100.
    pub confidence: u8,
}

/// The persisted triple. Nothing else belongs to the stored shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LearnerClassificationRecord {
    pub style: StyleCategory,
    pub age_band: AgeBand,
    pub confidence: u8,
}

impl LearnerClassificationRecord {
    pub fn new(style: StyleCategory, age_band: AgeBand, confidence: u8) -> Self {
        Self {
            style,
            age_band,
            confidence: confidence.min(100),
        }
    }

    pub fn from_result(result: ClassificationResult, age_band: AgeBand) -> Self {
        Self::new(result.style, age_band, result.confidence)
    }

    pub fn is_classified(&self) -> bool {
        self.style != StyleCategory::Unset
    }
}

/// Per-category vote counts behind a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTally {
    pub visual: u32,
    pub auditory: u32,
    pub reading_writing: u32,
    pub kinesthetic: u32,
}

impl StyleTally {
    pub fn record(&mut self, style: StyleCategory) {
        match style {
            StyleCategory::Visual => self.visual += 1,
            StyleCategory::Auditory => self.auditory += 1,
            StyleCategory::ReadingWriting => self.reading_writing += 1,
            StyleCategory::Kinesthetic => self.kinesthetic += 1,
            StyleCategory::Multimodal | StyleCategory::Unset => {}
        }
    }

    pub fn get(&self, style: StyleCategory) -> u32 {
        match style {
            StyleCategory::Visual => self.visual,
            StyleCategory::Auditory => self.auditory,
            StyleCategory::ReadingWriting => self.reading_writing,
            StyleCategory::Kinesthetic => self.kinesthetic,
            StyleCategory::Multimodal | StyleCategory::Unset => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.visual + self.auditory + self.reading_writing + self.kinesthetic
    }

    pub fn max_count(&self) -> u32 {
        self.visual
            .max(self.auditory)
            .max(self.reading_writing)
            .max(self.kinesthetic)
    }

    /// Voting categories that reach the maximum count, in canonical order.
    pub fn winners(&self) -> Vec<StyleCategory> {
        let max = self.max_count();
        StyleCategory::VOTING
            .into_iter()
            .filter(|style| self.get(*style) == max)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireProgress {
    pub answered: usize,
    pub total: usize,
}

impl QuestionnaireProgress {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered >= self.total
    }
}
