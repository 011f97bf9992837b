//! Maps a learner classification onto presentation directives for renderers.
//!
//! Everything here is a pure function of `(style, age band)`; directives are
//! recomputed on every call and never stored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::style::{AgeBand, LearnerClassificationRecord, StyleCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleFlag {
    VisualEnhanced,
    AudioEnhanced,
    TextEnhanced,
    InteractiveEnhanced,
    MultimodalEnhanced,
}

impl StyleFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisualEnhanced => "visualEnhanced",
            Self::AudioEnhanced => "audioEnhanced",
            Self::TextEnhanced => "textEnhanced",
            Self::InteractiveEnhanced => "interactiveEnhanced",
            Self::MultimodalEnhanced => "multimodalEnhanced",
        }
    }

    /// The flag a style enables; `Unset` enables none.
    pub fn for_style(style: StyleCategory) -> Option<Self> {
        match style {
            StyleCategory::Visual => Some(Self::VisualEnhanced),
            StyleCategory::Auditory => Some(Self::AudioEnhanced),
            StyleCategory::ReadingWriting => Some(Self::TextEnhanced),
            StyleCategory::Kinesthetic => Some(Self::InteractiveEnhanced),
            StyleCategory::Multimodal => Some(Self::MultimodalEnhanced),
            StyleCategory::Unset => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComplexityLevel {
    VerySimple,
    Simple,
    Moderate,
    Advanced,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerySimple => "verySimple",
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Advanced => "advanced",
        }
    }
}

/// Complexity and share of non-textual presentation for an age band.
pub fn age_profile(age_band: AgeBand) -> (ComplexityLevel, f64) {
    match age_band {
        AgeBand::EarlyYears => (ComplexityLevel::VerySimple, 0.8),
        AgeBand::Primary => (ComplexityLevel::Simple, 0.6),
        AgeBand::Secondary => (ComplexityLevel::Moderate, 0.4),
        AgeBand::Adult => (ComplexityLevel::Advanced, 0.3),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationDirective {
    pub style_flags: BTreeSet<StyleFlag>,
    pub complexity_level: ComplexityLevel,
    pub visual_ratio: f64,
}

impl AdaptationDirective {
    pub fn for_classification(style: StyleCategory, age_band: AgeBand) -> Self {
        let (complexity_level, visual_ratio) = age_profile(age_band);
        Self {
            style_flags: StyleFlag::for_style(style).into_iter().collect(),
            complexity_level,
            visual_ratio,
        }
    }

    pub fn has_flag(&self, flag: StyleFlag) -> bool {
        self.style_flags.contains(&flag)
    }

    /// No style-specific adaptation applies.
    pub fn is_neutral(&self) -> bool {
        self.style_flags.is_empty()
    }

    pub fn text_ratio(&self) -> f64 {
        1.0 - self.visual_ratio
    }
}

/// Content paired with the directive a renderer should apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedContent<T> {
    pub content: T,
    pub directive: AdaptationDirective,
    /// False when the learner has no classification yet and `content` is untouched.
    pub adapted: bool,
}

impl<T> AdaptedContent<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AdaptedContent<U> {
        AdaptedContent {
            content: f(self.content),
            directive: self.directive,
            adapted: self.adapted,
        }
    }

    pub fn into_content(self) -> T {
        self.content
    }
}

pub fn adapt<T>(style: StyleCategory, age_band: AgeBand, content: T) -> AdaptedContent<T> {
    AdaptedContent {
        content,
        directive: AdaptationDirective::for_classification(style, age_band),
        adapted: style != StyleCategory::Unset,
    }
}

pub fn adapt_record<T>(record: &LearnerClassificationRecord, content: T) -> AdaptedContent<T> {
    adapt(record.style, record.age_band, content)
}
