use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::{ClassificationError, EngineResult};
use super::types::{QuestionnaireProgress, StyleCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub option_id: String,
    /// Display text; optional in externally supplied banks.
    #[serde(default)]
    pub label: String,
    pub implied_style: StyleCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
    pub id: String,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

impl QuestionnaireItem {
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.option_id == option_id)
    }

    fn validate(&self) -> Result<(), String> {
        if self.options.len() != StyleCategory::VOTING.len() {
            return Err(format!(
                "item {} has {} options, expected {}",
                self.id,
                self.options.len(),
                StyleCategory::VOTING.len()
            ));
        }

        let mut option_ids = HashSet::new();
        let mut styles = HashSet::new();
        for option in &self.options {
            if !option.implied_style.is_voting() {
                return Err(format!(
                    "item {} option {} implies non-selectable style {}",
                    self.id, option.option_id, option.implied_style
                ));
            }
            if !option_ids.insert(option.option_id.as_str()) {
                return Err(format!(
                    "item {} repeats option id {}",
                    self.id, option.option_id
                ));
            }
            if !styles.insert(option.implied_style) {
                return Err(format!(
                    "item {} offers {} more than once",
                    self.id, option.implied_style
                ));
            }
        }

        Ok(())
    }
}

/// Chosen implied style per item id.
pub type QuestionnaireResponseSet = BTreeMap<String, StyleCategory>;

#[derive(Debug, Error)]
pub enum ItemBankLoadError {
    #[error("failed to read item bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse item bank: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ClassificationError),
}

/// Fixed, ordered sequence of questionnaire items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemBank {
    items: Vec<QuestionnaireItem>,
}

impl ItemBank {
    pub fn new(items: Vec<QuestionnaireItem>) -> EngineResult<Self> {
        if items.is_empty() {
            return Err(ClassificationError::InvalidItemBank(
                "item bank is empty".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for item in &items {
            if !ids.insert(item.id.as_str()) {
                return Err(ClassificationError::InvalidItemBank(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            item.validate().map_err(ClassificationError::InvalidItemBank)?;
        }

        Ok(Self { items })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ItemBankLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let items: Vec<QuestionnaireItem> = serde_json::from_str(&raw)?;
        Ok(Self::new(items)?)
    }

    /// The built-in bank shipped with the engine.
    pub fn reference() -> Self {
        let items = REFERENCE_ITEMS
            .iter()
            .map(|(id, prompt, choices)| QuestionnaireItem {
                id: (*id).to_string(),
                prompt: (*prompt).to_string(),
                options: StyleCategory::VOTING
                    .iter()
                    .zip(choices.iter())
                    .map(|(style, label)| AnswerOption {
                        option_id: style.as_str().to_string(),
                        label: (*label).to_string(),
                        implied_style: *style,
                    })
                    .collect(),
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[QuestionnaireItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: &str) -> Option<&QuestionnaireItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.item(item_id).is_some()
    }

    /// True iff every item in the bank has a recorded answer.
    pub fn is_complete(&self, responses: &QuestionnaireResponseSet) -> bool {
        self.items
            .iter()
            .all(|item| responses.contains_key(&item.id))
    }

    pub fn answered_count(&self, responses: &QuestionnaireResponseSet) -> usize {
        self.items
            .iter()
            .filter(|item| responses.contains_key(&item.id))
            .count()
    }
}

type ReferenceItem = (&'static str, &'static str, [&'static str; 4]);

// Choices are listed in VOTING order: visual, auditory, reading/writing, kinesthetic.
const REFERENCE_ITEMS: &[ReferenceItem] = &[
    (
        "q1",
        "When you learn something new, what helps you most?",
        [
            "Looking at pictures, charts or diagrams",
            "Listening to someone explain it",
            "Reading about it and taking notes",
            "Trying it out with my hands",
        ],
    ),
    (
        "q2",
        "How do you best remember a new word?",
        [
            "Picturing it or seeing it written in colour",
            "Saying it out loud or hearing it in a song",
            "Writing it down several times",
            "Acting it out or linking it to a movement",
        ],
    ),
    (
        "q3",
        "When following directions to a new place, you prefer:",
        [
            "A map",
            "Someone telling you the way",
            "Written step-by-step directions",
            "Walking the route once with someone",
        ],
    ),
    (
        "q4",
        "In your free time you would rather:",
        [
            "Watch a video or draw",
            "Listen to music, a podcast or a story",
            "Read a book or write",
            "Build, play a sport or make something",
        ],
    ),
    (
        "q5",
        "When studying for a test, you usually:",
        [
            "Make mind maps or highlight with colours",
            "Talk it through or repeat it aloud",
            "Rewrite notes and read summaries",
            "Use flashcards you can move around or practice problems",
        ],
    ),
    (
        "q6",
        "A new game arrives. How do you learn the rules?",
        [
            "Look at the pictures on the box and the board",
            "Ask someone to explain them",
            "Read the rule booklet",
            "Just start playing and figure it out",
        ],
    ),
    (
        "q7",
        "Which classroom activity do you enjoy most?",
        [
            "Looking at slides, posters or videos",
            "Class discussions and listening to the teacher",
            "Reading texts and answering written questions",
            "Experiments, role-play and hands-on projects",
        ],
    ),
    (
        "q8",
        "When you explain something to a friend, you:",
        [
            "Draw it or show a picture",
            "Tell them about it",
            "Write it down for them",
            "Show them how to do it",
        ],
    ),
];

/// Collection phase over a fixed item bank.
#[derive(Debug, Clone)]
pub struct Questionnaire {
    bank: Arc<ItemBank>,
    responses: QuestionnaireResponseSet,
}

impl Questionnaire {
    pub fn new(bank: Arc<ItemBank>) -> Self {
        Self {
            bank,
            responses: QuestionnaireResponseSet::new(),
        }
    }

    pub fn item_bank(&self) -> &[QuestionnaireItem] {
        self.bank.items()
    }

    pub fn bank(&self) -> &Arc<ItemBank> {
        &self.bank
    }

    pub fn responses(&self) -> &QuestionnaireResponseSet {
        &self.responses
    }

    /// Records (or overwrites) the answer for `item_id`.
    pub fn record_answer(
        &mut self,
        item_id: &str,
        option_id: &str,
    ) -> EngineResult<&QuestionnaireResponseSet> {
        let invalid = || ClassificationError::InvalidAnswer {
            item_id: item_id.to_string(),
            option_id: option_id.to_string(),
        };

        let item = self.bank.item(item_id).ok_or_else(invalid)?;
        let option = item.option(option_id).ok_or_else(invalid)?;

        self.responses
            .insert(item.id.clone(), option.implied_style);
        Ok(&self.responses)
    }

    pub fn answer_for(&self, item_id: &str) -> Option<StyleCategory> {
        self.responses.get(item_id).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.bank.is_complete(&self.responses)
    }

    pub fn progress(&self) -> QuestionnaireProgress {
        QuestionnaireProgress {
            answered: self.bank.answered_count(&self.responses),
            total: self.bank.len(),
        }
    }

    /// The first item in bank order without an answer.
    pub fn next_unanswered(&self) -> Option<&QuestionnaireItem> {
        self.bank
            .items()
            .iter()
            .find(|item| !self.responses.contains_key(&item.id))
    }

    pub fn clear(&mut self) {
        self.responses.clear();
    }
}
