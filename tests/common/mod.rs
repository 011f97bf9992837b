#![allow(dead_code)]

use learner_style_engine::style::{
    AnswerOption, ItemBank, QuestionnaireItem, QuestionnaireResponseSet, StyleCategory,
};

/// Bank of `n` items `q1..qn`, each offering one option per voting style with the
/// style's name as option id.
pub fn uniform_bank(n: usize) -> ItemBank {
    let items = (1..=n)
        .map(|i| QuestionnaireItem {
            id: format!("q{i}"),
            prompt: format!("Question {i}"),
            options: StyleCategory::VOTING
                .iter()
                .map(|style| AnswerOption {
                    option_id: style.as_str().to_string(),
                    label: format!("{style} choice"),
                    implied_style: *style,
                })
                .collect(),
        })
        .collect();
    ItemBank::new(items).expect("uniform bank is valid")
}

pub fn responses(styles: &[StyleCategory]) -> QuestionnaireResponseSet {
    styles
        .iter()
        .enumerate()
        .map(|(i, style)| (format!("q{}", i + 1), *style))
        .collect()
}
