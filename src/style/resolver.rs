use super::error::{ClassificationError, EngineResult};
use super::questionnaire::{ItemBank, QuestionnaireResponseSet};
use super::types::{ClassificationResult, StyleCategory, StyleTally};

/// Counts one vote per answered item.
///
/// Responses must reference items of `bank` and imply a voting category;
/// anything else is rejected as an invalid answer.
pub fn tally(bank: &ItemBank, responses: &QuestionnaireResponseSet) -> EngineResult<StyleTally> {
    let mut tally = StyleTally::default();
    for (item_id, style) in responses {
        if !bank.contains(item_id) || !style.is_voting() {
            return Err(ClassificationError::InvalidAnswer {
                item_id: item_id.clone(),
                option_id: style.as_str().to_string(),
            });
        }
        tally.record(*style);
    }
    Ok(tally)
}

/// Resolves a complete response set into a classification.
pub fn resolve(
    bank: &ItemBank,
    responses: &QuestionnaireResponseSet,
) -> EngineResult<ClassificationResult> {
    resolve_with_tally(bank, responses).map(|(result, _)| result)
}

pub fn resolve_with_tally(
    bank: &ItemBank,
    responses: &QuestionnaireResponseSet,
) -> EngineResult<(ClassificationResult, StyleTally)> {
    let tally = tally(bank, responses)?;

    if !bank.is_complete(responses) {
        return Err(ClassificationError::IncompleteResponses {
            answered: bank.answered_count(responses),
            total: bank.len(),
        });
    }

    let winners = tally.winners();
    let style = match winners.as_slice() {
        [sole] => *sole,
        _ => StyleCategory::Multimodal,
    };

    let result = ClassificationResult {
        style,
        confidence: confidence_percent(tally.max_count(), bank.len()),
    };
    Ok((result, tally))
}

/// `round(100 * max_count / total)`, rounding halves up.
pub fn confidence_percent(max_count: u32, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let total = total as u64;
    let max_count = u64::from(max_count).min(total);
    ((200 * max_count + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::questionnaire::{AnswerOption, QuestionnaireItem};

    fn bank_of(n: usize) -> ItemBank {
        let items = (1..=n)
            .map(|i| QuestionnaireItem {
                id: format!("q{i}"),
                prompt: format!("item {i}"),
                options: StyleCategory::VOTING
                    .iter()
                    .map(|style| AnswerOption {
                        option_id: style.as_str().to_string(),
                        label: String::new(),
                        implied_style: *style,
                    })
                    .collect(),
            })
            .collect();
        ItemBank::new(items).unwrap()
    }

    fn answers(styles: &[StyleCategory]) -> QuestionnaireResponseSet {
        styles
            .iter()
            .enumerate()
            .map(|(i, style)| (format!("q{}", i + 1), *style))
            .collect()
    }

    use StyleCategory::*;

    #[test]
    fn dominant_style_wins() {
        let bank = bank_of(5);
        let result = resolve(&bank, &answers(&[Visual, Visual, Visual, Auditory, ReadingWriting]))
            .unwrap();
        assert_eq!(
            result,
            ClassificationResult {
                style: Visual,
                confidence: 60
            }
        );
    }

    #[test]
    fn tie_resolves_to_multimodal() {
        let bank = bank_of(5);
        let result =
            resolve(&bank, &answers(&[Visual, Visual, Auditory, Auditory, Kinesthetic])).unwrap();
        assert_eq!(
            result,
            ClassificationResult {
                style: Multimodal,
                confidence: 40
            }
        );
    }

    #[test]
    fn four_way_tie_is_multimodal() {
        let bank = bank_of(4);
        let (result, tally) =
            resolve_with_tally(&bank, &answers(&[Visual, Auditory, ReadingWriting, Kinesthetic]))
                .unwrap();
        assert_eq!(result.style, Multimodal);
        assert_eq!(result.confidence, 25);
        assert_eq!(tally.winners().len(), 4);
    }

    #[test]
    fn unanimous_answers_give_full_confidence() {
        let bank = bank_of(3);
        let result = resolve(&bank, &answers(&[Kinesthetic, Kinesthetic, Kinesthetic])).unwrap();
        assert_eq!(result.style, Kinesthetic);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn partial_responses_are_rejected() {
        let bank = bank_of(5);
        let err = resolve(&bank, &answers(&[Visual, Visual])).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::IncompleteResponses {
                answered: 2,
                total: 5
            }
        );
    }

    #[test]
    fn foreign_or_composite_responses_are_rejected() {
        let bank = bank_of(2);
        let mut responses = answers(&[Visual, Visual]);
        responses.insert("q99".to_string(), Visual);
        assert!(matches!(
            resolve(&bank, &responses),
            Err(ClassificationError::InvalidAnswer { .. })
        ));

        let responses = answers(&[Visual, Multimodal]);
        assert!(matches!(
            resolve(&bank, &responses),
            Err(ClassificationError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn confidence_rounds_half_up() {
        assert_eq!(confidence_percent(1, 3), 33);
        assert_eq!(confidence_percent(2, 3), 67);
        assert_eq!(confidence_percent(1, 8), 13);
        assert_eq!(confidence_percent(3, 8), 38);
        assert_eq!(confidence_percent(0, 0), 0);
    }

    #[test]
    fn resolve_is_reproducible() {
        let bank = bank_of(6);
        let responses = answers(&[Auditory, ReadingWriting, Auditory, Visual, Auditory, Kinesthetic]);
        let first = resolve(&bank, &responses).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&bank, &responses).unwrap(), first);
        }
        assert_eq!(first.style, Auditory);
        assert_eq!(first.confidence, 50);
    }
}
