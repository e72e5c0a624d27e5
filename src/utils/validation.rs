use crate::dto::exam_dto::CreateQuestion;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::QuestionType;
use validator::Validate;

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate().map_err(Error::from)
}

/// Structural checks the derive attributes cannot express.
pub fn check_question(position: usize, q: &CreateQuestion) -> Result<()> {
    let label = format!("Question {}", position + 1);

    if q.text.trim().is_empty() {
        return Err(Error::BadRequest(format!("{label}: text is required")));
    }
    if q.options.len() < 2 {
        return Err(Error::BadRequest(format!(
            "{label}: at least two options are required"
        )));
    }
    if q.question_type != QuestionType::TrueFalse
        && q.options.iter().any(|opt| opt.trim().is_empty())
    {
        return Err(Error::BadRequest(format!("{label}: options cannot be blank")));
    }

    match (&q.question_type, &q.correct_answer) {
        (QuestionType::MultiSelect, answer) => {
            let indices = answer.indices();
            if answer.is_empty() {
                return Err(Error::BadRequest(format!(
                    "{label}: select at least one correct option"
                )));
            }
            if let Some(bad) = indices.iter().find(|idx| **idx >= q.options.len()) {
                return Err(Error::BadRequest(format!(
                    "{label}: correct option {bad} is out of range"
                )));
            }
        }
        (question_type, Answer::Single(idx)) => {
            let limit = match question_type {
                QuestionType::TrueFalse => 2,
                _ => q.options.len(),
            };
            if *idx >= limit {
                return Err(Error::BadRequest(format!(
                    "{label}: correct option {idx} is out of range"
                )));
            }
        }
        (_, Answer::Multiple(_)) => {
            return Err(Error::BadRequest(format!(
                "{label}: single-answer questions take exactly one correct option"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(question_type: QuestionType, correct: Answer) -> CreateQuestion {
        CreateQuestion {
            text: "Which?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
            ..CreateQuestion::blank(question_type)
        }
    }

    #[test]
    fn accepts_valid_questions() {
        assert!(check_question(0, &question(QuestionType::SingleSelect, Answer::Single(2))).is_ok());
        assert!(check_question(0, &question(QuestionType::MultiSelect, Answer::multiple([0, 2]))).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_empty_sets() {
        assert!(check_question(0, &question(QuestionType::SingleSelect, Answer::Single(3))).is_err());
        assert!(check_question(0, &question(QuestionType::MultiSelect, Answer::multiple([]))).is_err());
        assert!(check_question(0, &question(QuestionType::MultiSelect, Answer::multiple([1, 5]))).is_err());
        assert!(check_question(0, &question(QuestionType::SingleSelect, Answer::multiple([1]))).is_err());
    }

    #[test]
    fn rejects_blank_text() {
        let mut q = question(QuestionType::SingleSelect, Answer::Single(0));
        q.text = "   ".to_string();
        assert!(matches!(check_question(4, &q), Err(Error::BadRequest(msg)) if msg.starts_with("Question 5")));
    }
}
