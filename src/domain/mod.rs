use serde::{Deserialize, Serialize};
use std::fmt;

pub mod demo_data;

/// Lifecycle tag carried by a demo row. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Raw,
    Processed,
    New,
    Updated,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Raw => "raw",
            RecordStatus::Processed => "processed",
            RecordStatus::New => "new",
            RecordStatus::Updated => "updated",
        };
        f.write_str(s)
    }
}

/// A money value: currency text before cleaning, a number afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Amount::Number(_))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{}", n),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Number(value)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

/// One demo business row (a customer signup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub signup_date: String,
    pub amount: Amount,
    pub status: RecordStatus,
}

impl Record {
    pub fn new(
        id: &str,
        name: &str,
        signup_date: &str,
        amount: impl Into<Amount>,
        status: RecordStatus,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            signup_date: signup_date.to_string(),
            amount: amount.into(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`
    pub correct_answer: usize,
}

impl QuizQuestion {
    pub fn new(id: u32, question: &str, options: &[&str], correct_answer: usize) -> Self {
        Self {
            id,
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer,
        }
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_deserializes_text_or_number() {
        let text: Amount = serde_json::from_str("\"$100.50\"").unwrap();
        let number: Amount = serde_json::from_str("75.2").unwrap();
        assert_eq!(text, Amount::Text("$100.50".to_string()));
        assert_eq!(number, Amount::Number(75.2));
    }

    #[test]
    fn test_record_serializes_status_lowercase() {
        let record = Record::new("U9", "Zed", "2023-02-02", 10.0, RecordStatus::Updated);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "updated");
        assert_eq!(json["amount"], 10.0);
    }

    #[test]
    fn test_quiz_question_uses_camel_case_answer_key() {
        let q: QuizQuestion = serde_json::from_str(
            r#"{"id": 7, "question": "Q?", "options": ["a", "b"], "correctAnswer": 1}"#,
        )
        .unwrap();
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::Number(200.0).to_string(), "200");
        assert_eq!(Amount::Number(95.5).to_string(), "95.5");
        assert_eq!(Amount::from("$1.00").to_string(), "$1.00");
    }
}
