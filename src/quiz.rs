//! Sequential multiple-choice quiz with delayed advancement.

use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::domain::demo_data::default_questions;
use crate::domain::QuizQuestion;
use crate::error::{AcademyError, Result};
use crate::observability::QUIZ_ANSWERS;
use crate::scheduler::{lock, TimerTable};

/// An ordered, validated, read-only set of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self {
            questions: default_questions().to_vec(),
        }
    }
}

impl QuestionBank {
    pub fn new(questions: Vec<QuizQuestion>) -> Result<Self> {
        if questions.is_empty() {
            return Err(AcademyError::InvalidQuestionBank("bank has no questions".to_string()));
        }
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id) {
                return Err(AcademyError::InvalidQuestionBank(format!("duplicate question id {}", q.id)));
            }
            if q.options.len() < 2 {
                return Err(AcademyError::InvalidQuestionBank(format!(
                    "question {} needs at least two options",
                    q.id
                )));
            }
            if q.correct_answer >= q.options.len() {
                return Err(AcademyError::InvalidQuestionBank(format!(
                    "question {} marks option {} correct but has {} options",
                    q.id,
                    q.correct_answer,
                    q.options.len()
                )));
            }
        }
        Ok(Self { questions })
    }

    /// Read a JSON array of questions (`id`, `question`, `options`, `correctAnswer`).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let questions: Vec<QuizQuestion> = serde_json::from_str(&content)?;
        let bank = Self::new(questions)?;
        info!("Loaded {} quiz questions from {}", bank.len(), path.display());
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "lowercase")]
pub enum QuizState {
    Answering(usize),
    Complete,
}

/// Advancement owed once the feedback delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    pub generation: u64,
    pub question_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionFeedback {
    Selectable,
    Correct,
    WrongSelection,
    Dimmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Perfect,
    Partial,
    Zero,
}

impl Verdict {
    pub fn message(self) -> &'static str {
        match self {
            Verdict::Perfect => "Perfect Score! You're a Data Engineer!",
            Verdict::Partial => "Good job! Review the tabs to get 100%.",
            Verdict::Zero => "Give it another try!",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizSession {
    pub current_index: usize,
    pub score: usize,
    pub selected_option: Option<usize>,
    pub is_answered: bool,
    pub is_complete: bool,
    #[serde(skip)]
    generation: u64,
}

impl QuizSession {
    pub fn state(&self) -> QuizState {
        if self.is_complete {
            QuizState::Complete
        } else {
            QuizState::Answering(self.current_index)
        }
    }

    /// Record an answer for the current question. Returns the advancement to
    /// schedule, or `None` when an answer was already given.
    pub fn select_option(&mut self, bank: &QuestionBank, option: usize) -> Result<Option<PendingAdvance>> {
        if self.is_answered || self.is_complete {
            return Ok(None);
        }
        let question = bank
            .get(self.current_index)
            .ok_or_else(|| AcademyError::InvalidQuestionBank(format!("no question at {}", self.current_index)))?;
        if option >= question.options.len() {
            return Err(AcademyError::OptionOutOfRange {
                index: option,
                len: question.options.len(),
            });
        }

        self.selected_option = Some(option);
        self.is_answered = true;
        if question.is_correct(option) {
            self.score += 1;
        }
        Ok(Some(PendingAdvance {
            generation: self.generation,
            question_index: self.current_index,
        }))
    }

    /// Move to the next question, or finish after the last one.
    pub fn advance(&mut self, bank: &QuestionBank, pending: PendingAdvance) -> bool {
        if pending.generation != self.generation
            || pending.question_index != self.current_index
            || !self.is_answered
            || self.is_complete
        {
            return false;
        }
        if self.current_index + 1 < bank.len() {
            self.current_index += 1;
            self.selected_option = None;
            self.is_answered = false;
        } else {
            self.is_complete = true;
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }

    pub fn progress_percent(&self, bank: &QuestionBank) -> f64 {
        if bank.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / bank.len() as f64 * 100.0
    }

    pub fn option_feedback(&self, bank: &QuestionBank) -> Vec<OptionFeedback> {
        let Some(question) = bank.get(self.current_index) else {
            return Vec::new();
        };
        (0..question.options.len())
            .map(|i| {
                if !self.is_answered {
                    OptionFeedback::Selectable
                } else if question.is_correct(i) {
                    OptionFeedback::Correct
                } else if Some(i) == self.selected_option {
                    OptionFeedback::WrongSelection
                } else {
                    OptionFeedback::Dimmed
                }
            })
            .collect()
    }

    pub fn verdict(&self, bank: &QuestionBank) -> Verdict {
        if self.score == bank.len() {
            Verdict::Perfect
        } else if self.score > 0 {
            Verdict::Partial
        } else {
            Verdict::Zero
        }
    }
}

/// Result of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: usize,
    pub score: usize,
}

/// Hosts a [`QuizSession`] and advances it after the feedback delay.
pub struct QuizRunner {
    bank: Arc<QuestionBank>,
    session: Arc<Mutex<QuizSession>>,
    timers: Mutex<TimerTable>,
    tx: Arc<watch::Sender<QuizSession>>,
    feedback_delay: Duration,
}

impl QuizRunner {
    pub fn new(bank: QuestionBank, feedback_delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(QuizSession::default());
        Self {
            bank: Arc::new(bank),
            session: Arc::new(Mutex::new(QuizSession::default())),
            timers: Mutex::new(TimerTable::new("quiz_runner")),
            tx: Arc::new(tx),
            feedback_delay,
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn session(&self) -> QuizSession {
        lock(&self.session).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuizSession> {
        self.tx.subscribe()
    }

    /// Answer the current question. `Ok(None)` means the answer was ignored
    /// because the question is already answered or the quiz is over.
    #[instrument(skip(self))]
    pub fn select_option(&self, option: usize) -> Result<Option<AnswerFeedback>> {
        let mut timers = lock(&self.timers);
        let (pending, feedback) = {
            let mut session = lock(&self.session);
            let Some(pending) = session.select_option(&self.bank, option)? else {
                debug!("Ignoring answer {} for question {}", option, session.current_index);
                return Ok(None);
            };
            let correct_answer = self
                .bank
                .get(pending.question_index)
                .map(|q| q.correct_answer)
                .unwrap_or_default();
            self.tx.send_replace(session.clone());
            (
                pending,
                AnswerFeedback {
                    correct: option == correct_answer,
                    correct_answer,
                    score: session.score,
                },
            )
        };

        let outcome = if feedback.correct { "correct" } else { "incorrect" };
        counter!(QUIZ_ANSWERS, "outcome" => outcome).increment(1);
        info!(question = pending.question_index, score = feedback.score, "📝 Answer was {}", outcome);

        let shared = self.session.clone();
        let bank = self.bank.clone();
        let tx = self.tx.clone();
        timers.schedule(self.feedback_delay, move || {
            let mut session = lock(&shared);
            if session.advance(&bank, pending) {
                if session.is_complete {
                    info!(score = session.score, total = bank.len(), "🏁 Quiz complete");
                }
                tx.send_replace(session.clone());
            }
        });
        Ok(Some(feedback))
    }

    #[instrument(skip(self))]
    pub fn reset(&self) {
        let mut timers = lock(&self.timers);
        timers.cancel_all();
        let mut session = lock(&self.session);
        session.reset();
        self.tx.send_replace(session.clone());
        info!("🔄 Quiz reset");
    }
}
