//! One instance of every lesson, built from configuration.

use std::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::domain::demo_data::raw_transform_record;
use crate::domain::Record;
use crate::error::Result;
use crate::pipeline::transform::{changed_fields, transform, Rule, TransformRules};
use crate::pipeline::{Extractor, PhaseTimings, PipelineSimulator, WarehouseLoader};
use crate::quiz::{QuestionBank, QuizRunner};
use crate::scheduler::lock;
use crate::shell::Shell;

/// Raw input, active rules and the cleaned output of the transform lesson.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransformPreview {
    pub rules: TransformRules,
    pub raw: Record,
    pub cleaned: Record,
    pub changed_fields: Vec<&'static str>,
}

impl TransformPreview {
    pub fn new(raw: Record, rules: TransformRules) -> Self {
        let cleaned = transform(&raw, &rules);
        let changed_fields = changed_fields(&raw, &cleaned);
        Self {
            rules,
            raw,
            cleaned,
            changed_fields,
        }
    }
}

pub struct Academy {
    pub shell: Mutex<Shell>,
    pub simulator: PipelineSimulator,
    pub extractor: Extractor,
    pub rules: Mutex<TransformRules>,
    pub loader: WarehouseLoader,
    pub quiz: QuizRunner,
}

impl Academy {
    pub fn from_config(config: &Config) -> Result<Self> {
        let bank = match &config.quiz.bank_path {
            Some(path) => QuestionBank::from_json_file(path)?,
            None => QuestionBank::default(),
        };
        let timings = &config.timings;
        info!(questions = bank.len(), "Academy ready");
        Ok(Self {
            shell: Mutex::new(Shell::default()),
            simulator: PipelineSimulator::new(PhaseTimings::from(timings)),
            extractor: Extractor::new(timings.extract_delay()),
            rules: Mutex::new(TransformRules::default()),
            loader: WarehouseLoader::demo(timings.load_delay()),
            quiz: QuizRunner::new(bank, timings.quiz_feedback()),
        })
    }

    pub fn transform_preview(&self) -> TransformPreview {
        TransformPreview::new(raw_transform_record(), *lock(&self.rules))
    }

    pub fn toggle_rule(&self, rule: Rule) -> TransformPreview {
        lock(&self.rules).toggle(rule);
        self.transform_preview()
    }
}
