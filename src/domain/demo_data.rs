//! Fixed in-memory datasets used by the lessons.

use once_cell::sync::Lazy;

use super::{QuizQuestion, Record, RecordStatus};

static INITIAL_WAREHOUSE: Lazy<Vec<Record>> = Lazy::new(|| {
    vec![
        Record::new("U1", "Alice Smith", "2023-01-01", 50.00, RecordStatus::Processed),
        Record::new("U2", "Bob Jones", "2023-01-02", 75.20, RecordStatus::Processed),
        Record::new("U3", "Charlie Day", "2023-01-03", 120.00, RecordStatus::Processed),
    ]
});

static INCOMING_DATA: Lazy<Vec<Record>> = Lazy::new(|| {
    vec![
        Record::new("U2", "Bob Jones", "2023-01-02", 200.00, RecordStatus::Updated),
        Record::new("U4", "Diana Prince", "2023-01-06", 95.50, RecordStatus::New),
    ]
});

static QUESTIONS: Lazy<Vec<QuizQuestion>> = Lazy::new(|| {
    vec![
        QuizQuestion::new(
            1,
            "Which stage involves cleaning data and standardizing formats?",
            &["Extract", "Transform", "Load", "Staging"],
            1,
        ),
        QuizQuestion::new(
            2,
            "In modern ELT pipelines, where does the transformation typically happen?",
            &[
                "Before loading",
                "In the source database",
                "In the destination Data Warehouse",
                "In the API",
            ],
            2,
        ),
        QuizQuestion::new(
            3,
            "What is the temporary storage location between Extract and Transform often called?",
            &["The Data Lake", "Staging Area", "The Archive", "Production"],
            1,
        ),
    ]
});

/// Seed content of the warehouse table.
pub fn initial_warehouse() -> &'static [Record] {
    &INITIAL_WAREHOUSE
}

/// Read-only queue of records waiting to be loaded.
pub fn incoming_data() -> &'static [Record] {
    &INCOMING_DATA
}

/// What the source system looks like after the incoming changes, hand-assembled:
/// U1 unchanged, U2 updated, U3 unchanged, U4 new.
pub fn full_load_final_state() -> Vec<Record> {
    let seed = initial_warehouse();
    let incoming = incoming_data();
    vec![
        seed[0].clone(),
        incoming[0].clone(),
        seed[2].clone(),
        incoming[1].clone(),
    ]
}

/// The messy row shown on the Transform lesson.
pub fn raw_transform_record() -> Record {
    Record::new("U1", "john DOE ", "2023/01/15", "$100.50", RecordStatus::Raw)
}

pub fn default_questions() -> &'static [QuizQuestion] {
    &QUESTIONS
}
