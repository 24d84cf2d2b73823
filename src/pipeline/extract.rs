//! Extraction into a staging bucket, one item per click.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::AcademyError;
use crate::observability::EXTRACTIONS;
use crate::scheduler::{lock, TimerTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Db,
    Api,
    Csv,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Db, SourceKind::Api, SourceKind::Csv];

    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Db => "MySQL Database",
            SourceKind::Api => "Salesforce API",
            SourceKind::Csv => "Legacy CSV",
        }
    }

    /// The shape of data this source hands over.
    pub fn shape(self) -> &'static str {
        match self {
            SourceKind::Db => "Structured Rows",
            SourceKind::Api => "Nested JSON",
            SourceKind::Csv => "Comma Separated",
        }
    }

    pub fn item_label(self) -> &'static str {
        match self {
            SourceKind::Db => "SQL Row",
            SourceKind::Api => "JSON",
            SourceKind::Csv => "CSV Line",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Db => f.write_str("db"),
            SourceKind::Api => f.write_str("api"),
            SourceKind::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db" | "database" | "mysql" => Ok(SourceKind::Db),
            "api" | "salesforce" => Ok(SourceKind::Api),
            "csv" | "file" => Ok(SourceKind::Csv),
            other => Err(AcademyError::UnknownSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedItem {
    pub id: Uuid,
    pub kind: SourceKind,
    pub label: &'static str,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExtract {
    pub generation: u64,
    pub kind: SourceKind,
}

/// Items gathered so far plus the source currently being pulled from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingArea {
    items: Vec<ExtractedItem>,
    animating: Option<SourceKind>,
    #[serde(skip)]
    generation: u64,
}

impl StagingArea {
    pub fn items(&self) -> &[ExtractedItem] {
        &self.items
    }

    pub fn animating(&self) -> Option<SourceKind> {
        self.animating
    }

    /// Only one source may be extracting at a time; otherwise `None`.
    pub fn begin_extract(&mut self, kind: SourceKind) -> Option<PendingExtract> {
        if self.animating.is_some() {
            return None;
        }
        self.generation += 1;
        self.animating = Some(kind);
        Some(PendingExtract {
            generation: self.generation,
            kind,
        })
    }

    pub fn complete_extract(&mut self, pending: PendingExtract) -> Option<&ExtractedItem> {
        if pending.generation != self.generation || self.animating != Some(pending.kind) {
            return None;
        }
        self.animating = None;
        self.items.push(ExtractedItem {
            id: Uuid::new_v4(),
            kind: pending.kind,
            label: pending.kind.item_label(),
            extracted_at: Utc::now(),
        });
        self.items.last()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.animating = None;
        self.generation += 1;
    }
}

/// Hosts a [`StagingArea`] and lands each extraction after a short delay.
pub struct Extractor {
    staging: Arc<Mutex<StagingArea>>,
    timers: Mutex<TimerTable>,
    delay: Duration,
}

impl Extractor {
    pub fn new(delay: Duration) -> Self {
        Self {
            staging: Arc::new(Mutex::new(StagingArea::default())),
            timers: Mutex::new(TimerTable::new("extractor")),
            delay,
        }
    }

    pub fn snapshot(&self) -> StagingArea {
        lock(&self.staging).clone()
    }

    #[instrument(skip(self))]
    pub fn extract(&self, kind: SourceKind) -> bool {
        let mut timers = lock(&self.timers);
        let pending = match lock(&self.staging).begin_extract(kind) {
            Some(p) => p,
            None => {
                debug!("Ignoring extract from {} while another source is busy", kind);
                return false;
            }
        };

        let shared = self.staging.clone();
        timers.schedule(self.delay, move || {
            let mut staging = lock(&shared);
            if let Some(item) = staging.complete_extract(pending) {
                debug!(id = %item.id, "Staged {}", item.label);
            }
        });

        counter!(EXTRACTIONS, "source" => kind.to_string()).increment(1);
        info!("📥 Extracting from {}", kind.display_name());
        true
    }

    #[instrument(skip(self))]
    pub fn clear(&self) {
        lock(&self.timers).cancel_all();
        lock(&self.staging).clear();
        info!("🧹 Staging bucket emptied");
    }
}
