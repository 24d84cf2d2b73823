//! Module navigation: which lesson is on screen.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::AcademyError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabId {
    #[default]
    Overview,
    Extract,
    Transform,
    Load,
    Comparison,
    Quiz,
}

impl TabId {
    /// Navigation order.
    pub const ALL: [TabId; 6] = [
        TabId::Overview,
        TabId::Extract,
        TabId::Transform,
        TabId::Load,
        TabId::Comparison,
        TabId::Quiz,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TabId::Overview => "The Big Picture",
            TabId::Extract => "Extract",
            TabId::Transform => "Transform",
            TabId::Load => "Load",
            TabId::Comparison => "ETL vs ELT",
            TabId::Quiz => "Quiz",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TabId::Overview => "overview",
            TabId::Extract => "extract",
            TabId::Transform => "transform",
            TabId::Load => "load",
            TabId::Comparison => "comparison",
            TabId::Quiz => "quiz",
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabId {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" | "big_picture" | "big-picture" => Ok(TabId::Overview),
            "extract" => Ok(TabId::Extract),
            "transform" => Ok(TabId::Transform),
            "load" => Ok(TabId::Load),
            "comparison" | "etl_vs_elt" | "etl-vs-elt" => Ok(TabId::Comparison),
            "quiz" => Ok(TabId::Quiz),
            other => Err(AcademyError::UnknownTab(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TabEntry {
    pub id: TabId,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Shell {
    active: TabId,
}

impl Shell {
    pub fn active(&self) -> TabId {
        self.active
    }

    pub fn select(&mut self, tab: TabId) {
        if self.active != tab {
            info!(from = %self.active, to = %tab, "Switched module");
            self.active = tab;
        }
    }

    pub fn tabs(&self) -> Vec<TabEntry> {
        TabId::ALL
            .into_iter()
            .map(|id| TabEntry {
                id,
                label: id.label(),
                active: id == self.active,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_ids_parse_both_naming_schemes() {
        assert_eq!("big_picture".parse::<TabId>().unwrap(), TabId::Overview);
        assert_eq!("etl_vs_elt".parse::<TabId>().unwrap(), TabId::Comparison);
        for tab in TabId::ALL {
            assert_eq!(tab.as_str().parse::<TabId>().unwrap(), tab);
        }
        assert!(matches!("settings".parse::<TabId>(), Err(AcademyError::UnknownTab(_))));
    }

    #[test]
    fn test_shell_defaults_to_overview() {
        let mut shell = Shell::default();
        assert_eq!(shell.active(), TabId::Overview);
        shell.select(TabId::Quiz);
        let active: Vec<_> = shell.tabs().into_iter().filter(|t| t.active).map(|t| t.label).collect();
        assert_eq!(active, vec!["Quiz"]);
    }
}
