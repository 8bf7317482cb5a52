use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
    pub total_count: u32,
    pub remaining_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Prize {
    /// A freshly stocked prize: remaining starts at total.
    pub fn new(id: String, name: String, total_count: u32, description: Option<String>) -> Self {
        Self {
            id,
            name,
            total_count,
            remaining_count: total_count,
            description,
        }
    }

    pub fn is_available(&self) -> bool {
        self.remaining_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawHistoryEntry {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub prize_name: String,
    pub remaining_inventory: BTreeMap<String, u32>,
}

impl DrawHistoryEntry {
    pub fn record(prize_name: &str, prizes: &[Prize]) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            prize_name: prize_name.to_string(),
            remaining_inventory: inventory_of(prizes),
        }
    }
}

/// The single persisted and replicated unit of lottery state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryAggregate {
    pub prizes: Vec<Prize>,
    #[serde(default)]
    pub current_result: Option<Prize>,
    pub is_drawing: bool,
    pub total_drawn: u64,
    #[serde(default)]
    pub history: Vec<DrawHistoryEntry>,
}

impl LotteryAggregate {
    /// The canonical empty aggregate written by a clear.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_prizes(prizes: Vec<Prize>) -> Self {
        Self {
            prizes,
            ..Self::default()
        }
    }

    pub fn find_prize(&self, id: &str) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }

    pub fn remaining_total(&self) -> u64 {
        self.prizes.iter().map(|p| p.remaining_count as u64).sum()
    }
}

/// Remaining count per prize name. Later prizes win on duplicate names.
pub fn inventory_of(prizes: &[Prize]) -> BTreeMap<String, u32> {
    prizes
        .iter()
        .map(|p| (p.name.clone(), p.remaining_count))
        .collect()
}
