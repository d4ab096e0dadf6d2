//! Row and payload types for the backend command families.
//!
//! Field names mirror the backend's snake_case payloads one-to-one, so the
//! structs derive straight `Serialize`/`Deserialize` with no renaming.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use spm_invoke::KeywordMatch;

// ─── Schedule ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub id: i64,
    pub plan_no: String,
    pub name: String,
    pub period_type: String,
    pub start_date: String,
    pub end_date: String,
    pub strategy_id: Option<i64>,
    pub status: Option<String>,
    pub version: Option<i64>,
    pub parent_id: Option<i64>,
    pub total_count: Option<i64>,
    pub total_weight: Option<f64>,
    pub roll_change_count: Option<i64>,
    pub score_overall: Option<f64>,
    pub score_sequence: Option<f64>,
    pub score_delivery: Option<f64>,
    pub score_efficiency: Option<f64>,
    pub risk_count_high: Option<i64>,
    pub risk_count_medium: Option<i64>,
    pub risk_count_low: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: i64,
    pub plan_id: i64,
    pub material_id: i64,
    pub sequence: i64,
    pub shift_date: String,
    pub shift_no: i64,
    pub shift_type: String,
    pub planned_start: Option<String>,
    pub planned_end: Option<String>,
    pub cumulative_weight: Option<f64>,
    pub is_roll_change: Option<bool>,
    pub is_locked: Option<bool>,
    pub lock_reason: Option<String>,
    pub risk_flags: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanInput {
    pub name: String,
    pub period_type: String,
    pub start_date: String,
    pub end_date: String,
    pub strategy_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanFilter {
    pub status: Option<String>,
    pub period_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub plan_id: i64,
    pub total_count: i64,
    pub total_weight: f64,
    pub roll_change_count: i64,
    pub score: Option<f64>,
    pub future_ready_count: Option<i64>,
    pub scheduler_mode_used: Option<String>,
    pub fallback_triggered: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoRedoResult {
    pub action_type: String,
    pub remaining: i64,
}

// ─── Risk analysis ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoredRiskEntry {
    pub constraint_type: String,
    pub material_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub plan_id: i64,
    pub plan_name: String,
    pub score_overall: f64,
    pub score_sequence: f64,
    pub score_delivery: f64,
    pub score_efficiency: f64,
    pub total_count: i64,
    pub total_weight: f64,
    pub roll_change_count: i64,
    pub risk_high: i64,
    pub risk_medium: i64,
    pub risk_low: i64,
    #[serde(default)]
    pub violations: Vec<Value>,
    #[serde(default)]
    pub width_jumps: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRiskSuggestionResult {
    pub risk_id: String,
    pub changed: bool,
    pub reason_code: String,
    pub constraint_type: String,
    pub material_id: i64,
    pub coil_id: String,
    pub sequence: i64,
    pub action_note: String,
}

// ─── Operation log ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub id: i64,
    pub log_type: String,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub detail: String,
    pub created_at: String,
}

/// The fixed field set the log keyword search runs over.
impl KeywordMatch for OperationLogEntry {
    fn matches_keyword(&self, needle: &str) -> bool {
        self.detail.to_lowercase().contains(needle)
            || self.action.to_lowercase().contains(needle)
            || self.log_type.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationLogFilter {
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub log_type: Option<String>,
    pub action: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLogEstimate {
    pub count: i64,
    pub cap: i64,
    pub capped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupEstimate {
    pub older_than_days: i64,
    pub logs: i64,
    pub history_plans: i64,
    pub materials: i64,
}

// ─── Export templates and backups ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub columns: String,
    pub format_rules: Option<String>,
    pub is_default: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExportTemplateInput {
    pub name: String,
    pub description: Option<String>,
    pub columns: String,
    pub format_rules: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExportTemplateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub columns: Option<String>,
    pub format_rules: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialStats {
    pub total: i64,
    pub pending: i64,
    pub frozen: i64,
    pub completed: i64,
    pub tempered: i64,
    pub waiting: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFileInfo {
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub created_at: String,
}

// ─── Materials ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub coil_id: String,
    pub contract_no: Option<String>,
    pub customer_name: Option<String>,
    pub customer_code: Option<String>,
    pub steel_grade: String,
    pub thickness: f64,
    pub width: f64,
    pub weight: f64,
    pub hardness_level: Option<String>,
    pub surface_level: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialFilter {
    pub status: Option<String>,
    pub temp_status: Option<String>,
    pub steel_grade: Option<String>,
    pub width_min: Option<f64>,
    pub width_max: Option<f64>,
    pub thickness_min: Option<f64>,
    pub thickness_max: Option<f64>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: i64,
    pub file_name: String,
    pub imported: i64,
    pub skipped: i64,
    pub created_at: String,
}

// ─── Configuration ───

/// Grouped key/value settings, `group -> key -> value`.
pub type SystemConfig = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftConfig {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeightConfig {
    pub id: i64,
    pub dimension_type: String,
    pub dimension_name: String,
    pub weight: f64,
    pub enabled: bool,
    pub sort_order: Option<i64>,
    pub description: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeightUpsertInput {
    pub dimension_type: String,
    pub dimension_name: String,
    pub weight: f64,
    pub enabled: bool,
    pub sort_order: Option<i64>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(action: &str, detail: &str, log_type: &str) -> OperationLogEntry {
        OperationLogEntry {
            id: 1,
            log_type: log_type.to_string(),
            action: action.to_string(),
            target_type: "plan".to_string(),
            target_id: 1,
            detail: detail.to_string(),
            created_at: "2024-03-01T08:00:00Z".to_string(),
        }
    }

    #[test]
    fn log_keyword_matches_detail_action_and_type() {
        let entry = log("save_plan", "Plan #12 Saved", "schedule");
        assert!(entry.matches_keyword("saved"));
        assert!(entry.matches_keyword("save_plan"));
        assert!(entry.matches_keyword("schedule"));
        assert!(!entry.matches_keyword("material"));
    }

    #[test]
    fn plan_decodes_with_optional_fields_missing() {
        let plan: SchedulePlan = serde_json::from_value(serde_json::json!({
            "id": 3,
            "plan_no": "P-2024-0003",
            "name": "week 12",
            "period_type": "weekly",
            "start_date": "2024-03-18",
            "end_date": "2024-03-24"
        }))
        .unwrap();
        assert_eq!(plan.id, 3);
        assert!(plan.status.is_none());
        assert!(plan.total_weight.is_none());
    }
}
