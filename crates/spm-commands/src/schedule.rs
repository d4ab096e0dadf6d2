//! Plan, schedule-item, risk, operation-log, export-template and backup
//! commands.

use serde_json::json;

use spm_invoke::CommandGateway;

use crate::types::{
    ApplyRiskSuggestionResult, BackupFileInfo, CleanupEstimate, CreateExportTemplateInput,
    CreatePlanInput, ExportTemplate, IgnoredRiskEntry, MaterialStats, OperationLogEntry,
    OperationLogEstimate, OperationLogFilter, PlanFilter, RiskAnalysis, SchedulePlan,
    ScheduleItem, ScheduleResult, UndoRedoResult, UpdateExportTemplateInput,
};
use crate::{ttl, CommandError, SpmClient};

pub struct ScheduleApi<'a, G> {
    pub(crate) client: &'a SpmClient<G>,
}

impl<G: CommandGateway> ScheduleApi<'_, G> {
    // ─── Plans ───

    pub async fn create_plan(&self, input: &CreatePlanInput) -> Result<SchedulePlan, CommandError> {
        self.client
            .mutate("create_plan", Some(json!({ "input": input })))
            .await
    }

    pub async fn plan(&self, id: i64) -> Result<SchedulePlan, CommandError> {
        self.client
            .read("get_plan", Some(json!({ "id": id })), ttl::NORMAL)
            .await
    }

    pub async fn plans(&self, filter: Option<&PlanFilter>) -> Result<Vec<SchedulePlan>, CommandError> {
        self.client
            .read("get_plans", Some(json!({ "filter": filter })), ttl::LONG)
            .await
    }

    pub async fn save_plan(&self, id: i64) -> Result<SchedulePlan, CommandError> {
        self.client.mutate("save_plan", Some(json!({ "id": id }))).await
    }

    pub async fn delete_plan(&self, id: i64) -> Result<(), CommandError> {
        self.client.mutate("delete_plan", Some(json!({ "id": id }))).await
    }

    pub async fn update_plan_status(&self, id: i64, status: &str) -> Result<SchedulePlan, CommandError> {
        self.client
            .mutate("update_plan_status", Some(json!({ "id": id, "status": status })))
            .await
    }

    pub async fn auto_schedule(
        &self,
        plan_id: i64,
        strategy_id: i64,
    ) -> Result<ScheduleResult, CommandError> {
        self.client
            .mutate(
                "auto_schedule",
                Some(json!({ "planId": plan_id, "strategyId": strategy_id })),
            )
            .await
    }

    // ─── Schedule items ───

    pub async fn schedule_items(&self, plan_id: i64) -> Result<Vec<ScheduleItem>, CommandError> {
        self.client
            .read("get_schedule_items", Some(json!({ "planId": plan_id })), ttl::SHORT)
            .await
    }

    pub async fn add_to_schedule(
        &self,
        plan_id: i64,
        material_ids: &[i64],
        position: Option<i64>,
    ) -> Result<Vec<ScheduleItem>, CommandError> {
        self.client
            .mutate(
                "add_to_schedule",
                Some(json!({ "planId": plan_id, "materialIds": material_ids, "position": position })),
            )
            .await
    }

    pub async fn remove_from_schedule(
        &self,
        plan_id: i64,
        item_ids: &[i64],
    ) -> Result<i64, CommandError> {
        self.client
            .mutate(
                "remove_from_schedule",
                Some(json!({ "planId": plan_id, "itemIds": item_ids })),
            )
            .await
    }

    pub async fn move_schedule_item(
        &self,
        plan_id: i64,
        item_id: i64,
        new_position: i64,
    ) -> Result<(), CommandError> {
        self.client
            .mutate(
                "move_schedule_item",
                Some(json!({ "planId": plan_id, "itemId": item_id, "newPosition": new_position })),
            )
            .await
    }

    pub async fn lock_schedule_items(
        &self,
        plan_id: i64,
        item_ids: &[i64],
        locked: bool,
    ) -> Result<i64, CommandError> {
        self.client
            .mutate(
                "lock_schedule_items",
                Some(json!({ "planId": plan_id, "itemIds": item_ids, "locked": locked })),
            )
            .await
    }

    // ─── Undo / redo ───

    pub async fn undo(&self, plan_id: i64) -> Result<UndoRedoResult, CommandError> {
        self.client
            .mutate("undo_action", Some(json!({ "planId": plan_id })))
            .await
    }

    pub async fn redo(&self, plan_id: i64) -> Result<UndoRedoResult, CommandError> {
        self.client
            .mutate("redo_action", Some(json!({ "planId": plan_id })))
            .await
    }

    pub async fn undo_redo_count(&self, plan_id: i64) -> Result<(i64, i64), CommandError> {
        self.client
            .read("get_undo_redo_count", Some(json!({ "planId": plan_id })), ttl::SHORT)
            .await
    }

    pub async fn clear_undo_stack(&self, plan_id: Option<i64>) -> Result<i64, CommandError> {
        self.client
            .mutate("clear_undo_stack", Some(json!({ "planId": plan_id })))
            .await
    }

    // ─── Risk analysis ───

    pub async fn risk_analysis(&self, plan_id: i64) -> Result<RiskAnalysis, CommandError> {
        self.client
            .read("get_risk_analysis", Some(json!({ "planId": plan_id })), ttl::NORMAL)
            .await
    }

    pub async fn evaluate_risks(&self, plan_id: i64) -> Result<RiskAnalysis, CommandError> {
        self.client
            .mutate("evaluate_risks", Some(json!({ "planId": plan_id })))
            .await
    }

    pub async fn apply_risk_suggestion(
        &self,
        plan_id: i64,
        risk_id: &str,
    ) -> Result<ApplyRiskSuggestionResult, CommandError> {
        self.client
            .mutate(
                "apply_risk_suggestion",
                Some(json!({ "planId": plan_id, "riskId": risk_id })),
            )
            .await
    }

    /// Ignoring a risk only shifts risk views; plan and schedule reads stay
    /// valid, so the invalidation is scoped to the risk commands.
    pub async fn ignore_risk(
        &self,
        plan_id: i64,
        constraint_type: &str,
        material_id: i64,
    ) -> Result<Vec<IgnoredRiskEntry>, CommandError> {
        self.client
            .mutate_invalidating(
                "ignore_risk",
                Some(json!({
                    "planId": plan_id,
                    "constraintType": constraint_type,
                    "materialId": material_id
                })),
                &["get_risk"],
            )
            .await
    }

    pub async fn unignore_risk(
        &self,
        plan_id: i64,
        constraint_type: &str,
        material_id: i64,
    ) -> Result<Vec<IgnoredRiskEntry>, CommandError> {
        self.client
            .mutate_invalidating(
                "unignore_risk",
                Some(json!({
                    "planId": plan_id,
                    "constraintType": constraint_type,
                    "materialId": material_id
                })),
                &["get_risk"],
            )
            .await
    }

    // ─── Operation log ───

    pub async fn operation_logs(
        &self,
        filter: Option<&OperationLogFilter>,
    ) -> Result<Vec<OperationLogEntry>, CommandError> {
        self.client
            .read("get_operation_logs", Some(json!({ "filter": filter })), ttl::SHORT)
            .await
    }

    pub async fn operation_log_estimate(
        &self,
        filter: Option<&OperationLogFilter>,
        cap: Option<i64>,
    ) -> Result<OperationLogEstimate, CommandError> {
        self.client
            .read(
                "get_operation_log_estimate",
                Some(json!({ "filter": filter, "cap": cap })),
                ttl::SHORT,
            )
            .await
    }

    pub async fn cleanup_estimate(
        &self,
        older_than_days: Option<i64>,
    ) -> Result<CleanupEstimate, CommandError> {
        self.client
            .read(
                "get_cleanup_estimate",
                Some(json!({ "olderThanDays": older_than_days })),
                ttl::SHORT,
            )
            .await
    }

    pub async fn clear_logs(&self, keep_days: Option<i64>) -> Result<i64, CommandError> {
        self.client
            .mutate("clear_logs", Some(json!({ "keepDays": keep_days })))
            .await
    }

    // ─── Export templates ───

    pub async fn export_templates(&self) -> Result<Vec<ExportTemplate>, CommandError> {
        self.client.read("get_export_templates", None, ttl::LONG).await
    }

    /// Template changes cannot affect plan or material reads, so only the
    /// template list is invalidated.
    pub async fn create_export_template(
        &self,
        input: &CreateExportTemplateInput,
    ) -> Result<ExportTemplate, CommandError> {
        self.client
            .mutate_invalidating(
                "create_export_template",
                Some(json!({ "input": input })),
                &["get_export_templates"],
            )
            .await
    }

    pub async fn update_export_template(
        &self,
        id: i64,
        input: &UpdateExportTemplateInput,
    ) -> Result<ExportTemplate, CommandError> {
        self.client
            .mutate_invalidating(
                "update_export_template",
                Some(json!({ "id": id, "input": input })),
                &["get_export_templates"],
            )
            .await
    }

    pub async fn delete_export_template(&self, id: i64) -> Result<(), CommandError> {
        self.client
            .mutate_invalidating(
                "delete_export_template",
                Some(json!({ "id": id })),
                &["get_export_templates"],
            )
            .await
    }

    // ─── Stats and backups ───

    pub async fn material_stats(&self) -> Result<MaterialStats, CommandError> {
        self.client.read("get_material_stats", None, ttl::NORMAL).await
    }

    pub async fn backups(&self) -> Result<Vec<BackupFileInfo>, CommandError> {
        self.client.read("get_backups", None, ttl::LONG).await
    }

    pub async fn backup_database(&self) -> Result<BackupFileInfo, CommandError> {
        self.client.mutate("backup_database", None).await
    }

    pub async fn restore_database(&self, file_path: &str) -> Result<(), CommandError> {
        self.client
            .mutate("restore_database", Some(json!({ "filePath": file_path })))
            .await
    }

    pub async fn delete_backup(&self, file_path: &str) -> Result<(), CommandError> {
        self.client
            .mutate("delete_backup", Some(json!({ "filePath": file_path })))
            .await
    }
}
