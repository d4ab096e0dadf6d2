//! Material pool commands.

use serde_json::json;

use spm_invoke::CommandGateway;

use crate::types::{ImportBatch, Material, MaterialFilter, PagedResult, Pagination};
use crate::{ttl, CommandError, SpmClient};

pub struct MaterialApi<'a, G> {
    pub(crate) client: &'a SpmClient<G>,
}

impl<G: CommandGateway> MaterialApi<'_, G> {
    /// Paged queries are too volatile to cache, but identical concurrent
    /// queries (several widgets on one screen) still coalesce.
    pub async fn materials(
        &self,
        filter: Option<&MaterialFilter>,
        pagination: Option<&Pagination>,
    ) -> Result<PagedResult<Material>, CommandError> {
        self.client
            .read(
                "get_materials",
                Some(json!({ "filter": filter, "pagination": pagination })),
                ttl::NONE,
            )
            .await
    }

    pub async fn update_status(&self, ids: &[i64], status: &str) -> Result<i64, CommandError> {
        self.client
            .mutate(
                "update_material_status",
                Some(json!({ "ids": ids, "status": status })),
            )
            .await
    }

    pub async fn update_priority(&self, ids: &[i64], priority: i64) -> Result<i64, CommandError> {
        self.client
            .mutate(
                "update_material_priority",
                Some(json!({ "ids": ids, "priority": priority })),
            )
            .await
    }

    pub async fn delete(&self, ids: &[i64]) -> Result<i64, CommandError> {
        self.client
            .mutate("delete_materials", Some(json!({ "ids": ids })))
            .await
    }

    pub async fn import_batches(&self) -> Result<Vec<ImportBatch>, CommandError> {
        self.client.read("get_import_batches", None, ttl::SHORT).await
    }

    pub async fn delete_import_batch(&self, batch_id: i64) -> Result<(), CommandError> {
        self.client
            .mutate("delete_import_batch", Some(json!({ "batchId": batch_id })))
            .await
    }
}
