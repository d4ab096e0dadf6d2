//! System and priority configuration commands.

use serde_json::json;

use spm_invoke::CommandGateway;

use crate::types::{PriorityWeightConfig, PriorityWeightUpsertInput, ShiftConfig, SystemConfig};
use crate::{ttl, CommandError, SpmClient};

pub struct ConfigApi<'a, G> {
    pub(crate) client: &'a SpmClient<G>,
}

impl<G: CommandGateway> ConfigApi<'_, G> {
    pub async fn system_config(&self) -> Result<SystemConfig, CommandError> {
        self.client.read("get_system_config", None, ttl::NORMAL).await
    }

    /// Config groups feed scheduling and risk evaluation, so a config write
    /// clears the whole cache rather than guessing at the blast radius.
    pub async fn update_system_config(
        &self,
        group: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CommandError> {
        self.client
            .mutate(
                "update_system_config",
                Some(json!({ "group": group, "key": key, "value": value })),
            )
            .await
    }

    pub async fn shift_config(&self) -> Result<Vec<ShiftConfig>, CommandError> {
        self.client.read("get_shift_config", None, ttl::NORMAL).await
    }

    pub async fn update_shift_config(&self, shifts: &[ShiftConfig]) -> Result<(), CommandError> {
        self.client
            .mutate("update_shift_config", Some(json!({ "shifts": shifts })))
            .await
    }

    pub async fn priority_weight_configs(&self) -> Result<Vec<PriorityWeightConfig>, CommandError> {
        self.client
            .read("get_priority_weight_configs", None, ttl::NORMAL)
            .await
    }

    pub async fn upsert_priority_weight_configs(
        &self,
        inputs: &[PriorityWeightUpsertInput],
    ) -> Result<Vec<PriorityWeightConfig>, CommandError> {
        self.client
            .mutate(
                "upsert_priority_weight_configs",
                Some(json!({ "inputs": inputs })),
            )
            .await
    }
}
