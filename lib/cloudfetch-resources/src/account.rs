use std::sync::LazyLock;

use cloudfetch_core::{Schema, SchemaValidator, SecureString, Transport};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, CloudApi, resource};

/// Costs of the account for the running month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCosts {
    /// Total so far, in the account currency.
    pub current_month_total_cost: f64,
}

/// The team owning the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Tenant id, also part of the MQTT topic prefix.
    pub tenant_id: String,
    /// Team name.
    pub name: String,
}

/// Where and as whom devices of the account talk MQTT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// MQTT broker host name.
    pub mqtt_endpoint: String,
    /// Prefix of every MQTT topic of the account, ends with `/`.
    pub mqtt_topic_prefix: String,
    /// The owning team.
    pub team: Team,
}

#[derive(Debug, Deserialize)]
struct ServiceToken {
    token: SecureString,
}

#[derive(Debug, Deserialize)]
struct Account {
    plan: MonthlyCosts,
}

static SERVICE_TOKEN: LazyLock<Schema> =
    LazyLock::new(|| Schema::object().required("token", Schema::string()).into());

static ACCOUNT_INFO: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required("mqttEndpoint", Schema::string().min_length(1))
        .required("mqttTopicPrefix", Schema::string().min_length(1))
        .required(
            "team",
            Schema::object()
                .required("tenantId", Schema::string().min_length(1))
                .required("name", Schema::string()),
        )
        .into()
});

static ACCOUNT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object()
        .required(
            "plan",
            Schema::object().required("currentMonthTotalCost", Schema::number()),
        )
        .into()
});

impl<T, V> CloudApi<T, V>
where
    T: Transport,
    V: SchemaValidator,
{
    /// Fetches the service token of the account, used by devices to call location services.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer carries no token.
    pub async fn service_token(&self) -> Result<SecureString, ApiError> {
        let result: ServiceToken = self
            .client
            .fetch(&resource("account/service-token")?, &SERVICE_TOKEN)
            .await?;
        Ok(result.token)
    }

    /// Fetches the MQTT settings and the team of the account.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer lacks one of these fields.
    pub async fn account_info(&self) -> Result<AccountInfo, ApiError> {
        let info: AccountInfo = self.client.fetch(&resource("account")?, &ACCOUNT_INFO).await?;
        debug!(tenant_id = %info.team.tenant_id, "account info fetched");
        Ok(info)
    }

    /// Fetches the costs of the running month.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the answer carries no cost.
    pub async fn current_monthly_costs(&self) -> Result<MonthlyCosts, ApiError> {
        let account: Account = self.client.fetch(&resource("account")?, &ACCOUNT).await?;
        Ok(account.plan)
    }
}
