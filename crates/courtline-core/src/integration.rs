//! Simulated integrations with external case-management systems
//!
//! No remote system is ever contacted. Each run pauses like a round-trip
//! (when `simulate_latency` is on), fabricates a record count, prepends an
//! [`IntegrationLog`] and writes an audit entry.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Number, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{log_audit, AuditEntry};
use crate::models::{
    AuditAction, ConnectionStatus, EntityType, FieldMapping, IntegrationAction, IntegrationConfig,
    IntegrationLog, RunStatus, Severity,
};
use crate::store::Store;
use crate::validation::parse_datetime;

const CONNECTION_TEST_DELAY: Duration = Duration::from_millis(1000);
const SYNC_DELAY: Duration = Duration::from_millis(2000);

/// Copy mapped fields present in `source`, applying each mapping's
/// transformation. Fields without a mapping are dropped.
pub fn map_fields(source: &Map<String, Value>, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut mapped = Map::new();
    for mapping in mappings {
        if let Some(value) = source.get(&mapping.source_field) {
            mapped.insert(
                mapping.target_field.clone(),
                apply_transformation(value, mapping.transformation.as_deref()),
            );
        }
    }
    mapped
}

/// Transform one value. Unknown transformations leave it unchanged.
pub fn apply_transformation(value: &Value, transformation: Option<&str>) -> Value {
    match transformation {
        Some("uppercase") => Value::String(text_of(value).to_uppercase()),
        Some("lowercase") => Value::String(text_of(value).to_lowercase()),
        Some("trim") => Value::String(text_of(value).trim().to_string()),
        Some("date") => parse_datetime(&text_of(value))
            .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .unwrap_or_else(|| value.clone()),
        Some("number") => to_number(value),
        Some("boolean") => Value::Bool(truthy(value)),
        _ => value.clone(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric conversion; values that are not numbers become null
fn to_number(value: &Value) -> Value {
    let n = match value {
        Value::Number(n) => return Value::Number(n.clone()),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return Value::Null,
        },
        _ => return Value::Null,
    };
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether an auto-sync integration is due at `now`
pub fn is_sync_due(config: &IntegrationConfig, now: DateTime<Utc>) -> bool {
    if !config.enabled || !config.auto_sync {
        return false;
    }
    match config.last_sync {
        None => true,
        Some(last) => now - last >= chrono::Duration::minutes(config.sync_interval as i64),
    }
}

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub integration: IntegrationConfig,
    pub log: IntegrationLog,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.log.status == RunStatus::Success
    }
}

/// Runs simulated integration operations
pub struct Simulator {
    rng: StdRng,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic record counts, for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Connection test: succeeds exactly when endpoint and API key are set.
    /// Updates the integration's status accordingly.
    pub async fn test_connection(&mut self, store: &mut Store, id: Uuid) -> Result<RunOutcome> {
        let integration = load(store, id)?;
        pause(store, CONNECTION_TEST_DELAY).await;

        let ok = integration.has_credentials();
        let (status, error, message) = if ok {
            (ConnectionStatus::Connected, None, "Connection successful")
        } else {
            (
                ConnectionStatus::Error,
                Some("Missing credentials".to_string()),
                "Missing credentials",
            )
        };

        let integration = store
            .modify(id, |i: &mut IntegrationConfig| {
                i.status = status;
                i.error_message = error;
            })?
            .ok_or_else(|| anyhow!("Integration {} disappeared", id))?;

        let run_status = if ok { RunStatus::Success } else { RunStatus::Failure };
        self.finish(store, integration, IntegrationAction::Test, run_status, 0, message)
    }

    /// Sync 10..=109 records and stamp `lastSync`
    pub async fn sync(&mut self, store: &mut Store, id: Uuid) -> Result<RunOutcome> {
        let integration = load(store, id)?;
        if let Some(outcome) = self.refuse_disabled(store, &integration, IntegrationAction::Sync)? {
            return Ok(outcome);
        }
        pause(store, SYNC_DELAY).await;

        let records = self.rng.gen_range(10..=109);
        let integration = store
            .modify(id, |i: &mut IntegrationConfig| {
                i.last_sync = Some(Utc::now());
                i.status = ConnectionStatus::Connected;
                i.error_message = None;
            })?
            .ok_or_else(|| anyhow!("Integration {} disappeared", id))?;

        let message = format!("Successfully synced with {}", integration.name);
        self.finish(store, integration, IntegrationAction::Sync, RunStatus::Success, records, message)
    }

    /// Import 1..=75 records
    pub async fn import(&mut self, store: &mut Store, id: Uuid) -> Result<RunOutcome> {
        let integration = load(store, id)?;
        if let Some(outcome) = self.refuse_disabled(store, &integration, IntegrationAction::Import)? {
            return Ok(outcome);
        }
        let records = self.rng.gen_range(1..=75);
        let message = format!("Data imported from {}", integration.name);
        self.finish(store, integration, IntegrationAction::Import, RunStatus::Success, records, message)
    }

    /// Export 1..=50 records
    pub async fn export(&mut self, store: &mut Store, id: Uuid) -> Result<RunOutcome> {
        let integration = load(store, id)?;
        if let Some(outcome) = self.refuse_disabled(store, &integration, IntegrationAction::Export)? {
            return Ok(outcome);
        }
        let records = self.rng.gen_range(1..=50);
        let message = format!("Data exported to {}", integration.name);
        self.finish(store, integration, IntegrationAction::Export, RunStatus::Success, records, message)
    }

    /// Sync every enabled auto-sync integration whose interval has elapsed
    pub async fn sync_due(&mut self, store: &mut Store, now: DateTime<Utc>) -> Result<Vec<RunOutcome>> {
        let due: Vec<Uuid> = store
            .get_all::<IntegrationConfig>()?
            .into_iter()
            .filter(|i| is_sync_due(i, now))
            .map(|i| i.id)
            .collect();

        let mut outcomes = Vec::with_capacity(due.len());
        for id in due {
            outcomes.push(self.sync(store, id).await?);
        }
        Ok(outcomes)
    }

    fn refuse_disabled(
        &mut self,
        store: &mut Store,
        integration: &IntegrationConfig,
        action: IntegrationAction,
    ) -> Result<Option<RunOutcome>> {
        if integration.enabled {
            return Ok(None);
        }
        warn!("Skipping {} for disabled integration {}", action, integration.name);
        let message = format!("{} is disabled", integration.name);
        self.finish(store, integration.clone(), action, RunStatus::Failure, 0, message)
            .map(Some)
    }

    fn finish(
        &mut self,
        store: &mut Store,
        integration: IntegrationConfig,
        action: IntegrationAction,
        status: RunStatus,
        records: u32,
        message: impl Into<String>,
    ) -> Result<RunOutcome> {
        let log = store.prepend(IntegrationLog::new(&integration, action, status, records, message))?;
        info!(
            "{} {} for {}: {} record(s), {}",
            action, status, integration.name, records, log.message
        );

        let audit_action = match action {
            IntegrationAction::Export => AuditAction::Export,
            IntegrationAction::Import => AuditAction::Create,
            IntegrationAction::Sync | IntegrationAction::Test => AuditAction::Update,
        };
        let severity = match status {
            RunStatus::Success => Severity::Info,
            RunStatus::Failure => Severity::Warning,
        };
        log_audit(
            store,
            AuditEntry::new(
                audit_action,
                EntityType::Setting,
                integration.id,
                format!(
                    "{} {} ({}): {}",
                    integration.integration_type.label(),
                    action.label().to_lowercase(),
                    records,
                    log.message
                ),
            )
            .with_severity(severity),
        )?;

        Ok(RunOutcome { integration, log })
    }
}

fn load(store: &Store, id: Uuid) -> Result<IntegrationConfig> {
    store
        .get_by_id(id)?
        .ok_or_else(|| anyhow!("Integration not found: {}", id))
}

async fn pause(store: &Store, delay: Duration) {
    if store.config().simulate_latency {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditLog, IntegrationType};
    use serde_json::json;

    fn add_integration(store: &mut Store, configure: impl FnOnce(&mut IntegrationConfig)) -> Uuid {
        let mut config = IntegrationConfig::new(IntegrationType::Dex, "State DEX");
        configure(&mut config);
        store.add(config).unwrap().id
    }

    fn credentials(i: &mut IntegrationConfig) {
        i.enabled = true;
        i.endpoint = Some("https://dex.example.gov/api".to_string());
        i.api_key = Some("secret".to_string());
    }

    #[test]
    fn test_map_fields() {
        let source = json!({
            "case_no": " jv-1 ",
            "name": "Maria",
            "filed": "2025-03-01",
            "count": "42",
            "flag": "",
            "ignored": true
        });
        let mappings = vec![
            FieldMapping::new("case_no", "docketNumber").with_transformation("trim"),
            FieldMapping::new("name", "firstName").with_transformation("uppercase"),
            FieldMapping::new("filed", "filingDate").with_transformation("date"),
            FieldMapping::new("count", "total").with_transformation("number"),
            FieldMapping::new("flag", "active").with_transformation("boolean"),
            FieldMapping::new("missing", "nowhere"),
        ];

        let mapped = map_fields(source.as_object().unwrap(), &mappings);
        assert_eq!(
            Value::Object(mapped),
            json!({
                "docketNumber": "jv-1",
                "firstName": "MARIA",
                "filingDate": "2025-03-01T00:00:00.000Z",
                "total": 42,
                "active": false
            })
        );
    }

    #[test]
    fn test_transformations() {
        assert_eq!(apply_transformation(&json!("AbC"), Some("lowercase")), json!("abc"));
        assert_eq!(apply_transformation(&json!(12), Some("uppercase")), json!("12"));
        assert_eq!(apply_transformation(&json!("1.5"), Some("number")), json!(1.5));
        assert_eq!(apply_transformation(&json!("abc"), Some("number")), Value::Null);
        assert_eq!(apply_transformation(&json!(true), Some("number")), json!(1));
        assert_eq!(apply_transformation(&json!(0), Some("boolean")), json!(false));
        assert_eq!(apply_transformation(&json!("no"), Some("boolean")), json!(true));
        assert_eq!(apply_transformation(&json!("x"), Some("reverse")), json!("x"));
        assert_eq!(apply_transformation(&json!("x"), None), json!("x"));
        assert_eq!(apply_transformation(&json!("soon"), Some("date")), json!("soon"));
    }

    #[test]
    fn test_is_sync_due() {
        let now = Utc::now();
        let mut config = IntegrationConfig::new(IntegrationType::Cpcms, "CPCMS");
        config.sync_interval = 30;
        assert!(!is_sync_due(&config, now));

        config.enabled = true;
        config.auto_sync = true;
        assert!(is_sync_due(&config, now));

        config.last_sync = Some(now - chrono::Duration::minutes(10));
        assert!(!is_sync_due(&config, now));

        config.last_sync = Some(now - chrono::Duration::minutes(30));
        assert!(is_sync_due(&config, now));
    }

    #[tokio::test]
    async fn test_connection_requires_credentials() {
        let mut store = Store::in_memory();
        let mut sim = Simulator::seeded(7);

        let id = add_integration(&mut store, |_| {});
        let outcome = sim.test_connection(&mut store, id).await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.integration.status, ConnectionStatus::Error);
        assert_eq!(outcome.integration.error_message.as_deref(), Some("Missing credentials"));

        let id = add_integration(&mut store, credentials);
        let outcome = sim.test_connection(&mut store, id).await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.integration.status, ConnectionStatus::Connected);
        assert_eq!(outcome.log.action, IntegrationAction::Test);
    }

    #[tokio::test]
    async fn test_sync_records_and_logs() {
        let mut store = Store::in_memory();
        let mut sim = Simulator::seeded(42);
        let id = add_integration(&mut store, credentials);

        let outcome = sim.sync(&mut store, id).await.unwrap();
        assert!(outcome.succeeded());
        assert!((10..=109).contains(&outcome.log.records_processed));
        assert!(outcome.integration.last_sync.is_some());

        let stored: IntegrationConfig = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(stored.last_sync, outcome.integration.last_sync);

        let audits: Vec<AuditLog> = store.get_all().unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].entity_id, id.to_string());
    }

    #[tokio::test]
    async fn test_runs_are_logged_newest_first() {
        let mut store = Store::in_memory();
        let mut sim = Simulator::seeded(1);
        let id = add_integration(&mut store, credentials);

        let import = sim.import(&mut store, id).await.unwrap();
        let export = sim.export(&mut store, id).await.unwrap();
        assert!((1..=75).contains(&import.log.records_processed));
        assert!((1..=50).contains(&export.log.records_processed));

        let logs: Vec<IntegrationLog> = store.get_all().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, IntegrationAction::Export);
        assert_eq!(logs[1].action, IntegrationAction::Import);
    }

    #[tokio::test]
    async fn test_seeded_runs_are_deterministic() {
        let mut a = Store::in_memory();
        let mut b = Store::in_memory();
        let id_a = add_integration(&mut a, credentials);
        let id_b = add_integration(&mut b, credentials);

        let ra = Simulator::seeded(99).sync(&mut a, id_a).await.unwrap();
        let rb = Simulator::seeded(99).sync(&mut b, id_b).await.unwrap();
        assert_eq!(ra.log.records_processed, rb.log.records_processed);
    }

    #[tokio::test]
    async fn test_disabled_integration_is_refused() {
        let mut store = Store::in_memory();
        let mut sim = Simulator::seeded(3);
        let id = add_integration(&mut store, |i| {
            credentials(i);
            i.enabled = false;
        });

        let outcome = sim.sync(&mut store, id).await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.log.records_processed, 0);
        let stored: IntegrationConfig = store.get_by_id(id).unwrap().unwrap();
        assert!(stored.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_sync_due_only_runs_due_integrations() {
        let mut store = Store::in_memory();
        let mut sim = Simulator::seeded(5);
        add_integration(&mut store, |i| {
            credentials(i);
            i.auto_sync = true;
        });
        add_integration(&mut store, credentials);

        let outcomes = sim.sync_due(&mut store, Utc::now()).await.unwrap();
        assert_eq!(outcomes.len(), 1);

        let again = sim.sync_due(&mut store, Utc::now()).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_integration_errors() {
        let mut store = Store::in_memory();
        let err = Simulator::seeded(0)
            .sync(&mut store, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Integration not found"));
    }
}
