//! `confiture coordinate {init,register,check,status,complete,abandon,list,conflicts}`
//! (spec §6, §4.8).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_audit::{AuditEntryDraft, AuditSigningKey, AuditStore, OperationKind};
use confiture_coordinate::{CoordinationRegistry, Intent, IntentState, ObjectRef, OperationClass};
use confiture_core::Render;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Parses `schema.table` or `schema.table.column` into an `ObjectRef`
/// (spec §6 `--object` flag format).
pub fn parse_object(raw: &str) -> Result<ObjectRef, CliError> {
    let mut parts = raw.splitn(3, '.');
    let schema = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Usage(format!("invalid object reference: {raw}")))?;
    let table = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Usage(format!("invalid object reference: {raw}")))?;
    Ok(match parts.next() {
        Some(column) if !column.is_empty() => ObjectRef::column(schema, table, column),
        _ => ObjectRef::table(schema, table),
    })
}

pub fn parse_operation_class(raw: &str) -> Result<OperationClass, CliError> {
    match raw {
        "add_column" => Ok(OperationClass::AddColumn),
        "drop_column" => Ok(OperationClass::DropColumn),
        "alter_column" => Ok(OperationClass::AlterColumn),
        "add_constraint" => Ok(OperationClass::AddConstraint),
        "read" => Ok(OperationClass::Read),
        other => Err(CliError::Usage(format!("unknown operation class: {other}"))),
    }
}

fn intent_row(intent: &Intent) -> Vec<String> {
    vec![
        intent.intent_id.to_string(),
        intent.agent_id.clone(),
        format!("{:?}", intent.operation_class),
        format!("{:?}", intent.state),
        intent
            .objects
            .iter()
            .map(|o| match &o.column {
                Some(c) => format!("{}.{}.{}", o.schema, o.table, c),
                None => format!("{}.{}", o.schema, o.table),
            })
            .collect::<Vec<_>>()
            .join(";"),
    ]
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct IntentRender(pub Intent);

impl Render for IntentRender {
    fn schema_name(&self) -> &'static str {
        "confiture.coordinate.intent.v1"
    }

    fn to_text(&self) -> String {
        format!(
            "{} intent {} [{:?}, {:?}]",
            crate::output::success("registered"),
            self.0.intent_id,
            self.0.operation_class,
            self.0.state
        )
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["intent_id".into(), "agent_id".into(), "operation_class".into(), "state".into(), "objects".into()],
            intent_row(&self.0),
        ]
    }
}

#[derive(Serialize)]
pub struct ConflictRender {
    pub conflicts: Vec<(Uuid, Uuid, String)>,
}

impl Render for ConflictRender {
    fn schema_name(&self) -> &'static str {
        "confiture.coordinate.conflicts.v1"
    }

    fn to_text(&self) -> String {
        if self.conflicts.is_empty() {
            return crate::output::success("no conflicts");
        }
        let mut lines = vec![crate::output::warning("conflicts:")];
        for (a, b, obj) in &self.conflicts {
            lines.push(format!("  {a} <-> {b} on {obj}"));
        }
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["a".into(), "b".into(), "object".into()]];
        for (a, b, obj) in &self.conflicts {
            rows.push(vec![a.to_string(), b.to_string(), obj.clone()]);
        }
        rows
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct IntentListRender(pub Vec<Intent>);

impl Render for IntentListRender {
    fn schema_name(&self) -> &'static str {
        "confiture.coordinate.list.v1"
    }

    fn to_text(&self) -> String {
        if self.0.is_empty() {
            return crate::output::muted("no intents");
        }
        self.0
            .iter()
            .map(|i| {
                format!(
                    "  {} {} [{:?}, {:?}]",
                    crate::output::label(&i.agent_id),
                    i.intent_id,
                    i.operation_class,
                    i.state
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["intent_id".into(), "agent_id".into(), "operation_class".into(), "state".into(), "objects".into()]];
        rows.extend(self.0.iter().map(intent_row));
        rows
    }
}

async fn audit_transition(config: &ConfitureConfig, intent: &Intent, kind: OperationKind) -> Result<(), CliError> {
    let Ok(key) = AuditSigningKey::from_env("CONFITURE_AUDIT_KEY") else {
        return Ok(());
    };
    let client = db::connect(&config.connection.env_var).await?;
    let audit = AuditStore::new(&client, &key);
    audit.ensure_schema().await?;
    audit
        .append(AuditEntryDraft {
            actor: intent.agent_id.clone(),
            operation_kind: kind,
            target: intent.intent_id.to_string(),
            policy_hash: None,
            body: json!({ "workspace_tag": intent.workspace_tag }),
        })
        .await?;
    Ok(())
}

pub async fn init(config: &ConfitureConfig) -> Result<(), CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    CoordinationRegistry::new(&client).ensure_schema().await?;
    Ok(())
}

pub async fn register(
    config: &ConfitureConfig,
    agent_id: &str,
    workspace_tag: &str,
    objects: Vec<ObjectRef>,
    operation_class: OperationClass,
) -> Result<IntentRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    let (intent, _conflicts) = registry
        .register(agent_id, workspace_tag, objects, operation_class)
        .await?;
    audit_transition(config, &intent, OperationKind::CoordinationIntentRegistered).await?;
    Ok(IntentRender(intent))
}

pub async fn check(
    config: &ConfitureConfig,
    agent_id: &str,
    objects: Vec<ObjectRef>,
    operation_class: OperationClass,
) -> Result<ConflictRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    let conflicts = registry.check(agent_id, objects, operation_class).await?;
    Ok(ConflictRender {
        conflicts: conflicts
            .into_iter()
            .map(|(other, obj)| {
                (
                    Uuid::nil(),
                    other.intent_id,
                    match &obj.column {
                        Some(c) => format!("{}.{}.{}", obj.schema, obj.table, c),
                        None => format!("{}.{}", obj.schema, obj.table),
                    },
                )
            })
            .collect(),
    })
}

pub async fn status(config: &ConfitureConfig) -> Result<IntentListRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    Ok(IntentListRender(registry.list(true).await?))
}

pub async fn list(config: &ConfitureConfig, only_live: bool) -> Result<IntentListRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    Ok(IntentListRender(registry.list(only_live).await?))
}

pub async fn complete(config: &ConfitureConfig, intent_id: Uuid) -> Result<IntentRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    let intent = registry.transition(intent_id, IntentState::Completed).await?;
    audit_transition(config, &intent, OperationKind::CoordinationIntentCompleted).await?;
    Ok(IntentRender(intent))
}

pub async fn abandon(config: &ConfitureConfig, intent_id: Uuid) -> Result<IntentRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    let intent = registry.transition(intent_id, IntentState::Abandoned).await?;
    audit_transition(config, &intent, OperationKind::CoordinationIntentAbandoned).await?;
    Ok(IntentRender(intent))
}

pub async fn conflicts(config: &ConfitureConfig) -> Result<ConflictRender, CliError> {
    let client = db::connect(&config.connection.env_var).await?;
    let registry = CoordinationRegistry::new(&client);
    let pairs = registry.conflicts().await?;
    Ok(ConflictRender {
        conflicts: pairs
            .into_iter()
            .map(|(a, b, obj)| {
                (
                    a.intent_id,
                    b.intent_id,
                    match &obj.column {
                        Some(c) => format!("{}.{}.{}", obj.schema, obj.table, c),
                        None => format!("{}.{}", obj.schema, obj.table),
                    },
                )
            })
            .collect(),
    })
}
