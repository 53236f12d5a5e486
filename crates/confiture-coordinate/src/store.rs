//! Durable registry of `Intent` records (spec §4.8).

use crate::conflict::find_conflicts;
use crate::model::{Intent, IntentState, ObjectRef, OperationClass};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio_postgres::Client;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("intent {0} not found")]
    NotFound(Uuid),
    #[error("illegal transition for intent {intent_id}: {from:?} -> {to:?}")]
    IllegalTransition {
        intent_id: Uuid,
        from: IntentState,
        to: IntentState,
    },
    #[error("intent {intent_id} is owned by {owner}, not {actor}")]
    NotOwner {
        intent_id: Uuid,
        owner: String,
        actor: String,
    },
}

pub type Result<T> = std::result::Result<T, CoordinateError>;

pub const CREATE_REGISTRY_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tb_confiture_intent (
    intent_id UUID PRIMARY KEY,
    agent_id TEXT NOT NULL,
    workspace_tag TEXT NOT NULL,
    objects JSONB NOT NULL,
    operation_class TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    last_touched_at TIMESTAMPTZ NOT NULL
)
"#;

pub struct CoordinationRegistry<'a> {
    client: &'a Client,
}

impl<'a> CoordinationRegistry<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.client.batch_execute(CREATE_REGISTRY_TABLE_SQL).await?;
        Ok(())
    }

    /// Creates an intent in `Registered` and runs a conflict check against
    /// all other live intents. The intent is recorded even when conflicts
    /// are found — `register` never refuses a registration, it only
    /// reports (spec §4.8).
    pub async fn register(
        &self,
        agent_id: &str,
        workspace_tag: &str,
        objects: Vec<ObjectRef>,
        operation_class: OperationClass,
    ) -> Result<(Intent, Vec<(Intent, ObjectRef)>)> {
        let now = Utc::now();
        let intent = Intent {
            intent_id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            workspace_tag: workspace_tag.to_string(),
            objects,
            operation_class,
            state: IntentState::Registered,
            created_at: now,
            last_touched_at: now,
        };

        let live = self.live_intents().await?;
        let conflicts: Vec<(Intent, ObjectRef)> = find_conflicts(&intent, &live)
            .into_iter()
            .map(|(other, obj)| (other.clone(), obj))
            .collect();

        self.insert(&intent).await?;
        Ok((intent, conflicts))
    }

    /// Non-destructive conflict probe: builds a throwaway candidate intent
    /// and checks it against the live set without persisting anything
    /// (spec §4.8 `check`).
    pub async fn check(
        &self,
        agent_id: &str,
        objects: Vec<ObjectRef>,
        operation_class: OperationClass,
    ) -> Result<Vec<(Intent, ObjectRef)>> {
        let now = Utc::now();
        let candidate = Intent {
            intent_id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            workspace_tag: String::new(),
            objects,
            operation_class,
            state: IntentState::Registered,
            created_at: now,
            last_touched_at: now,
        };
        let live = self.live_intents().await?;
        Ok(find_conflicts(&candidate, &live)
            .into_iter()
            .map(|(other, obj)| (other.clone(), obj))
            .collect())
    }

    pub async fn transition(&self, intent_id: Uuid, new_state: IntentState) -> Result<Intent> {
        let mut intent = self.get(intent_id).await?;
        if !intent.state.can_transition_to(new_state) {
            return Err(CoordinateError::IllegalTransition {
                intent_id,
                from: intent.state,
                to: new_state,
            });
        }
        intent.state = new_state;
        intent.last_touched_at = Utc::now();
        self.update(&intent).await?;
        Ok(intent)
    }

    pub async fn list(&self, only_live: bool) -> Result<Vec<Intent>> {
        if only_live {
            self.live_intents().await
        } else {
            self.all_intents().await
        }
    }

    /// All pairwise conflicts among currently live intents (spec §4.8
    /// `conflicts()`).
    pub async fn conflicts(&self) -> Result<Vec<(Intent, Intent, ObjectRef)>> {
        let live = self.live_intents().await?;
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for candidate in &live {
            for (other, obj) in find_conflicts(candidate, &live) {
                let key = if candidate.intent_id < other.intent_id {
                    (candidate.intent_id, other.intent_id)
                } else {
                    (other.intent_id, candidate.intent_id)
                };
                if seen.insert((key, obj.clone())) {
                    result.push((candidate.clone(), other.clone(), obj));
                }
            }
        }
        Ok(result)
    }

    /// Transitions every live intent whose `last_touched_at` is older than
    /// `ttl` to `Abandoned`. Best-effort: a failure on one intent does not
    /// stop the sweep over the rest (spec §4.8 staleness policy).
    pub async fn sweep_stale(&self, ttl: Duration) -> Result<Vec<Uuid>> {
        let cutoff = Utc::now() - ttl;
        let live = self.live_intents().await?;
        let mut swept = Vec::new();
        for intent in live.into_iter().filter(|i| i.last_touched_at < cutoff) {
            if self.transition(intent.intent_id, IntentState::Abandoned).await.is_ok() {
                swept.push(intent.intent_id);
            }
        }
        Ok(swept)
    }

    async fn get(&self, intent_id: Uuid) -> Result<Intent> {
        let row = self
            .client
            .query_opt(
                "SELECT intent_id, agent_id, workspace_tag, objects, operation_class, state, \
                 created_at, last_touched_at FROM tb_confiture_intent WHERE intent_id = $1",
                &[&intent_id],
            )
            .await?
            .ok_or(CoordinateError::NotFound(intent_id))?;
        Ok(row_to_intent(&row))
    }

    async fn live_intents(&self) -> Result<Vec<Intent>> {
        let rows = self
            .client
            .query(
                "SELECT intent_id, agent_id, workspace_tag, objects, operation_class, state, \
                 created_at, last_touched_at FROM tb_confiture_intent \
                 WHERE state IN ('registered', 'in_progress')",
                &[],
            )
            .await?;
        Ok(rows.iter().map(row_to_intent).collect())
    }

    async fn all_intents(&self) -> Result<Vec<Intent>> {
        let rows = self
            .client
            .query(
                "SELECT intent_id, agent_id, workspace_tag, objects, operation_class, state, \
                 created_at, last_touched_at FROM tb_confiture_intent ORDER BY created_at",
                &[],
            )
            .await?;
        Ok(rows.iter().map(row_to_intent).collect())
    }

    async fn insert(&self, intent: &Intent) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO tb_confiture_intent (intent_id, agent_id, workspace_tag, objects, \
                 operation_class, state, created_at, last_touched_at) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
                &[
                    &intent.intent_id,
                    &intent.agent_id,
                    &intent.workspace_tag,
                    &serde_json::to_value(&intent.objects).expect("objects always serialisable"),
                    &operation_class_str(intent.operation_class),
                    &state_str(intent.state),
                    &intent.created_at,
                    &intent.last_touched_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn update(&self, intent: &Intent) -> Result<()> {
        self.client
            .execute(
                "UPDATE tb_confiture_intent SET state = $2, last_touched_at = $3 WHERE intent_id = $1",
                &[&intent.intent_id, &state_str(intent.state), &intent.last_touched_at],
            )
            .await?;
        Ok(())
    }
}

fn operation_class_str(class: OperationClass) -> &'static str {
    match class {
        OperationClass::AddColumn => "add_column",
        OperationClass::DropColumn => "drop_column",
        OperationClass::AlterColumn => "alter_column",
        OperationClass::AddConstraint => "add_constraint",
        OperationClass::Read => "read",
    }
}

fn parse_operation_class(s: &str) -> OperationClass {
    match s {
        "add_column" => OperationClass::AddColumn,
        "drop_column" => OperationClass::DropColumn,
        "alter_column" => OperationClass::AlterColumn,
        "add_constraint" => OperationClass::AddConstraint,
        _ => OperationClass::Read,
    }
}

fn state_str(state: IntentState) -> &'static str {
    match state {
        IntentState::Registered => "registered",
        IntentState::InProgress => "in_progress",
        IntentState::Completed => "completed",
        IntentState::Abandoned => "abandoned",
    }
}

fn parse_state(s: &str) -> IntentState {
    match s {
        "registered" => IntentState::Registered,
        "in_progress" => IntentState::InProgress,
        "completed" => IntentState::Completed,
        _ => IntentState::Abandoned,
    }
}

fn row_to_intent(row: &tokio_postgres::Row) -> Intent {
    let objects: Value = row.get("objects");
    Intent {
        intent_id: row.get("intent_id"),
        agent_id: row.get("agent_id"),
        workspace_tag: row.get("workspace_tag"),
        objects: serde_json::from_value(objects).unwrap_or_default(),
        operation_class: parse_operation_class(row.get::<_, String>("operation_class").as_str()),
        state: parse_state(row.get::<_, String>("state").as_str()),
        created_at: row.get("created_at"),
        last_touched_at: row.get::<_, DateTime<Utc>>("last_touched_at"),
    }
}
