//! Action (prompt template) persistence and JSON import/export.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::types::{Action, ActionMode, RenderingFormat};
use tutor_core::{Error, Result};

/// Fields of an action under the caller's control; ids and timestamps are
/// store-assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub role_prompt: String,
    #[serde(default)]
    pub command_prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output_rendering_format: RenderingFormat,
    #[serde(default)]
    pub mode: ActionMode,
}

/// Import payloads come in two shapes: a bare array of actions, or the
/// array wrapped in an `actions` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionsDocument {
    Bare(Vec<Action>),
    Wrapped { actions: Vec<Action> },
}

/// Parse an import document. `Validation` error on malformed JSON.
pub fn parse_actions_json(json: &str) -> Result<Vec<Action>> {
    let doc: ActionsDocument = serde_json::from_str(json)
        .map_err(|e| Error::Validation(format!("Malformed actions JSON: {e}")))?;
    Ok(match doc {
        ActionsDocument::Bare(actions) => actions,
        ActionsDocument::Wrapped { actions } => actions,
    })
}

/// Export always writes the bare-array form.
pub fn export_actions_json(actions: &[Action]) -> Result<String> {
    Ok(serde_json::to_string_pretty(actions)?)
}

/// Store for actions.
pub struct ActionStore {
    conn: Mutex<Connection>,
}

impl ActionStore {
    /// Open or create the store in `db_dir/tutor.db` (shared with the
    /// word store; WAL mode keeps the two connections cooperative).
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("tutor.db");

        let conn = Connection::open(&db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an action. Returns the new ID.
    pub fn create(&self, input: &ActionInput) -> Result<i64> {
        let now = Utc::now().timestamp_millis();
        let groups_json = serde_json::to_string(&input.groups)?;
        let format = format_str(input.output_rendering_format);

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO actions
                 (name, icon, groups_json, role_prompt, command_prompt, model,
                  output_rendering_format, mode, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            )
            .map_err(db_err)?
            .insert(params![
                input.name,
                input.icon,
                groups_json,
                input.role_prompt,
                input.command_prompt,
                input.model,
                format,
                input.mode.as_str(),
                now,
            ])
            .map_err(db_err)?;
        Ok(id)
    }

    /// Replace the caller-controlled fields of an action.
    pub fn update(&self, id: i64, input: &ActionInput) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let groups_json = serde_json::to_string(&input.groups)?;
        let format = format_str(input.output_rendering_format);

        let conn = self.conn.lock();
        let count = conn
            .prepare_cached(
                "UPDATE actions SET name = ?1, icon = ?2, groups_json = ?3,
                 role_prompt = ?4, command_prompt = ?5, model = ?6,
                 output_rendering_format = ?7, mode = ?8, updated_at = ?9
                 WHERE id = ?10",
            )
            .map_err(db_err)?
            .execute(params![
                input.name,
                input.icon,
                groups_json,
                input.role_prompt,
                input.command_prompt,
                input.model,
                format,
                input.mode.as_str(),
                now,
                id,
            ])
            .map_err(db_err)?;
        if count == 0 {
            return Err(Error::NotFound(format!("action {id}")));
        }
        Ok(())
    }

    /// Fetch one action by ID.
    pub fn get(&self, id: i64) -> Result<Action> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(&format!("{SELECT_ACTION} WHERE id = ?1"))
            .map_err(db_err)?
            .query_row(params![id], row_to_action)
            .optional()
            .map_err(db_err)?;
        row.ok_or_else(|| Error::NotFound(format!("action {id}")))
    }

    /// Fetch one action by name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<Action>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(&format!("{SELECT_ACTION} WHERE name = ?1"))
            .map_err(db_err)?
            .query_row(params![name], row_to_action)
            .optional()
            .map_err(db_err);
        row
    }

    /// All actions, in creation order.
    pub fn list(&self) -> Result<Vec<Action>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!("{SELECT_ACTION} ORDER BY id"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], row_to_action)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Delete an action. Answers stored under its name are left alone.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM actions WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Import actions from a JSON document (bare array or wrapped form),
    /// upserting by name. Returns how many actions were written.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let actions = parse_actions_json(json)?;
        if actions.is_empty() {
            return Err(Error::Validation("No actions to import".into()));
        }

        for action in &actions {
            let input = ActionInput {
                name: action.name.clone(),
                icon: action.icon.clone(),
                groups: action.groups.clone(),
                role_prompt: action.role_prompt.clone(),
                command_prompt: action.command_prompt.clone(),
                model: action.model.clone(),
                output_rendering_format: action.output_rendering_format,
                mode: action.mode,
            };
            match self.get_by_name(&action.name)? {
                Some(existing) => self.update(existing.id, &input)?,
                None => {
                    self.create(&input)?;
                }
            }
        }

        info!("Imported {} actions", actions.len());
        Ok(actions.len())
    }

    /// Export all actions (optionally one group) as a bare JSON array.
    pub fn export_json(&self, group: Option<&str>) -> Result<String> {
        let mut actions = self.list()?;
        if let Some(group) = group {
            actions.retain(|a| a.groups.iter().any(|g| g == group));
        }
        export_actions_json(&actions)
    }
}

const SELECT_ACTION: &str = "SELECT id, name, icon, groups_json, role_prompt, command_prompt, \
     model, output_rendering_format, mode, created_at, updated_at FROM actions";

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn format_str(format: RenderingFormat) -> &'static str {
    match format {
        RenderingFormat::Text => "text",
        RenderingFormat::Markdown => "markdown",
        RenderingFormat::Latex => "latex",
    }
}

fn row_to_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<Action> {
    let groups_json: String = row.get(3)?;
    let format: String = row.get(7)?;
    let mode: String = row.get(8)?;
    Ok(Action {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        groups: serde_json::from_str(&groups_json).unwrap_or_default(),
        role_prompt: row.get(4)?,
        command_prompt: row.get(5)?,
        model: row.get(6)?,
        output_rendering_format: match format.as_str() {
            "text" => RenderingFormat::Text,
            "latex" => RenderingFormat::Latex,
            _ => RenderingFormat::Markdown,
        },
        mode: ActionMode::from_str(&mode).unwrap_or_default(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
