use rusqlite::params;
use tracing::debug;

use crate::data::Gateway;
use crate::error::{Result, StoreError};

const SELECT_PLUG: &str = "SELECT plug_id FROM plug WHERE plug_name = ?1;";
const INSERT_PLUG: &str = "INSERT INTO plug (plug_name) VALUES (?1);";

/// Returns the id registered for `name`, registering the plug on first use.
///
/// Lookup and insert are two statements; they are only race free because the
/// caller runs them inside a single queued operation.
pub fn resolve(gateway: &Gateway, name: &str) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidPlugName);
    }

    let existing: Vec<i64> = gateway.query(SELECT_PLUG, params![name], |row| row.get(0))?;

    if let Some(plug_id) = existing.first() {
        return Ok(*plug_id);
    }

    let plug_id = gateway.insert(INSERT_PLUG, params![name])?;
    debug!("Registered plug {} with id {}", name, plug_id);

    Ok(plug_id)
}
