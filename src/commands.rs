// src/commands.rs

use crate::cli::Section;
use crate::db::BundleStore;
use crate::error::{DropError, Result};
use crate::models::{LogBundle, Payload, SubmitResponse};
use crate::splitter;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Rejects a fetch/remove request that carries no usable key.
pub fn require_key(key: Option<&str>) -> Result<&str> {
    match key.map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k),
        _ => Err(DropError::MissingKey),
    }
}

/// Reads the upload body from `file`, or stdin when there is none.
pub fn read_payload(file: Option<&Path>, json: bool) -> Result<Payload> {
    let bytes = match file {
        Some(path) => fs::read(path).map_err(DropError::UnreadableInput)?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(DropError::UnreadableInput)?;
            buf
        }
    };
    parse_payload(&bytes, json)
}

/// Raw uploads are taken as text, lossily if they are not valid UTF-8.
pub fn parse_payload(bytes: &[u8], json: bool) -> Result<Payload> {
    if json {
        let value = serde_json::from_slice(bytes)?;
        Ok(Payload::Structured(value))
    } else {
        Ok(Payload::Raw(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Splits the payload (when it is raw text) and stores it under a fresh key.
pub fn submit(store: &BundleStore, payload: Payload) -> Result<SubmitResponse> {
    let sections = splitter::normalize(payload);
    let key = store.submit(&sections)?;
    tracing::info!("bundle stored");
    Ok(SubmitResponse { key })
}

/// `Ok(None)` means no live bundle has that key.
pub fn fetch(store: &BundleStore, key: Option<&str>) -> Result<Option<LogBundle>> {
    let key = require_key(key)?;
    store.get(key)
}

pub fn remove(store: &BundleStore, key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    store.delete(key)?;
    tracing::info!("bundle removed");
    Ok(())
}

/// Handles the 'init' command
pub fn handle_init(store: &BundleStore, db_path: &Path) -> Result<()> {
    store.ensure_schema()?;
    println!("✓ Database initialized at: {}", db_path.display());
    Ok(())
}

/// Handles the 'submit' command
pub fn handle_submit(store: &BundleStore, payload: Payload) -> Result<()> {
    let response = submit(store, payload)?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

/// Handles the 'fetch' command
pub fn handle_fetch(store: &BundleStore, key: &str, section: Option<Section>) -> Result<()> {
    let bundle = fetch(store, Some(key))?.ok_or_else(|| DropError::BundleNotFound(key.to_string()))?;

    match section {
        None => println!("{}", serde_json::to_string_pretty(&bundle)?),
        Some(Section::Main) => println!("{}", bundle.main),
        Some(Section::Dmesg) => println!("{}", bundle.dmesg),
        Some(Section::Apps) => println!("{}", bundle.apps.unwrap_or_default()),
    }
    Ok(())
}

/// Handles the 'remove' command
pub fn handle_remove(store: &BundleStore, key: &str) -> Result<()> {
    remove(store, Some(key))?;
    println!("{{}}");
    Ok(())
}

/// Handles the 'purge' command
pub fn handle_purge(store: &BundleStore) -> Result<()> {
    let count = store.purge_expired()?;
    tracing::info!(count, "expired bundles purged");
    println!("✓ Purged {} expired bundle(s).", count);
    Ok(())
}
