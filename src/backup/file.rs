use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::app::{Result, StoreError};
use crate::backup::BackupTarget;

/// Backup target persisted as one JSON object file.
///
/// Every `set` rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents in place.
#[derive(Debug, Clone)]
pub struct JsonFileTarget {
    name: String,
    path: PathBuf,
}

impl JsonFileTarget {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_object(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(self.error("file does not hold a JSON object")),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, message: impl ToString) -> StoreError {
        StoreError::Backup {
            target: self.name.clone(),
            message: format!("{}: {}", self.path.display(), message.to_string()),
        }
    }
}

#[async_trait]
impl BackupTarget for JsonFileTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str, default: Value) -> Result<Value> {
        let mut object = self.read_object().await?;
        Ok(object.remove(key).unwrap_or(default))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut object = self.read_object().await?;
        object.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(object))?).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(backup = %self.name, key, "Wrote backup");
        Ok(())
    }
}
