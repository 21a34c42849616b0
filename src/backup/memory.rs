use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::app::Result;
use crate::backup::BackupTarget;

/// Backup target that lives as long as the process. Ephemeral stores use it.
#[derive(Debug)]
pub struct MemoryTarget {
    name: String,
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_value(name: &str, key: &str, value: Value) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value);
        Self {
            name: name.to_string(),
            values: Mutex::new(values),
        }
    }
}

#[async_trait]
impl BackupTarget for MemoryTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str, default: Value) -> Result<Value> {
        let values = self.values.lock().await;
        Ok(values.get(key).cloned().unwrap_or(default))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_default_when_missing() {
        let target = MemoryTarget::new("local");
        assert_eq!(target.get("feeds", json!([])).await.unwrap(), json!([]));

        target.set("feeds", json!([{"feedID": 1}])).await.unwrap();
        assert_eq!(
            target.get("feeds", json!([])).await.unwrap(),
            json!([{"feedID": 1}])
        );
    }
}
