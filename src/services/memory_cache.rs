use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Process-local key-value cache with per-key expiry.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheService {
    data: Arc<Mutex<HashMap<String, (String, Option<Instant>)>>>,
}

impl MemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; an expiry of zero keeps it until deleted. Entries
    /// that already expired are swept on every write.
    pub fn set_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()> {
        let now = Instant::now();
        let expiry = if expiry_secs > 0 {
            Some(now + Duration::from_secs(expiry_secs))
        } else {
            None
        };

        let mut data = self.data.lock().map_err(|_| anyhow!("Failed to lock cache data"))?;
        data.retain(|_, (_, expiry_time)| expiry_time.map_or(true, |t| t > now));
        data.insert(key.to_string(), (value.to_string(), expiry));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut data = self.data.lock().map_err(|_| anyhow!("Failed to lock cache data"))?;

        let expired = match data.get(key) {
            None => return Ok(None),
            Some((_, Some(expiry_time))) => *expiry_time <= Instant::now(),
            Some((_, None)) => false,
        };

        if expired {
            data.remove(key);
            return Ok(None);
        }
        Ok(data.get(key).map(|(value, _)| value.clone()))
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.data.lock().map_err(|_| anyhow!("Failed to lock cache data"))?;
        data.remove(key);
        Ok(())
    }

    pub fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut data = self.data.lock().map_err(|_| anyhow!("Failed to lock cache data"))?;
        let before = data.len();
        data.retain(|key, _| !key.starts_with(prefix));
        Ok(before - data.len())
    }
}
