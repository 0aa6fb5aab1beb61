#[cfg(feature = "external-services")]
use anyhow::Result;
#[cfg(feature = "external-services")]
use redis::{AsyncCommands, Client};

/// Redis-backed cache, used when `REDIS_URL` is configured.
#[cfg(feature = "external-services")]
#[derive(Clone, Debug)]
pub struct RedisService {
    client: Client,
}

#[cfg(feature = "external-services")]
impl RedisService {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::Connection> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn)
    }

    pub async fn set_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        if expiry_secs > 0 {
            conn.set_ex::<_, _, ()>(key, value, expiry_secs as usize).await?;
        } else {
            conn.set::<_, _, ()>(key, value).await?;
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut conn = self.get_connection().await?;
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn.scan_match::<_, String>(format!("{}*", prefix)).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        if !keys.is_empty() {
            conn.del::<_, ()>(&keys).await?;
        }
        Ok(keys.len())
    }
}
