//! Redis-backed cache for the heavier analytics aggregations

use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    /// Round-trip a PING, for readiness probes
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis ping failed: {}", e)))?;
        Ok(())
    }

    /// Fetch a cached JSON value, if present
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))?;

        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read from Redis: {}", e)))?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                // Stale/incompatible entry: treat as a miss
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Store a JSON value with expiration (in seconds)
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiration_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))?;

        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to serialize cache value: {}", e)))?;

        conn.set_ex::<_, _, ()>(key, raw, expiration_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write to Redis: {}", e)))?;

        Ok(())
    }
}
