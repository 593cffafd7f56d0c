//! Supabase REST implementation of [`DurableStore`].

use async_trait::async_trait;
use serde::Serialize;
use tac_core::GameId;
use tracing::{debug, error};

use crate::durable::{DurableStore, GameRecord};
use crate::error::{StoreError, StoreResult};

const GAMES_TABLE: &str = "games";

/// Supabase REST API client for the `games` table.
#[derive(Clone)]
pub struct SupabaseStore {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
}

impl SupabaseStore {
    /// Create a new Supabase store.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase anonymous API key
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn fetch_url(&self, id: &GameId) -> String {
        format!(
            "{}?id=eq.{}&select=id,fields,updated_at",
            self.rest_url(GAMES_TABLE),
            id
        )
    }

    /// Perform an upsert (POST with merge-duplicates).
    async fn upsert_row<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> StoreResult<()> {
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates")
            .json(body)
            .send()
            .await?;

        Self::check_response(response).await.map(|_| ())
    }

    /// Check HTTP response for errors, returning the body on success.
    async fn check_response(response: reqwest::Response) -> StoreResult<String> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Supabase request failed: {} - {}", status, body);
            return Err(StoreError::Supabase {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

/// Decodes a PostgREST row list, keeping the first row.
fn first_row(body: &str) -> StoreResult<Option<GameRecord>> {
    let rows: Vec<GameRecord> = serde_json::from_str(body)?;
    Ok(rows.into_iter().next())
}

#[async_trait]
impl DurableStore for SupabaseStore {
    async fn fetch(&self, id: &GameId) -> StoreResult<Option<GameRecord>> {
        debug!(game_id = %id, "Loading game from Supabase");

        let response = self
            .http_client
            .get(self.fetch_url(id))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        let body = Self::check_response(response).await?;
        first_row(&body)
    }

    async fn upsert(&self, record: &GameRecord) -> StoreResult<()> {
        debug!(game_id = %record.id, "Saving game to Supabase");

        self.upsert_row(&self.rest_url(GAMES_TABLE), record).await?;

        debug!(game_id = %record.id, "Game saved to Supabase");
        Ok(())
    }
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
