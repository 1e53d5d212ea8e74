//! Integrations: article sources a user has connected.
//!
//! An integration row holds the endpoint to pull from (`location`) and an
//! opaque JSON `data` blob with the source's credentials.

use super::connection::Db;
use super::links::FetchLink;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Source name for dev.to / Forem article imports.
pub const DEVTO_SOURCE: &str = "devto";

/// Default endpoint for a source, used when an integration is saved
/// without an explicit location.
pub fn default_location(source: &str) -> Option<&'static str> {
    match source {
        DEVTO_SOURCE => Some("https://dev.to/api/articles/me"),
        _ => None,
    }
}

/// A configured article source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Integration {
    pub id: i64,
    pub user_id: i64,
    pub source: String,
    pub location: String,
    /// Raw JSON configuration; holds the API token.
    #[serde(skip_serializing)]
    pub data: String,
    pub last_fetch: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
struct IntegrationData {
    token: String,
}

impl Integration {
    /// API token from the integration's configuration blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegrationData`] if the blob is not JSON, has no
    /// `token`, or the token is not a non-empty string.
    pub fn token(&self) -> Result<String, Error> {
        let data: IntegrationData = serde_json::from_str(&self.data)
            .map_err(|e| Error::IntegrationData(format!("integration {}: {e}", self.id)))?;
        if data.token.trim().is_empty() {
            return Err(Error::IntegrationData(format!("integration {}: token is empty", self.id)));
        }
        Ok(data.token)
    }
}

/// Post/identifier pair reported alongside an integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LinkSummary {
    pub post_id: i64,
    pub identifier: String,
}

impl From<FetchLink> for LinkSummary {
    fn from(link: FetchLink) -> Self {
        Self { post_id: link.post_id, identifier: link.identifier }
    }
}

/// An integration together with the articles imported through it.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct IntegrationWithLinks {
    #[serde(flatten)]
    pub integration: Integration,
    pub fetch_links: Vec<LinkSummary>,
}

const SELECT_INTEGRATION: &str =
    "SELECT id, user_id, source, location, data, last_fetch, created_at, updated_at FROM integrations";

fn integration_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Integration> {
    Ok(Integration {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source: row.get(2)?,
        location: row.get(3)?,
        data: row.get(4)?,
        last_fetch: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Db {
    /// Insert an integration, or update location and data of the existing
    /// one for the same user and source. Returns the integration id.
    pub async fn upsert_integration(
        &self, user_id: i64, source: &str, location: &str, data: &str,
    ) -> Result<i64, Error> {
        if source.trim().is_empty() {
            return Err(Error::InvalidInput("integration source cannot be empty".into()));
        }
        if location.trim().is_empty() {
            return Err(Error::InvalidInput("integration location cannot be empty".into()));
        }
        let source = source.to_string();
        let location = location.to_string();
        let data = data.to_string();
        let now = super::now();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO integrations (user_id, source, location, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(user_id, source) DO UPDATE SET
                        location = excluded.location,
                        data = excluded.data,
                        updated_at = excluded.updated_at",
                    params![user_id, source, location, data, now],
                )?;
                let id = conn.query_row(
                    "SELECT id FROM integrations WHERE user_id = ?1 AND source = ?2",
                    params![user_id, source],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(integration_id = id, user_id, "upserted integration");
        Ok(id)
    }

    /// Integration for a user and source, if configured.
    pub async fn get_integration(&self, user_id: i64, source: &str) -> Result<Option<Integration>, Error> {
        let source = source.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Integration>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_INTEGRATION} WHERE user_id = ?1 AND source = ?2"))?;
                match stmt.query_row(params![user_id, source], integration_from_row) {
                    Ok(integration) => Ok(Some(integration)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Integration by id.
    pub async fn get_integration_by_id(&self, id: i64) -> Result<Option<Integration>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<Integration>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_INTEGRATION} WHERE id = ?1"))?;
                match stmt.query_row(params![id], integration_from_row) {
                    Ok(integration) => Ok(Some(integration)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All integrations of a user with their fetch links.
    pub async fn list_integrations(&self, user_id: i64) -> Result<Vec<IntegrationWithLinks>, Error> {
        let integrations = self
            .conn
            .call(move |conn| -> Result<Vec<Integration>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_INTEGRATION} WHERE user_id = ?1 ORDER BY id ASC"))?;
                let rows = stmt
                    .query_map(params![user_id], integration_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut out = Vec::with_capacity(integrations.len());
        for integration in integrations {
            let fetch_links = self
                .links_for_integration(integration.id)
                .await?
                .into_iter()
                .map(LinkSummary::from)
                .collect();
            out.push(IntegrationWithLinks { integration, fetch_links });
        }
        Ok(out)
    }

    /// Delete an integration; its fetch links go with it.
    ///
    /// Returns false if no such integration existed.
    pub async fn delete_integration(&self, id: i64) -> Result<bool, Error> {
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute("DELETE FROM integrations WHERE id = ?1", params![id])?)
            })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::info!(integration_id = id, "deleted integration");
        }
        Ok(deleted > 0)
    }

    /// Record that an integration was synced just now.
    pub async fn set_integration_last_fetched(&self, id: i64) -> Result<(), Error> {
        let now = super::now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE integrations SET last_fetch = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("integration {id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
