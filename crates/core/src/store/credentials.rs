//! Per-user API credentials for external sources.

use super::connection::Db;
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

/// Credential source name for the devpad projects API.
pub const DEVPAD_SOURCE: &str = "devpad";

impl Db {
    /// Store or replace the API token a user holds for `source`.
    pub async fn set_credential(&self, user_id: i64, source: &str, token: &str) -> Result<(), Error> {
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("credential token cannot be empty".into()));
        }
        let owned_source = source.to_string();
        let token = token.to_string();
        let now = super::now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO api_credentials (user_id, source, token, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(user_id, source) DO UPDATE SET
                        token = excluded.token,
                        updated_at = excluded.updated_at",
                    params![user_id, owned_source, token, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(user_id, source, "stored API credential");
        Ok(())
    }

    /// API token a user holds for `source`, if any.
    pub async fn get_credential(&self, user_id: i64, source: &str) -> Result<Option<String>, Error> {
        let source = source.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT token FROM api_credentials WHERE user_id = ?1 AND source = ?2",
                    params![user_id, source],
                    |row| row.get(0),
                );

                match result {
                    Ok(token) => Ok(Some(token)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_credential() {
        let db = Db::open_in_memory().await.unwrap();
        assert!(db.get_credential(1, DEVPAD_SOURCE).await.unwrap().is_none());

        db.set_credential(1, DEVPAD_SOURCE, "key-1").await.unwrap();
        assert_eq!(db.get_credential(1, DEVPAD_SOURCE).await.unwrap().as_deref(), Some("key-1"));

        db.set_credential(1, DEVPAD_SOURCE, "key-2").await.unwrap();
        assert_eq!(db.get_credential(1, DEVPAD_SOURCE).await.unwrap().as_deref(), Some("key-2"));

        assert!(db.get_credential(2, DEVPAD_SOURCE).await.unwrap().is_none());
        assert!(db.get_credential(1, "devto").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_credential_rejected() {
        let db = Db::open_in_memory().await.unwrap();
        let result = db.set_credential(1, DEVPAD_SOURCE, "  ").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
