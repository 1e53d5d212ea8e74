//! Fetch links: which local post an external article was imported as.
//!
//! The `(integration_id, identifier)` pair is the table's primary key, so a
//! second link for the same external article is rejected by SQLite rather
//! than by a read-then-write check.

use super::connection::{Db, is_unique_violation};
use super::posts::{NewPost, insert_post};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Binding between an external article and a local post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FetchLink {
    pub post_id: i64,
    /// Id of the integration the article came from.
    pub integration_id: i64,
    /// The external article's stable slug.
    pub identifier: String,
    pub created_at: String,
}

fn link_error(e: rusqlite::Error, integration_id: i64, identifier: &str) -> Error {
    if is_unique_violation(&e) {
        Error::DuplicateLink { integration_id, identifier: identifier.to_string() }
    } else {
        e.into()
    }
}

fn insert_link(conn: &rusqlite::Connection, post_id: i64, integration_id: i64, identifier: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO fetch_links (post_id, integration_id, identifier, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, integration_id, identifier, super::now()],
    )
    .map_err(|e| link_error(e, integration_id, identifier))?;
    Ok(())
}

impl Db {
    /// Link for an external article, if it was imported before.
    pub async fn find_link(&self, integration_id: i64, identifier: &str) -> Result<Option<FetchLink>, Error> {
        let identifier = identifier.to_string();
        self.conn
            .call(move |conn| -> Result<Option<FetchLink>, Error> {
                let result = conn.query_row(
                    "SELECT post_id, integration_id, identifier, created_at
                     FROM fetch_links WHERE integration_id = ?1 AND identifier = ?2",
                    params![integration_id, identifier],
                    |row| {
                        Ok(FetchLink {
                            post_id: row.get(0)?,
                            integration_id: row.get(1)?,
                            identifier: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(link) => Ok(Some(link)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Bind an existing post to an external article.
    ///
    /// Fails with [`Error::DuplicateLink`] if the article is already linked.
    pub async fn create_link(&self, post_id: i64, integration_id: i64, identifier: &str) -> Result<(), Error> {
        let identifier = identifier.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_link(conn, post_id, integration_id, &identifier) })
            .await
            .map_err(Error::from)?;

        tracing::info!(post_id, integration_id, "created fetch link");
        Ok(())
    }

    /// Create a post and its link in one transaction.
    ///
    /// If the link already exists the post insert is rolled back and
    /// [`Error::DuplicateLink`] is returned, so a concurrent import of the
    /// same article cannot leave an orphan post behind.
    pub async fn create_post_with_link(
        &self, post: &NewPost, integration_id: i64, identifier: &str,
    ) -> Result<i64, Error> {
        let post = post.clone();
        let identifier = identifier.to_string();
        let post_id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;
                let post_id = insert_post(&tx, &post)?;
                insert_link(&tx, post_id, integration_id, &identifier)?;
                tx.commit()?;
                Ok(post_id)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(post_id, integration_id, "inserted post with fetch link");
        Ok(post_id)
    }

    /// All links created for an integration, oldest first.
    pub async fn links_for_integration(&self, integration_id: i64) -> Result<Vec<FetchLink>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<FetchLink>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT post_id, integration_id, identifier, created_at
                     FROM fetch_links WHERE integration_id = ?1 ORDER BY created_at ASC, identifier ASC",
                )?;
                let links = stmt
                    .query_map(params![integration_id], |row| {
                        Ok(FetchLink {
                            post_id: row.get(0)?,
                            integration_id: row.get(1)?,
                            identifier: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(links)
            })
            .await
            .map_err(Error::from)
    }
}
