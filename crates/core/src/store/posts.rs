//! Post rows, limited to what the sync engines read and write.

use super::connection::{Db, is_unique_violation};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub archived: bool,
    pub publish_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a post that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPost {
    pub author_id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub archived: bool,
    pub publish_at: Option<String>,
}

/// Insert a post and its tags on an open connection or transaction.
///
/// A slug already used by the same author gives [`Error::SlugTaken`].
pub(crate) fn insert_post(conn: &rusqlite::Connection, post: &NewPost) -> Result<i64, Error> {
    let now = super::now();
    conn.execute(
        "INSERT INTO posts (author_id, slug, title, description, content, category, archived, publish_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            post.author_id,
            post.slug,
            post.title,
            post.description,
            post.content,
            post.category,
            post.archived,
            post.publish_at,
            now,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::SlugTaken { author_id: post.author_id, slug: post.slug.clone() }
        } else {
            e.into()
        }
    })?;
    let id = conn.last_insert_rowid();

    let mut insert_tag = conn.prepare("INSERT OR IGNORE INTO tags (post_id, tag) VALUES (?1, ?2)")?;
    for tag in &post.tags {
        insert_tag.execute(params![id, tag])?;
    }

    Ok(id)
}

fn load_post(conn: &rusqlite::Connection, where_clause: &str, args: impl rusqlite::Params) -> rusqlite::Result<Option<Post>> {
    let sql = format!(
        "SELECT id, author_id, slug, title, description, content, category, archived, publish_at, created_at, updated_at
         FROM posts WHERE {where_clause} ORDER BY id ASC LIMIT 1"
    );
    let result = conn.query_row(&sql, args, |row| {
        Ok(Post {
            id: row.get(0)?,
            author_id: row.get(1)?,
            slug: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            content: row.get(5)?,
            category: row.get(6)?,
            tags: Vec::new(),
            archived: row.get(7)?,
            publish_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    });

    let mut post = match result {
        Ok(post) => post,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut stmt = conn.prepare("SELECT tag FROM tags WHERE post_id = ?1 ORDER BY tag")?;
    post.tags = stmt
        .query_map(params![post.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(Some(post))
}

impl Db {
    /// Store a new post and return its id.
    pub async fn create_post(&self, post: &NewPost) -> Result<i64, Error> {
        let post = post.clone();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;
                let id = insert_post(&tx, &post)?;
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(post_id = id, "inserted post");
        Ok(id)
    }

    /// Post by id.
    pub async fn get_post(&self, post_id: i64) -> Result<Option<Post>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<Post>, Error> { Ok(load_post(conn, "id = ?1", params![post_id])?) })
            .await
            .map_err(Error::from)
    }

    /// A post by `author_id` whose title equals `title` exactly.
    ///
    /// When several match, the oldest is returned.
    pub async fn find_post_by_title(&self, author_id: i64, title: &str) -> Result<Option<Post>, Error> {
        let title = title.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Post>, Error> {
                Ok(load_post(conn, "author_id = ?1 AND title = ?2", params![author_id, title])?)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of posts owned by `author_id`.
    pub async fn count_posts(&self, author_id: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM posts WHERE author_id = ?1", params![author_id], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
