//! Article sync engine.
//!
//! Imports a user's articles from an external platform as local posts.
//! Each imported article is bound to its post by a fetch link keyed on
//! `(integration, slug)`, so repeated syncs never create the same post twice.
//!
//! ### Reconciliation, per article
//! 1. An existing link for the slug means the article is already synced.
//! 2. A post with exactly the same title is linked instead of duplicated.
//! 3. Anything else becomes a new post plus its link, in one transaction.
//!
//! An article that fails, whether malformed or rejected by the database, is
//! logged and skipped; the rest of the list is still processed.

use serde::Serialize;

use blogsync_core::store::integrations::DEVTO_SOURCE;
use blogsync_core::{Db, Error, Integration, NewPost};

use crate::ArticleSource;
use crate::devto::ExternalArticle;

/// Category assigned to posts created by a sync.
pub const DEFAULT_SYNC_CATEGORY: &str = "devlog";

const EXCERPT_CHARS: usize = 80;

/// Counts from one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SyncReport {
    /// Articles returned by the remote list.
    pub fetched: usize,
    /// New posts created.
    pub created: usize,
    /// Existing posts linked by title.
    pub linked: usize,
    /// Articles that were already linked.
    pub already_synced: usize,
    /// Articles skipped because of an error.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Linked,
    AlreadySynced,
}

impl SyncReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Linked => self.linked += 1,
            Outcome::AlreadySynced => self.already_synced += 1,
        }
    }
}

/// Syncs articles from one external source into posts.
pub struct ArticleSyncEngine<S> {
    db: Db,
    source: S,
    category: String,
}

impl<S: ArticleSource> ArticleSyncEngine<S> {
    pub fn new(db: Db, source: S) -> Self {
        Self { db, source, category: DEFAULT_SYNC_CATEGORY.to_string() }
    }

    /// Category for posts created by this engine.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Import the user's articles from `source_name`.
    ///
    /// # Errors
    ///
    /// Whole-sync failures only: an unknown source, a missing integration or
    /// token, a failed request or malformed list, and database errors outside
    /// the per-article loop. Any error while reconciling one article is
    /// logged and counted in [`SyncReport::failed`].
    pub async fn sync_articles(&self, user_id: i64, source_name: &str) -> Result<SyncReport, Error> {
        let source_name = source_name.trim();
        if source_name.is_empty() {
            return Err(Error::InvalidInput("source name cannot be empty".into()));
        }
        if source_name != self.source.name() {
            return Err(Error::UnknownSource(source_name.to_string()));
        }

        let integration = self
            .db
            .get_integration(user_id, source_name)
            .await?
            .ok_or_else(|| Error::IntegrationNotFound { user_id, source_name: source_name.to_string() })?;
        let token = integration.token()?;

        tracing::info!(user_id, integration_id = integration.id, source = source_name, "syncing articles");

        let articles = self.source.fetch_articles(&integration.location, &token).await?;

        let mut report = SyncReport { fetched: articles.len(), ..Default::default() };
        for (index, article) in articles.iter().enumerate() {
            match self.reconcile(user_id, &integration, article).await {
                Ok(outcome) => {
                    tracing::debug!(user_id, integration_id = integration.id, index, ?outcome, "article reconciled");
                    report.record(outcome);
                }
                Err(err) => {
                    tracing::error!(
                        user_id,
                        integration_id = integration.id,
                        index,
                        error = %err,
                        "skipping article"
                    );
                    report.failed += 1;
                }
            }
        }

        self.db.set_integration_last_fetched(integration.id).await?;

        tracing::info!(
            user_id,
            integration_id = integration.id,
            fetched = report.fetched,
            created = report.created,
            linked = report.linked,
            already_synced = report.already_synced,
            failed = report.failed,
            "article sync complete"
        );
        Ok(report)
    }

    async fn reconcile(&self, user_id: i64, integration: &Integration, article: &ExternalArticle) -> Result<Outcome, Error> {
        let identifier = article.identifier()?;

        if self.db.find_link(integration.id, identifier).await?.is_some() {
            return Ok(Outcome::AlreadySynced);
        }

        let title = article.title()?;

        if let Some(post) = self.db.find_post_by_title(user_id, title).await? {
            return match self.db.create_link(post.id, integration.id, identifier).await {
                Ok(()) => {
                    tracing::info!(user_id, post_id = post.id, slug = identifier, "linked existing post");
                    Ok(Outcome::Linked)
                }
                Err(Error::DuplicateLink { .. }) => Ok(Outcome::AlreadySynced),
                Err(e) => Err(e),
            };
        }

        let content = article.body()?;
        let post = NewPost {
            author_id: user_id,
            slug: identifier.to_string(),
            title: title.to_string(),
            description: article.description().map(str::to_string).unwrap_or_else(|| excerpt(content)),
            content: content.to_string(),
            category: self.category.clone(),
            tags: Vec::new(),
            archived: false,
            publish_at: article.published_at().map(str::to_string),
        };

        match self.db.create_post_with_link(&post, integration.id, identifier).await {
            Ok(post_id) => {
                tracing::info!(user_id, post_id, slug = identifier, "imported article");
                Ok(Outcome::Created)
            }
            Err(Error::DuplicateLink { .. }) => Ok(Outcome::AlreadySynced),
            Err(e) => Err(e),
        }
    }
}

/// Names of the sources [`ArticleSyncEngine`] can be built for.
pub fn supported_sources() -> &'static [&'static str] {
    &[DEVTO_SOURCE]
}

/// Plain-text summary of a markdown body: heading and quote markers
/// dropped, lines joined, cut to a fixed number of characters.
fn excerpt(markdown: &str) -> String {
    let text = markdown
        .lines()
        .map(|line| line.trim().trim_start_matches(['#', '>', '-', '*']).trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.chars().count() <= EXCERPT_CHARS {
        return text;
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}
