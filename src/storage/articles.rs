use super::schema::Database;
use super::types::{Article, ArticleDbRow, DatabaseError, NewArticle};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of articles to return from any single query (OOM protection)
const MAX_ARTICLES: usize = 2000;

impl Database {
    // ========================================================================
    // Article Mutations
    // ========================================================================

    /// Returns true if an article with this link is already stored.
    pub async fn article_exists(&self, link: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM articles WHERE link = ? LIMIT 1")
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Insert an article unless one with the same link exists.
    ///
    /// Returns `true` if a row was inserted. An existing article is never
    /// modified; the UNIQUE(link) constraint makes the check-and-insert atomic,
    /// so two overlapping ingestion passes cannot both insert the same link.
    pub async fn insert_if_absent(&self, article: &NewArticle) -> Result<bool, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, link, published, summary, fetched_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
        "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(article.published.timestamp())
        .bind(&article.summary)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Article Queries
    // ========================================================================

    /// Most recent articles, newest first.
    ///
    /// Ties on `published` are broken by id, newest insert first. `limit` is
    /// capped at MAX_ARTICLES.
    pub async fn recent_articles(&self, limit: usize) -> Result<Vec<Article>, DatabaseError> {
        let limit = clamp_limit(limit);
        let rows = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, title, link, published, summary
            FROM articles
            ORDER BY published DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Articles whose title or summary contains `term`, newest first.
    ///
    /// Matching is a case-insensitive substring test (SQLite `LIKE`, which
    /// folds ASCII case only). `term` is used as given, whitespace included,
    /// and wildcards in it are matched literally. An empty term matches every
    /// article.
    pub async fn search_articles(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Article>, DatabaseError> {
        if term.is_empty() {
            return self.recent_articles(limit).await;
        }

        let pattern = like_pattern(term);
        let limit = clamp_limit(limit);
        tracing::debug!(term = %term, limit = limit, "search_articles");

        let rows = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, title, link, published, summary
            FROM articles
            WHERE title LIKE ? ESCAPE '\' OR summary LIKE ? ESCAPE '\'
            ORDER BY published DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Total number of stored articles.
    pub async fn article_count(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn clamp_limit(limit: usize) -> i64 {
    limit.min(MAX_ARTICLES) as i64
}

/// Build a `LIKE` pattern that matches `term` literally anywhere in the text.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
