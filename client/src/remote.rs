//! Remote record source.
//!
//! The remote is a JSONPlaceholder-style `/posts` resource. Posts map to
//! quotes as `title -> category` and `body -> text`. Writes are echoed back
//! with an id but never stored, so nothing here assumes a write is durable.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use quotesync_engine::{Quote, QuoteContent, QuoteId, Timestamp, FALLBACK_CATEGORY};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `userId` sent with every write; the stub requires one but ignores it.
const USER_ID: u32 = 1;

/// Where quotes are fetched from and pushed to.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch at most `limit` quotes.
    async fn fetch_quotes(&self, limit: usize, now: Timestamp) -> Result<Vec<Quote>>;

    /// Create a quote and return the id the remote assigned.
    async fn create_quote(&self, quote: &Quote) -> Result<QuoteId>;

    /// Overwrite the content of an existing quote.
    async fn update_quote(&self, id: &str, content: &QuoteContent) -> Result<()>;
}

/// Post ids arrive as numbers from the real API but may be strings elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum PostId {
    Number(u64),
    Text(String),
}

impl From<PostId> for QuoteId {
    fn from(id: PostId) -> Self {
        match id {
            PostId::Number(n) => n.to_string(),
            PostId::Text(s) => s,
        }
    }
}

/// A post as returned by the remote.
#[derive(Debug, Clone, Deserialize)]
struct Post {
    id: PostId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

impl Post {
    fn into_quote(self, now: Timestamp) -> Quote {
        let text = self.body.as_deref().unwrap_or_default().trim().to_string();
        let category = match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => FALLBACK_CATEGORY.to_string(),
        };
        Quote::from_server(self.id, QuoteContent::new(text, category), now)
    }
}

/// Echo of a create; only the id matters.
#[derive(Debug, Deserialize)]
struct CreatedPost {
    #[serde(default)]
    id: Option<PostId>,
}

/// Body of a create or update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostPayload<'a> {
    title: &'a str,
    body: &'a str,
    user_id: u32,
}

impl<'a> From<&'a QuoteContent> for PostPayload<'a> {
    fn from(content: &'a QuoteContent) -> Self {
        Self {
            title: &content.category,
            body: &content.text,
            user_id: USER_ID,
        }
    }
}

/// [`RemoteStore`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    posts_url: String,
}

impl HttpRemote {
    /// Create a remote for `{api_base}/posts`.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            posts_url: format!("{}/posts", api_base.trim_end_matches('/')),
        })
    }

    pub fn posts_url(&self) -> &str {
        &self.posts_url
    }
}

fn check_status(response: Response, action: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Status {
            action,
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch_quotes(&self, limit: usize, now: Timestamp) -> Result<Vec<Quote>> {
        let response = self
            .client
            .get(&self.posts_url)
            .query(&[("_limit", limit)])
            .send()
            .await?;
        let posts: Vec<Post> = check_status(response, "Fetch")?.json().await?;

        tracing::debug!(count = posts.len(), "Fetched posts");
        Ok(posts.into_iter().map(|p| p.into_quote(now)).collect())
    }

    async fn create_quote(&self, quote: &Quote) -> Result<QuoteId> {
        let content = quote.content();
        let response = self
            .client
            .post(&self.posts_url)
            .json(&PostPayload::from(&content))
            .send()
            .await?;
        let created: CreatedPost = check_status(response, "Create")?.json().await?;

        Ok(created
            .id
            .map(QuoteId::from)
            .unwrap_or_else(|| quote.id.clone()))
    }

    async fn update_quote(&self, id: &str, content: &QuoteContent) -> Result<()> {
        let response = self
            .client
            .patch(format!("{}/{}", self.posts_url, id))
            .json(&PostPayload::from(content))
            .send()
            .await?;
        check_status(response, "Update")?;
        Ok(())
    }
}
