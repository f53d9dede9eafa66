use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cookies::{TokenProvider, DEFAULT_CSRF_COOKIE};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
pub const AJAX_HEADER: &str = "X-Requested-With";
pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encodes the id as exactly one path segment. Ids that URL resolution
    /// would collapse (`.`, `..`, empty) are refused; the parser treats their
    /// percent-encoded forms as dot segments too.
    fn path_segment(&self) -> Result<String, ApiError> {
        match self.0.as_str() {
            "" | "." | ".." => Err(ApiError::InvalidPostId(self.clone())),
            id => Ok(utf8_percent_encode(id, PATH_SEGMENT).to_string()),
        }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PostId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Like,
    Dislike,
}

impl ReactionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionAction::Like => "like",
            ReactionAction::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ReactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(ReactionAction::Like),
            "dislike" => Ok(ReactionAction::Dislike),
            other => bail!("unknown reaction {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub total_likes: u64,
    pub total_dislikes: u64,
    pub liked: bool,
    pub disliked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub username: String,
    pub created_at: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentList {
    pub success: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("feed: forbidden (check the CSRF token and session cookie)")]
    Forbidden,
    #[error("feed: post {0} not found")]
    NotFound(PostId),
    #[error("feed: post id {0:?} cannot be used in a url")]
    InvalidPostId(PostId),
    #[error("feed: api error {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub csrf_cookie: String,
    pub csrf_header: String,
    pub ajax_header: bool,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("tweet-feed/{}", crate::VERSION),
            timeout: Duration::from_secs(20),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            ajax_header: true,
            http_client: None,
        }
    }
}

pub struct Client {
    http: HttpClient,
    tokens: Arc<dyn TokenProvider>,
    user_agent: String,
    base_url: Url,
    csrf_cookie: String,
    csrf_header: String,
    ajax_header: bool,
}

impl Client {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("feed client user agent required");
        }
        if config.csrf_header.trim().is_empty() {
            bail!("feed client csrf header name required");
        }
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("feed: invalid base url {base:?}"))?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("feed: build http client")?,
        };

        Ok(Client {
            http,
            tokens,
            user_agent: config.user_agent,
            base_url,
            csrf_cookie: config.csrf_cookie,
            csrf_header: config.csrf_header,
            ajax_header: config.ajax_header,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn toggle_reaction(
        &self,
        post_id: &PostId,
        action: ReactionAction,
    ) -> Result<ReactionResponse> {
        let path = format!("tweet/{}/{}/", post_id.path_segment()?, action.as_str());
        let req = self
            .request(Method::POST, &path)?
            .header(CONTENT_TYPE, "application/json");
        let resp = self.send(req, post_id)?;
        resp.json()
            .with_context(|| format!("feed: decode {action} response for post {post_id}"))
    }

    pub fn comments(&self, post_id: &PostId) -> Result<CommentList> {
        let path = format!("tweet/{}/comments/", post_id.path_segment()?);
        let req = self.request(Method::GET, &path)?;
        let resp = self.send(req, post_id)?;
        resp.json()
            .with_context(|| format!("feed: decode comments for post {post_id}"))
    }

    pub fn add_comment(&self, post_id: &PostId, content: &str) -> Result<CommentAck> {
        let path = format!("tweet/{}/comment/", post_id.path_segment()?);
        let form = [("content", content)];
        let req = self.request(Method::POST, &path)?.form(&form);
        let resp = req
            .send()
            .with_context(|| format!("feed: send comment for post {post_id}"))?;
        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .with_context(|| format!("feed: decode comment reply for post {post_id}"));
        }
        // Validation failures come back as 4xx carrying the same envelope.
        let body = resp.text().unwrap_or_default();
        match serde_json::from_str::<CommentAck>(&body) {
            Ok(ack) => Ok(CommentAck {
                success: false,
                error: ack.error,
            }),
            Err(_) => Err(status_error(status, body, post_id).into()),
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let mutating = method != Method::GET;
        let mut req = self
            .http
            .request(method, url)
            .header(USER_AGENT, self.user_agent.clone());
        if let Some(cookie) = self.tokens.cookie_header() {
            req = req.header(COOKIE, cookie);
        }
        if mutating {
            match self.tokens.token(&self.csrf_cookie) {
                Some(token) => req = req.header(self.csrf_header.as_str(), token),
                None => log::debug!("no {} cookie; sending request without csrf", self.csrf_cookie),
            }
        }
        if self.ajax_header {
            req = req.header(AJAX_HEADER, AJAX_HEADER_VALUE);
        }
        Ok(req)
    }

    fn send(&self, req: RequestBuilder, post_id: &PostId) -> Result<Response> {
        let resp = req
            .send()
            .with_context(|| format!("feed: request for post {post_id}"))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            Err(status_error(status, body, post_id).into())
        }
    }
}

fn status_error(status: StatusCode, body: String, post_id: &PostId) -> ApiError {
    match status.as_u16() {
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound(post_id.clone()),
        _ => ApiError::Status { status, body },
    }
}
