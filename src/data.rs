use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;

use crate::api::{self, CommentAck, CommentList, PostId, ReactionAction, ReactionResponse};

pub trait ReactionService: Send + Sync {
    fn toggle(&self, post_id: &PostId, action: ReactionAction) -> Result<ReactionResponse>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, post_id: &PostId) -> Result<CommentList>;
    fn add_comment(&self, post_id: &PostId, content: &str) -> Result<CommentAck>;
}

pub struct HttpReactionService {
    client: Arc<api::Client>,
}

impl HttpReactionService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ReactionService for HttpReactionService {
    fn toggle(&self, post_id: &PostId, action: ReactionAction) -> Result<ReactionResponse> {
        self.client
            .toggle_reaction(post_id, action)
            .with_context(|| format!("toggle {action}"))
    }
}

pub struct HttpCommentService {
    client: Arc<api::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn load_comments(&self, post_id: &PostId) -> Result<CommentList> {
        self.client.comments(post_id).context("fetch comments")
    }

    fn add_comment(&self, post_id: &PostId, content: &str) -> Result<CommentAck> {
        self.client
            .add_comment(post_id, content)
            .context("submit comment")
    }
}

/// A call observed by [`ScriptedService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Toggle(PostId, ReactionAction),
    LoadComments(PostId),
    AddComment(PostId, String),
}

/// In-memory stand-in for both services. Replies are queued per post and
/// consumed in order; an empty queue yields an error, like an unreachable
/// server would.
#[derive(Default)]
pub struct ScriptedService {
    reactions: Mutex<HashMap<PostId, VecDeque<Result<ReactionResponse, String>>>>,
    listings: Mutex<HashMap<PostId, VecDeque<Result<CommentList, String>>>>,
    acks: Mutex<HashMap<PostId, VecDeque<Result<CommentAck, String>>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reaction(&self, post_id: &PostId, reply: Result<ReactionResponse, String>) {
        self.reactions
            .lock()
            .entry(post_id.clone())
            .or_default()
            .push_back(reply);
    }

    pub fn push_comments(&self, post_id: &PostId, reply: Result<CommentList, String>) {
        self.listings
            .lock()
            .entry(post_id.clone())
            .or_default()
            .push_back(reply);
    }

    pub fn push_ack(&self, post_id: &PostId, reply: Result<CommentAck, String>) {
        self.acks
            .lock()
            .entry(post_id.clone())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

fn next_reply<T>(
    queues: &Mutex<HashMap<PostId, VecDeque<Result<T, String>>>>,
    post_id: &PostId,
    what: &str,
) -> Result<T> {
    let reply = queues
        .lock()
        .get_mut(post_id)
        .and_then(|queue| queue.pop_front());
    match reply {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(anyhow!(message)),
        None => Err(anyhow!("scripted: no {what} reply queued for post {post_id}")),
    }
}

impl ReactionService for ScriptedService {
    fn toggle(&self, post_id: &PostId, action: ReactionAction) -> Result<ReactionResponse> {
        self.record(Call::Toggle(post_id.clone(), action));
        next_reply(&self.reactions, post_id, "reaction")
    }
}

impl CommentService for ScriptedService {
    fn load_comments(&self, post_id: &PostId) -> Result<CommentList> {
        self.record(Call::LoadComments(post_id.clone()));
        next_reply(&self.listings, post_id, "comment list")
    }

    fn add_comment(&self, post_id: &PostId, content: &str) -> Result<CommentAck> {
        self.record(Call::AddComment(post_id.clone(), content.to_string()));
        next_reply(&self.acks, post_id, "comment")
    }
}
