use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::api::{CommentAck, CommentList, PostId, ReactionAction, ReactionResponse};
use crate::data::{CommentService, ReactionService};
use crate::widget::{PostSnapshot, PostWidget};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    #[error("post {0} is not on this page")]
    UnknownPost(PostId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Drop replies older than one already applied to the same post.
    pub sequence_responses: bool,
}

pub struct Options {
    pub reactions: Arc<dyn ReactionService>,
    pub comments: Arc<dyn CommentService>,
    pub page: PageOptions,
}

pub(crate) enum AsyncResponse {
    Reaction {
        request_id: u64,
        post_id: PostId,
        action: ReactionAction,
        result: Result<ReactionResponse>,
    },
    Comments {
        request_id: u64,
        post_id: PostId,
        result: Result<CommentList>,
    },
    CommentSubmitted {
        request_id: u64,
        post_id: PostId,
        result: Result<CommentAck>,
    },
}

/// Every post on the page, keyed by id, plus the plumbing that carries
/// network replies back to the thread that owns the widgets.
pub struct Page {
    posts: HashMap<PostId, PostWidget>,
    order: Vec<PostId>,
    pub(crate) reactions: Arc<dyn ReactionService>,
    pub(crate) comments: Arc<dyn CommentService>,
    pub(crate) options: PageOptions,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    in_flight: usize,
    /// Latest non-blocking notice and the post it concerns.
    pub(crate) status: Option<(PostId, String)>,
    pub(crate) alerts: VecDeque<String>,
}

impl Page {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            posts: HashMap::new(),
            order: Vec::new(),
            reactions: options.reactions,
            comments: options.comments,
            options: options.page,
            response_tx,
            response_rx,
            next_request_id: 1,
            in_flight: 0,
            status: None,
            alerts: VecDeque::new(),
        }
    }

    /// Adds a post; re-registering an id replaces its widget.
    pub fn register(&mut self, snapshot: PostSnapshot) -> &PostWidget {
        let id = snapshot.id.clone();
        if !self.posts.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.posts.insert(id.clone(), PostWidget::new(snapshot));
        &self.posts[&id]
    }

    pub fn post(&self, id: &PostId) -> Option<&PostWidget> {
        self.posts.get(id)
    }

    pub fn posts(&self) -> impl Iterator<Item = &PostWidget> {
        self.order.iter().filter_map(|id| self.posts.get(id))
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub(crate) fn post_mut(&mut self, id: &PostId) -> Result<&mut PostWidget, PageError> {
        self.posts
            .get_mut(id)
            .ok_or_else(|| PageError::UnknownPost(id.clone()))
    }

    pub(crate) fn ensure_post(&self, id: &PostId) -> Result<(), PageError> {
        if self.posts.contains_key(id) {
            Ok(())
        } else {
            Err(PageError::UnknownPost(id.clone()))
        }
    }

    pub fn status_message(&self) -> &str {
        self.status.as_ref().map_or("", |(_, message)| message.as_str())
    }

    pub(crate) fn set_status(&mut self, post_id: &PostId, message: String) {
        self.status = Some((post_id.clone(), message));
    }

    /// Drops the notice if it belongs to `post_id`.
    pub(crate) fn clear_status_for(&mut self, post_id: &PostId) {
        if self.status.as_ref().is_some_and(|(owner, _)| owner == post_id) {
            self.status = None;
        }
    }

    /// Hands blocking alerts to the front end, oldest first.
    pub fn take_alerts(&mut self) -> Vec<String> {
        self.alerts.drain(..).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Runs `job` on a worker thread and returns its request id.
    pub(crate) fn dispatch<F>(&mut self, job: F) -> u64
    where
        F: FnOnce(u64) -> AsyncResponse + Send + 'static,
    {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight += 1;
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job(request_id));
        });
        request_id
    }

    /// Applies every reply that has already arrived. Returns whether anything
    /// changed.
    pub fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    /// Blocks until every dispatched request has been applied, including
    /// follow-up requests issued while applying. Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(message) => self.handle_async_response(message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        true
    }

    pub(crate) fn handle_async_response(&mut self, message: AsyncResponse) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match message {
            AsyncResponse::Reaction {
                request_id,
                post_id,
                action,
                result,
            } => self.apply_reaction(request_id, &post_id, action, result),
            AsyncResponse::Comments {
                request_id,
                post_id,
                result,
            } => self.apply_comments(request_id, &post_id, result),
            AsyncResponse::CommentSubmitted {
                request_id,
                post_id,
                result,
            } => self.apply_submission(request_id, &post_id, result),
        }
    }

    /// Whether a reply should be dropped as stale under sequencing.
    pub(crate) fn is_stale(&self, request_id: u64, applied: u64) -> bool {
        self.options.sequence_responses && request_id < applied
    }
}
