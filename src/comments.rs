use anyhow::Result;

use crate::api::{CommentAck, CommentList, PostId};
use crate::page::{AsyncResponse, Page, PageError};
use crate::widget::{CommentBlock, CommentContainer, Visibility};

pub const SUBMIT_FAILED_ALERT: &str = "Could not add comment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentToggle {
    Expanded { request_id: u64 },
    Collapsed,
}

impl Page {
    /// Click on a post's comment toggle. Opening always refetches.
    pub fn toggle_comments(&mut self, post_id: &PostId) -> Result<CommentToggle, PageError> {
        let post = self.post_mut(post_id)?;
        let visibility = post.comments.visibility;
        match visibility {
            Visibility::Expanded => {
                post.comments.visibility = Visibility::Collapsed;
                Ok(CommentToggle::Collapsed)
            }
            Visibility::Collapsed => {
                post.comments.visibility = Visibility::Expanded;
                let request_id = self.load_comments(post_id)?;
                Ok(CommentToggle::Expanded { request_id })
            }
        }
    }

    /// Shows the loading indicator, then fetches the whole list.
    pub fn load_comments(&mut self, post_id: &PostId) -> Result<u64, PageError> {
        self.post_mut(post_id)?.comments.container = CommentContainer::Loading;
        Ok(self.fetch_comments(post_id))
    }

    /// Requests the list; the caller has already put the container in its
    /// loading state.
    fn fetch_comments(&mut self, post_id: &PostId) -> u64 {
        let service = self.comments.clone();
        let post_id = post_id.clone();
        log::debug!("loading comments for post {post_id}");
        self.dispatch(move |request_id| {
            let result = service.load_comments(&post_id);
            AsyncResponse::Comments {
                request_id,
                post_id,
                result,
            }
        })
    }

    /// Submits `content` for `post_id`. Blank content is dropped without a
    /// request and `None` is returned.
    pub fn submit_comment(
        &mut self,
        post_id: &PostId,
        content: &str,
    ) -> Result<Option<u64>, PageError> {
        self.ensure_post(post_id)?;
        let content = content.trim().to_string();
        if content.is_empty() {
            return Ok(None);
        }
        let service = self.comments.clone();
        let post_id = post_id.clone();
        log::debug!("submitting comment for post {post_id}");
        Ok(Some(self.dispatch(move |request_id| {
            let result = service.add_comment(&post_id, &content);
            AsyncResponse::CommentSubmitted {
                request_id,
                post_id,
                result,
            }
        })))
    }

    /// Submit event of the post's comment form.
    pub fn submit_form(&mut self, post_id: &PostId) -> Result<Option<u64>, PageError> {
        let content = self.post_mut(post_id)?.comments.input.clone();
        self.submit_comment(post_id, &content)
    }

    /// Types into the comment form's text field.
    pub fn set_comment_input(
        &mut self,
        post_id: &PostId,
        text: impl Into<String>,
    ) -> Result<(), PageError> {
        self.post_mut(post_id)?.comments.input = text.into();
        Ok(())
    }

    pub(crate) fn apply_comments(
        &mut self,
        request_id: u64,
        post_id: &PostId,
        result: Result<CommentList>,
    ) {
        let Some(applied) = self.post(post_id).map(|post| post.comments.applied_request) else {
            return;
        };
        if self.is_stale(request_id, applied) {
            log::debug!("dropping stale comment list #{request_id} for post {post_id}");
            return;
        }
        let container = match result {
            Ok(list) if list.success => render_list(list),
            Ok(_) => {
                log::warn!("comment list for post {post_id} reported failure");
                CommentContainer::Error
            }
            Err(err) => {
                log::warn!("loading comments for post {post_id} failed: {err:#}");
                CommentContainer::Error
            }
        };
        if let Ok(post) = self.post_mut(post_id) {
            post.comments.container = container;
            post.comments.applied_request = request_id;
        }
    }

    pub(crate) fn apply_submission(
        &mut self,
        request_id: u64,
        post_id: &PostId,
        result: Result<CommentAck>,
    ) {
        let failure = match result {
            Ok(ack) if ack.success => None,
            Ok(ack) => Some(ack.error.filter(|message| !message.trim().is_empty())),
            Err(err) => {
                log::warn!("comment #{request_id} on post {post_id} failed: {err:#}");
                Some(None)
            }
        };
        if let Some(message) = failure {
            self.alerts
                .push_back(message.unwrap_or_else(|| SUBMIT_FAILED_ALERT.to_string()));
            return;
        }

        let Ok(post) = self.post_mut(post_id) else {
            return;
        };
        post.comments.input.clear();
        post.comments.count.increment();
        // Refetch so the list matches the server's formatting of the new comment.
        post.comments.container = CommentContainer::Loading;
        self.fetch_comments(post_id);
    }
}

fn render_list(list: CommentList) -> CommentContainer {
    if list.comments.is_empty() {
        CommentContainer::NoComments
    } else {
        CommentContainer::Comments(list.comments.into_iter().map(CommentBlock::from).collect())
    }
}
