use anyhow::Result;

use crate::api::{PostId, ReactionAction, ReactionResponse};
use crate::page::{AsyncResponse, Page, PageError};
use crate::widget::ReactionWidget;

pub const REACTION_FAILED_STATUS: &str = "Could not update reaction";

impl Page {
    /// Sends one toggle request for `post_id`. Every call issues its own
    /// request; nothing is coalesced or cancelled.
    pub fn toggle_reaction(
        &mut self,
        post_id: &PostId,
        action: ReactionAction,
    ) -> Result<u64, PageError> {
        self.ensure_post(post_id)?;
        let service = self.reactions.clone();
        let post_id = post_id.clone();
        log::debug!("toggle {action} on post {post_id}");
        Ok(self.dispatch(move |request_id| {
            let result = service.toggle(&post_id, action);
            AsyncResponse::Reaction {
                request_id,
                post_id,
                action,
                result,
            }
        }))
    }

    pub(crate) fn apply_reaction(
        &mut self,
        request_id: u64,
        post_id: &PostId,
        action: ReactionAction,
        result: Result<ReactionResponse>,
    ) {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                log::warn!("{action} on post {post_id} failed: {err:#}");
                self.set_status(post_id, format!("{REACTION_FAILED_STATUS} on post {post_id}."));
                return;
            }
        };
        let Some(applied) = self.post(post_id).map(|post| post.reaction.applied_request) else {
            return;
        };
        if self.is_stale(request_id, applied) {
            log::debug!("dropping stale {action} reply #{request_id} for post {post_id}");
            return;
        }
        if let Ok(post) = self.post_mut(post_id) {
            apply_response(&mut post.reaction, action, &response);
            post.reaction.applied_request = request_id;
        }
        self.clear_status_for(post_id);
    }
}

/// The server's flags decide the controls; counts are replaced, never adjusted.
pub fn apply_response(widget: &mut ReactionWidget, action: ReactionAction, response: &ReactionResponse) {
    widget.likes.set(response.total_likes);
    widget.dislikes.set(response.total_dislikes);

    let (like, dislike) = match action {
        ReactionAction::Like if response.liked => (true, false),
        ReactionAction::Dislike if response.disliked => (false, true),
        _ if response.liked => (true, false),
        _ if response.disliked => (false, true),
        _ => (false, false),
    };
    widget.like_active = like;
    widget.dislike_active = dislike;
}
