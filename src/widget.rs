use crate::api::{Comment, PostId};

pub const LOADING_TEXT: &str = "Loading comments...";
pub const EMPTY_TEXT: &str = "No comments yet.";
pub const LOAD_ERROR_TEXT: &str = "Could not load comments.";

/// Element ids the server-rendered template uses for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIds {
    pub like_count: String,
    pub dislike_count: String,
    pub comment_count: String,
    pub comments_section: String,
    pub comments_container: String,
}

impl ElementIds {
    pub fn for_post(id: &PostId) -> Self {
        Self {
            like_count: format!("like-count-{id}"),
            dislike_count: format!("dislike-count-{id}"),
            comment_count: format!("comment-count-{id}"),
            comments_section: format!("comments-section-{id}"),
            comments_container: format!("comments-container-{id}"),
        }
    }
}

/// A counter as displayed: the text is authoritative, like a DOM text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    text: String,
}

impl Counter {
    pub fn new(value: u64) -> Self {
        Self {
            text: value.to_string(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> Option<u64> {
        self.text.trim().parse().ok()
    }

    pub fn set(&mut self, value: u64) {
        self.text = value.to_string();
    }

    /// Unparsable text counts as zero.
    pub fn increment(&mut self) {
        let next = self.value().unwrap_or(0).saturating_add(1);
        self.set(next);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Neutral,
    Liked,
    Disliked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionWidget {
    pub like_active: bool,
    pub dislike_active: bool,
    pub likes: Counter,
    pub dislikes: Counter,
    /// Newest reaction request whose reply has been applied.
    pub(crate) applied_request: u64,
}

impl ReactionWidget {
    pub fn state(&self) -> ReactionState {
        match (self.like_active, self.dislike_active) {
            (true, _) => ReactionState::Liked,
            (false, true) => ReactionState::Disliked,
            (false, false) => ReactionState::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    pub author: String,
    pub created_at: String,
    pub body: String,
}

impl From<Comment> for CommentBlock {
    fn from(comment: Comment) -> Self {
        Self {
            author: comment.username,
            created_at: comment.created_at,
            body: comment.content,
        }
    }
}

/// Content of the inner comment container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommentContainer {
    /// Server-rendered page, never fetched.
    #[default]
    Unloaded,
    Loading,
    NoComments,
    Comments(Vec<CommentBlock>),
    Error,
}

impl CommentContainer {
    pub fn blocks(&self) -> &[CommentBlock] {
        match self {
            CommentContainer::Comments(blocks) => blocks,
            _ => &[],
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            CommentContainer::Loading => Some(LOADING_TEXT),
            CommentContainer::NoComments => Some(EMPTY_TEXT),
            CommentContainer::Error => Some(LOAD_ERROR_TEXT),
            CommentContainer::Unloaded | CommentContainer::Comments(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Collapsed,
    Loading,
    ExpandedPopulated,
    ExpandedError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWidget {
    pub visibility: Visibility,
    pub container: CommentContainer,
    pub count: Counter,
    /// Text field of the comment form.
    pub input: String,
    pub(crate) applied_request: u64,
}

impl CommentWidget {
    pub fn state(&self) -> SectionState {
        if self.visibility == Visibility::Collapsed {
            return SectionState::Collapsed;
        }
        match self.container {
            CommentContainer::Loading => SectionState::Loading,
            CommentContainer::Error => SectionState::ExpandedError,
            _ => SectionState::ExpandedPopulated,
        }
    }
}

/// Initial state of a post as rendered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSnapshot {
    pub id: PostId,
    pub likes: u64,
    pub dislikes: u64,
    pub liked: bool,
    pub disliked: bool,
    pub comment_count: u64,
}

impl PostSnapshot {
    pub fn new(id: impl Into<PostId>) -> Self {
        Self {
            id: id.into(),
            likes: 0,
            dislikes: 0,
            liked: false,
            disliked: false,
            comment_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWidget {
    pub id: PostId,
    pub ids: ElementIds,
    pub reaction: ReactionWidget,
    pub comments: CommentWidget,
}

impl PostWidget {
    pub fn new(snapshot: PostSnapshot) -> Self {
        let ids = ElementIds::for_post(&snapshot.id);
        // A template showing both flags is inconsistent; keep the like.
        let like_active = snapshot.liked;
        let dislike_active = snapshot.disliked && !snapshot.liked;
        Self {
            ids,
            reaction: ReactionWidget {
                like_active,
                dislike_active,
                likes: Counter::new(snapshot.likes),
                dislikes: Counter::new(snapshot.dislikes),
                applied_request: 0,
            },
            comments: CommentWidget {
                visibility: Visibility::Collapsed,
                container: CommentContainer::Unloaded,
                count: Counter::new(snapshot.comment_count),
                input: String::new(),
                applied_request: 0,
            },
            id: snapshot.id,
        }
    }
}
