use crate::widget::{PostWidget, ReactionState, Visibility};

const BODY_WIDTH: usize = 72;
const BODY_INDENT: &str = "    ";

pub fn post_lines(post: &PostWidget) -> Vec<String> {
    let reaction = &post.reaction;
    let marker = match reaction.state() {
        ReactionState::Liked => " [liked]",
        ReactionState::Disliked => " [disliked]",
        ReactionState::Neutral => "",
    };
    let mut lines = vec![format!(
        "post {}  likes {}  dislikes {}  comments {}{}",
        post.id,
        reaction.likes.text(),
        reaction.dislikes.text(),
        post.comments.count.text(),
        marker,
    )];

    if post.comments.visibility == Visibility::Collapsed {
        return lines;
    }
    if let Some(message) = post.comments.container.message() {
        lines.push(format!("  {message}"));
    }
    for block in post.comments.container.blocks() {
        lines.push(format!("  {} · {}", block.author, block.created_at));
        let options = textwrap::Options::new(BODY_WIDTH)
            .initial_indent(BODY_INDENT)
            .subsequent_indent(BODY_INDENT);
        lines.extend(
            textwrap::wrap(&block.body, options)
                .into_iter()
                .map(|line| line.into_owned()),
        );
    }
    lines
}

pub fn post_text(post: &PostWidget) -> String {
    post_lines(post).join("\n")
}
