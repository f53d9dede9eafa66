use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::api::{PostId, ReactionAction};
use crate::config;
use crate::data::{CommentService, HttpCommentService, HttpReactionService, ReactionService};
use crate::page::{self, Page};
use crate::render;
use crate::widget::PostSnapshot;

pub const USAGE: &str = "tweet-feed - Like, dislike and comment on feed posts from the terminal.

Usage:
  tweet-feed [--config <path>] like <post-id>
  tweet-feed [--config <path>] dislike <post-id>
  tweet-feed [--config <path>] comments <post-id>
  tweet-feed [--config <path>] comment <post-id> <text...>
  tweet-feed [--config <path>] login <cookie>

  --version, -V        Show version and exit
  --help,    -h        Show this help message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    React(PostId, ReactionAction),
    Comments(PostId),
    Comment(PostId, String),
    SaveCookie(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_file: Option<PathBuf>,
    pub command: Command,
}

pub fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut config_file = None;
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config needs a path")?;
            config_file = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }

    let mut rest = rest.into_iter();
    let verb = rest.next().context("missing command; see --help")?;
    let command = match verb.as_str() {
        "like" | "dislike" => {
            let action = verb.parse::<ReactionAction>()?;
            Command::React(post_arg(rest.next())?, action)
        }
        "comments" => Command::Comments(post_arg(rest.next())?),
        "comment" => {
            let id = post_arg(rest.next())?;
            Command::Comment(id, rest.collect::<Vec<_>>().join(" "))
        }
        "login" => Command::SaveCookie(rest.collect::<Vec<_>>().join(" ")),
        other => bail!("unknown command {other:?}; see --help"),
    };

    Ok(Invocation {
        config_file,
        command,
    })
}

fn post_arg(arg: Option<String>) -> Result<PostId> {
    match arg {
        Some(id) if !id.trim().is_empty() => Ok(PostId::new(id.trim())),
        _ => bail!("missing post id"),
    }
}

pub fn run<I>(args: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let invocation = parse_args(args)?;
    let post_id = match &invocation.command {
        Command::React(id, _) | Command::Comments(id) | Command::Comment(id, _) => id.clone(),
        Command::SaveCookie(cookie) => {
            let path = config::save_session_cookie(invocation.config_file.clone(), cookie)?;
            println!("Saved session cookie to {}", path.display());
            return Ok(());
        }
    };

    let cfg = config::load(config::LoadOptions {
        config_file: invocation.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if cfg.session.cookie.is_empty() {
        log::warn!("no session cookie configured; mutating requests will lack a csrf token");
    }

    let client = Arc::new(config::client_from(&cfg).context("build feed client")?);
    let reactions: Arc<dyn ReactionService> = Arc::new(HttpReactionService::new(client.clone()));
    let comments: Arc<dyn CommentService> = Arc::new(HttpCommentService::new(client));
    let mut page = Page::new(page::Options {
        reactions,
        comments,
        page: cfg.page_options(),
    });

    page.register(PostSnapshot::new(post_id.clone()));

    match invocation.command {
        Command::React(_, action) => {
            page.toggle_reaction(&post_id, action)?;
        }
        Command::Comments(_) => {
            page.toggle_comments(&post_id)?;
        }
        Command::Comment(_, text) => {
            page.set_comment_input(&post_id, text)?;
            if page.submit_form(&post_id)?.is_none() {
                println!("Nothing to submit.");
                return Ok(());
            }
        }
        Command::SaveCookie(_) => {}
    }

    if !page.wait_idle(cfg.feed.wait_timeout) {
        bail!("timed out waiting for the server");
    }

    if let Some(post) = page.post(&post_id) {
        println!("{}", render::post_text(post));
    }
    if !page.status_message().is_empty() {
        eprintln!("{}", page.status_message());
    }
    let alerts = page.take_alerts();
    for alert in &alerts {
        eprintln!("alert: {alert}");
    }
    if !alerts.is_empty() {
        bail!("comment was not added");
    }
    Ok(())
}
