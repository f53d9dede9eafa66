use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};

use tweet_feed::api::{Client, ClientConfig};
use tweet_feed::cookies::CookieStore;
use tweet_feed::data::{HttpCommentService, HttpReactionService};
use tweet_feed::page::{Options, Page, PageOptions};
use tweet_feed::widget::{CommentContainer, ReactionState, SectionState, EMPTY_TEXT};
use tweet_feed::{PostId, PostSnapshot, ReactionAction};

const WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    body: String,
}

type Replies = Arc<Mutex<HashMap<String, VecDeque<(u16, String)>>>>;

/// Local feed server answering from queued replies keyed by path.
struct FakeFeed {
    base_url: String,
    replies: Replies,
    seen: Arc<Mutex<Vec<Seen>>>,
    stop: Arc<AtomicBool>,
}

impl FakeFeed {
    fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind fake feed");
        let base_url = format!("http://{}/", server.server_addr());
        let replies: Replies = Arc::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let (thread_replies, thread_seen, thread_stop) = (replies.clone(), seen.clone(), stop.clone());
        thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let headers = request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().as_str().to_ascii_lowercase(), h.value.as_str().to_string()))
                    .collect();
                let url = request.url().to_string();
                thread_seen.lock().push(Seen {
                    method: request.method().to_string(),
                    url: url.clone(),
                    headers,
                    body,
                });
                let reply = thread_replies
                    .lock()
                    .get_mut(&url)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or((500, "{}".to_string()));
                let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("valid header");
                let _ = request.respond(
                    Response::from_string(reply.1)
                        .with_status_code(reply.0)
                        .with_header(header),
                );
            }
        });

        Self {
            base_url,
            replies,
            seen,
            stop,
        }
    }

    fn reply(&self, path: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.to_string()));
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    fn page(&self, cookie: &str) -> Page {
        let client = Client::new(
            Arc::new(CookieStore::new(cookie)),
            ClientConfig {
                base_url: self.base_url.clone(),
                ..ClientConfig::default()
            },
        )
        .expect("client");
        let client = Arc::new(client);
        Page::new(Options {
            reactions: Arc::new(HttpReactionService::new(client.clone())),
            comments: Arc::new(HttpCommentService::new(client)),
            page: PageOptions::default(),
        })
    }
}

impl Drop for FakeFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[test]
fn like_round_trip_sends_csrf_and_applies_totals() {
    let feed = FakeFeed::start();
    feed.reply(
        "/tweet/5/like/",
        200,
        r#"{"total_likes": 8, "total_dislikes": 1, "liked": true, "disliked": false}"#,
    );
    let mut page = feed.page("sessionid=s1; csrftoken=tok%2B1");
    let id = PostId::new("5");
    page.register(PostSnapshot {
        likes: 7,
        dislikes: 2,
        disliked: true,
        ..PostSnapshot::new("5")
    });

    page.toggle_reaction(&id, ReactionAction::Like).unwrap();
    assert!(page.wait_idle(WAIT));

    let post = page.post(&id).unwrap();
    assert_eq!(post.reaction.state(), ReactionState::Liked);
    assert!(!post.reaction.dislike_active);
    assert_eq!(post.reaction.likes.text(), "8");
    assert_eq!(post.reaction.dislikes.text(), "1");

    let seen = feed.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].headers.get("x-csrftoken").map(String::as_str), Some("tok+1"));
    assert_eq!(
        seen[0].headers.get("x-requested-with").map(String::as_str),
        Some("XMLHttpRequest")
    );
    assert_eq!(
        seen[0].headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    assert!(seen[0].headers["cookie"].contains("sessionid=s1"));
}

#[test]
fn malformed_reaction_reply_leaves_counts() {
    let feed = FakeFeed::start();
    feed.reply("/tweet/5/dislike/", 200, "<html>oops</html>");
    let mut page = feed.page("csrftoken=t");
    let id = PostId::new("5");
    page.register(PostSnapshot {
        likes: 2,
        ..PostSnapshot::new("5")
    });

    page.toggle_reaction(&id, ReactionAction::Dislike).unwrap();
    assert!(page.wait_idle(WAIT));

    let post = page.post(&id).unwrap();
    assert_eq!(post.reaction.likes.text(), "2");
    assert_eq!(post.reaction.state(), ReactionState::Neutral);
    assert!(!page.status_message().is_empty());
}

#[test]
fn open_close_open_issues_two_fetches() {
    let feed = FakeFeed::start();
    feed.reply("/tweet/3/comments/", 200, r#"{"success": true, "comments": []}"#);
    feed.reply(
        "/tweet/3/comments/",
        200,
        r#"{"success": true, "comments": [{"username": "ana", "created_at": "now", "content": "hi"}]}"#,
    );
    let mut page = feed.page("");
    let id = PostId::new("3");
    page.register(PostSnapshot::new("3"));

    page.toggle_comments(&id).unwrap();
    assert_eq!(page.post(&id).unwrap().comments.state(), SectionState::Loading);
    assert!(page.wait_idle(WAIT));
    let container = &page.post(&id).unwrap().comments.container;
    assert_eq!(container.message(), Some(EMPTY_TEXT));
    assert!(container.blocks().is_empty());

    page.toggle_comments(&id).unwrap();
    page.toggle_comments(&id).unwrap();
    assert_eq!(page.post(&id).unwrap().comments.state(), SectionState::Loading);
    assert!(page.wait_idle(WAIT));

    let seen = feed.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|req| req.method == "GET"));
    assert!(seen.iter().all(|req| !req.headers.contains_key("x-csrftoken")));
    assert_eq!(page.post(&id).unwrap().comments.container.blocks()[0].author, "ana");
}

#[test]
fn submit_posts_form_then_refreshes() {
    let feed = FakeFeed::start();
    feed.reply("/tweet/3/comment/", 200, r#"{"success": true}"#);
    feed.reply(
        "/tweet/3/comments/",
        200,
        r#"{"success": true, "comments": [{"username": "me", "created_at": "now", "content": "hello world"}]}"#,
    );
    let mut page = feed.page("csrftoken=abc");
    let id = PostId::new("3");
    page.register(PostSnapshot {
        comment_count: 4,
        ..PostSnapshot::new("3")
    });

    page.set_comment_input(&id, "  hello world  ").unwrap();
    page.submit_form(&id).unwrap();
    assert!(page.wait_idle(WAIT));

    let comments = &page.post(&id).unwrap().comments;
    assert_eq!(comments.input, "");
    assert_eq!(comments.count.text(), "5");
    assert_eq!(comments.container.blocks().len(), 1);

    let seen = feed.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].url, "/tweet/3/comment/");
    assert_eq!(seen[0].body, "content=hello+world");
    assert_eq!(seen[0].headers.get("x-csrftoken").map(String::as_str), Some("abc"));
    assert_eq!(seen[1].url, "/tweet/3/comments/");
}

#[test]
fn rejected_submit_surfaces_server_error() {
    let feed = FakeFeed::start();
    feed.reply(
        "/tweet/3/comment/",
        400,
        r#"{"success": false, "error": "too long"}"#,
    );
    let mut page = feed.page("csrftoken=abc");
    let id = PostId::new("3");
    page.register(PostSnapshot::new("3"));

    page.set_comment_input(&id, "hello").unwrap();
    page.submit_form(&id).unwrap();
    assert!(page.wait_idle(WAIT));

    let alerts = page.take_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("too long"));
    assert_eq!(page.post(&id).unwrap().comments.input, "hello");
    assert_eq!(feed.seen().len(), 1);
}

#[test]
fn whitespace_submit_never_reaches_server() {
    let feed = FakeFeed::start();
    let mut page = feed.page("csrftoken=abc");
    let id = PostId::new("3");
    page.register(PostSnapshot::new("3"));

    assert_eq!(page.submit_comment(&id, "   ").unwrap(), None);
    assert!(page.wait_idle(WAIT));
    thread::sleep(Duration::from_millis(100));
    assert!(feed.seen().is_empty());
}

#[test]
fn server_error_on_listing_renders_error_block() {
    let feed = FakeFeed::start();
    feed.reply("/tweet/9/comments/", 500, "boom");
    let mut page = feed.page("");
    let id = PostId::new("9");
    page.register(PostSnapshot::new("9"));

    page.toggle_comments(&id).unwrap();
    assert!(page.wait_idle(WAIT));
    assert_eq!(page.post(&id).unwrap().comments.container, CommentContainer::Error);
    assert_eq!(page.post(&id).unwrap().comments.state(), SectionState::ExpandedError);
}

#[test]
fn dot_post_id_is_refused_before_sending() {
    let feed = FakeFeed::start();
    let mut page = feed.page("csrftoken=abc");
    let id = PostId::new("..");
    page.register(PostSnapshot::new(".."));

    page.toggle_reaction(&id, ReactionAction::Like).unwrap();
    assert!(page.wait_idle(WAIT));
    thread::sleep(Duration::from_millis(100));

    assert!(feed.seen().is_empty());
    assert_eq!(page.post(&id).unwrap().reaction.state(), ReactionState::Neutral);
    assert!(!page.status_message().is_empty());
}
