//! Social feed: posts, upvotes, comments and notifications.
//!
//! Feed documents are held in memory; notifications fan out to each
//! recipient's inbox through a [`SignalHub`], so a connected client sees
//! new notifications and unread counts as soon as they are produced.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use storeloom_core::{AccountId, CommentId, NotificationId, PostId};
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::signal::{SignalHub, Subscription};

/// Most notifications an inbox keeps; older ones are dropped first.
pub const MAX_INBOX: usize = 100;

/// Errors raised by feed operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("post not found: {0}")]
    PostNotFound(PostId),

    #[error("post is empty")]
    EmptyPost,

    #[error("comment is empty")]
    EmptyComment,
}

/// A feed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub author: AccountId,
    pub text: String,
    pub image_urls: Vec<Url>,
    #[serde(rename = "upvote_count", serialize_with = "serialize_count")]
    pub upvoters: HashSet<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Number of upvotes.
    #[must_use]
    pub fn upvote_count(&self) -> usize {
        self.upvoters.len()
    }
}

fn serialize_count<S: Serializer>(
    upvoters: &HashSet<AccountId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    upvoters.len().serialize(serializer)
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub author: AccountId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Upvote,
    Comment,
}

/// A notification in someone's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: AccountId,
    pub actor: AccountId,
    pub kind: NotificationKind,
    pub post: PostId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn repeats(&self, other: &Self) -> bool {
        !self.read && self.kind == other.kind && self.actor == other.actor && self.post == other.post
    }
}

/// Upvote state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpvoteState {
    pub upvoted: bool,
    pub count: usize,
}

/// Per-account notification inboxes.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    hub: SignalHub<AccountId, Vec<Notification>>,
}

impl NotificationCenter {
    /// Create an empty notification center.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a notification to its recipient.
    ///
    /// An upvote that repeats one still unread in the inbox is dropped. The
    /// inbox keeps the newest [`MAX_INBOX`] notifications.
    pub fn notify(&self, notification: Notification) {
        let recipient = notification.recipient.clone();
        self.hub.update(&recipient, |inbox| {
            let mut inbox = inbox.unwrap_or_default();
            if notification.kind == NotificationKind::Upvote
                && inbox.iter().any(|n| n.repeats(&notification))
            {
                return inbox;
            }
            inbox.insert(0, notification);
            inbox.truncate(MAX_INBOX);
            inbox
        });
    }

    /// Notifications for `account`, newest first.
    #[must_use]
    pub fn inbox(&self, account: &AccountId) -> Vec<Notification> {
        self.hub.current(account).unwrap_or_default()
    }

    /// Number of unread notifications for `account`.
    #[must_use]
    pub fn unread_count(&self, account: &AccountId) -> usize {
        self.inbox(account).iter().filter(|n| !n.read).count()
    }

    /// Mark every notification read. Returns how many changed.
    pub fn mark_all_read(&self, account: &AccountId) -> usize {
        if self.unread_count(account) == 0 {
            return 0;
        }
        let mut changed = 0;
        self.hub.update(account, |inbox| {
            let mut inbox = inbox.unwrap_or_default();
            for notification in inbox.iter_mut().filter(|n| !n.read) {
                notification.read = true;
                changed += 1;
            }
            inbox
        });
        changed
    }

    /// Watch `account`'s inbox.
    pub fn subscribe<F>(&self, account: AccountId, callback: F) -> Subscription
    where
        F: Fn(Option<&Vec<Notification>>) + Send + Sync + 'static,
    {
        self.hub.subscribe(account, callback)
    }
}

#[derive(Debug, Default)]
struct FeedState {
    posts: HashMap<PostId, Post>,
    comments: HashMap<PostId, Vec<Comment>>,
}

/// Feed service.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    state: Arc<Mutex<FeedState>>,
    notifications: NotificationCenter,
}

impl Feed {
    /// Create a feed delivering notifications through `notifications`.
    #[must_use]
    pub fn new(notifications: NotificationCenter) -> Self {
        Self {
            state: Arc::default(),
            notifications,
        }
    }

    /// The notification center this feed delivers to.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a post.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::EmptyPost`] when there is neither text nor an image.
    #[instrument(skip_all, fields(author = %author))]
    pub fn create_post(
        &self,
        author: AccountId,
        text: &str,
        image_urls: Vec<Url>,
    ) -> Result<Post, FeedError> {
        let text = text.trim();
        if text.is_empty() && image_urls.is_empty() {
            return Err(FeedError::EmptyPost);
        }
        let post = Post {
            id: PostId::new(Uuid::new_v4().to_string()),
            author,
            text: text.to_string(),
            image_urls,
            upvoters: HashSet::new(),
            created_at: Utc::now(),
        };
        self.lock().posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    /// Post by ID.
    #[must_use]
    pub fn post(&self, id: &PostId) -> Option<Post> {
        self.lock().posts.get(id).cloned()
    }

    /// Toggle `account`'s upvote on a post.
    ///
    /// Adding an upvote to someone else's post notifies its author.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PostNotFound`] for unknown posts.
    #[instrument(skip_all, fields(post = %post_id, account = %account))]
    pub fn toggle_upvote(
        &self,
        post_id: &PostId,
        account: &AccountId,
    ) -> Result<UpvoteState, FeedError> {
        let (state, author) = {
            let mut feed = self.lock();
            let post = feed
                .posts
                .get_mut(post_id)
                .ok_or_else(|| FeedError::PostNotFound(post_id.clone()))?;
            let upvoted = if post.upvoters.remove(account) {
                false
            } else {
                post.upvoters.insert(account.clone());
                true
            };
            let state = UpvoteState {
                upvoted,
                count: post.upvote_count(),
            };
            (state, post.author.clone())
        };

        if state.upvoted && author != *account {
            self.notify(author, account.clone(), NotificationKind::Upvote, post_id.clone());
        }
        Ok(state)
    }

    /// Comment on a post.
    ///
    /// Commenting on someone else's post notifies its author.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::EmptyComment`] for blank text and
    /// [`FeedError::PostNotFound`] for unknown posts.
    #[instrument(skip_all, fields(post = %post_id, author = %author))]
    pub fn add_comment(
        &self,
        post_id: &PostId,
        author: AccountId,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::EmptyComment);
        }

        let (comment, post_author) = {
            let mut feed = self.lock();
            let post_author = feed
                .posts
                .get(post_id)
                .map(|p| p.author.clone())
                .ok_or_else(|| FeedError::PostNotFound(post_id.clone()))?;
            let comment = Comment {
                id: CommentId::new(Uuid::new_v4().to_string()),
                post: post_id.clone(),
                author,
                text: text.to_string(),
                created_at: Utc::now(),
            };
            feed.comments
                .entry(post_id.clone())
                .or_default()
                .push(comment.clone());
            (comment, post_author)
        };

        if post_author != comment.author {
            self.notify(
                post_author,
                comment.author.clone(),
                NotificationKind::Comment,
                post_id.clone(),
            );
        }
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    #[must_use]
    pub fn comments(&self, post_id: &PostId) -> Vec<Comment> {
        self.lock()
            .comments
            .get(post_id)
            .cloned()
            .unwrap_or_default()
    }

    fn notify(&self, recipient: AccountId, actor: AccountId, kind: NotificationKind, post: PostId) {
        self.notifications.notify(Notification {
            id: NotificationId::new(Uuid::new_v4().to_string()),
            recipient,
            actor,
            kind,
            post,
            read: false,
            created_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> AccountId {
        AccountId::new("author")
    }

    fn fan() -> AccountId {
        AccountId::new("fan")
    }

    #[test]
    fn test_toggle_upvote_is_idempotent_per_account() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "New drop", Vec::new()).expect("post");

        let first = feed.toggle_upvote(&post.id, &fan()).expect("upvote");
        assert_eq!(first, UpvoteState { upvoted: true, count: 1 });
        let second = feed.toggle_upvote(&post.id, &fan()).expect("un-upvote");
        assert_eq!(second, UpvoteState { upvoted: false, count: 0 });
    }

    #[test]
    fn test_upvote_notifies_author_once_per_upvote() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "New drop", Vec::new()).expect("post");

        feed.toggle_upvote(&post.id, &fan()).expect("upvote");
        feed.toggle_upvote(&post.id, &fan()).expect("remove");
        feed.toggle_upvote(&post.id, &author()).expect("self upvote");

        let inbox = feed.notifications().inbox(&author());
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Upvote);
        assert_eq!(inbox[0].actor, fan());
    }

    #[test]
    fn test_comment_notifies_and_mark_all_read() {
        let feed = Feed::default();
        let image = Url::parse("https://cdn.example.com/p.png").expect("url");
        let post = feed
            .create_post(author(), "", vec![image])
            .expect("image-only post");

        feed.add_comment(&post.id, fan(), "Love it").expect("comment");
        feed.add_comment(&post.id, author(), "Thanks!").expect("reply");
        feed.toggle_upvote(&post.id, &fan()).expect("upvote");

        let center = feed.notifications();
        assert_eq!(center.unread_count(&author()), 2);
        assert_eq!(center.inbox(&author())[0].kind, NotificationKind::Upvote);
        assert_eq!(center.mark_all_read(&author()), 2);
        assert_eq!(center.unread_count(&author()), 0);
        assert_eq!(center.mark_all_read(&author()), 0);
        assert_eq!(feed.comments(&post.id).len(), 2);
    }

    #[test]
    fn test_inbox_subscription_sees_new_notifications() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "hi", Vec::new()).expect("post");
        let counts: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink = Arc::clone(&counts);
        let _sub = feed.notifications().subscribe(author(), move |inbox| {
            sink.lock()
                .expect("lock")
                .push(inbox.map_or(0, |n| n.iter().filter(|n| !n.read).count()));
        });

        feed.add_comment(&post.id, fan(), "first").expect("comment");
        feed.notifications().mark_all_read(&author());

        assert_eq!(*counts.lock().expect("lock"), vec![1, 0]);
    }

    #[test]
    fn test_repeated_upvote_toggles_notify_once() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "New drop", Vec::new()).expect("post");

        for _ in 0..10 {
            feed.toggle_upvote(&post.id, &fan()).expect("toggle");
        }

        let center = feed.notifications();
        assert_eq!(center.inbox(&author()).len(), 1);
        assert_eq!(center.unread_count(&author()), 1);

        // Once read, a fresh upvote notifies again.
        center.mark_all_read(&author());
        feed.toggle_upvote(&post.id, &fan()).expect("upvote");
        assert_eq!(center.unread_count(&author()), 1);
        assert_eq!(center.inbox(&author()).len(), 2);
    }

    #[test]
    fn test_inbox_keeps_newest_notifications() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "New drop", Vec::new()).expect("post");

        for i in 0..MAX_INBOX + 20 {
            feed.add_comment(&post.id, fan(), &format!("comment {i}"))
                .expect("comment");
        }

        let inbox = feed.notifications().inbox(&author());
        assert_eq!(inbox.len(), MAX_INBOX);
        assert!(inbox.iter().all(|n| n.kind == NotificationKind::Comment));
    }

    #[test]
    fn test_serialized_post_carries_upvote_count() {
        let feed = Feed::default();
        let post = feed.create_post(author(), "New drop", Vec::new()).expect("post");
        feed.toggle_upvote(&post.id, &fan()).expect("upvote");
        feed.toggle_upvote(&post.id, &AccountId::new("other")).expect("upvote");

        let json = serde_json::to_value(feed.post(&post.id).expect("post")).expect("json");
        assert_eq!(json["upvote_count"], 2);
        assert!(json.get("upvoters").is_none());
    }

    #[test]
    fn test_errors() {
        let feed = Feed::default();
        let missing = PostId::new("missing");
        assert_eq!(
            feed.toggle_upvote(&missing, &fan()),
            Err(FeedError::PostNotFound(missing.clone()))
        );
        assert_eq!(
            feed.create_post(author(), "  ", Vec::new()),
            Err(FeedError::EmptyPost)
        );
        let post = feed.create_post(author(), "x", Vec::new()).expect("post");
        assert_eq!(
            feed.add_comment(&post.id, fan(), " "),
            Err(FeedError::EmptyComment)
        );
    }
}
