// Social-media automation client contract.
//
// The session acquirer is the only caller of `login`; the action wrappers use
// the remaining methods on a handle that has already logged in.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Profile as returned by the backend. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProfile {
    pub name: Option<String>,
    pub followers_count: Option<u64>,
    pub statuses_count: Option<u64>,
}

/// A post from a search stream. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTweet {
    pub id: Option<String>,
    pub text: Option<String>,
    pub username: Option<String>,
    /// Unix timestamp in seconds.
    pub timestamp: Option<i64>,
}

pub type TweetStream<'a> = BoxStream<'a, anyhow::Result<RawTweet>>;

#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Authenticate this client instance. Called at most once per successful session.
    async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()>;

    async fn get_profile(&self, username: &str) -> anyhow::Result<RawProfile>;

    /// Publish a post, returning the new post's id.
    async fn send_tweet(&self, text: &str) -> anyhow::Result<String>;

    async fn like_tweet(&self, tweet_id: &str) -> anyhow::Result<()>;

    async fn retweet(&self, tweet_id: &str) -> anyhow::Result<()>;

    /// Latest posts matching `query`, fetched lazily page by page. `max_tweets`
    /// is a paging hint; callers still stop reading when they have enough.
    fn search_tweets<'a>(&'a self, query: &'a str, max_tweets: usize) -> TweetStream<'a>;
}

#[async_trait]
impl<C: SocialClient + ?Sized> SocialClient for Box<C> {
    async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        (**self).login(username, password).await
    }

    async fn get_profile(&self, username: &str) -> anyhow::Result<RawProfile> {
        (**self).get_profile(username).await
    }

    async fn send_tweet(&self, text: &str) -> anyhow::Result<String> {
        (**self).send_tweet(text).await
    }

    async fn like_tweet(&self, tweet_id: &str) -> anyhow::Result<()> {
        (**self).like_tweet(tweet_id).await
    }

    async fn retweet(&self, tweet_id: &str) -> anyhow::Result<()> {
        (**self).retweet(tweet_id).await
    }

    fn search_tweets<'a>(&'a self, query: &'a str, max_tweets: usize) -> TweetStream<'a> {
        (**self).search_tweets(query, max_tweets)
    }
}
