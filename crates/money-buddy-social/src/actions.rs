// Per-action wrappers over a logged-in session.
//
// Each wrapper forwards to one client call and reshapes the answer into an
// `Outcome`. Failures are logged and returned as `{success:false, error}`;
// nothing propagates past these functions.

use futures_util::StreamExt;
use serde::Serialize;
use tracing::error;

use money_buddy_core::outcome::Outcome;

use crate::client::SocialClient;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Payload for actions whose only output is a confirmation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostedTweet {
    pub text: String,
    pub id: String,
    /// Milliseconds since the Unix epoch, taken when the post was sent.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostReceipt {
    pub result: PostedTweet,
    pub message: String,
}

/// A well-formed search hit: every field present and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub text: String,
    pub username: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub followers: u64,
    pub posts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReceipt {
    pub profile: Profile,
}

pub const INVALID_PROFILE: &str = "Invalid profile data received";

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

pub async fn post<C: SocialClient>(session: &Session<C>, text: &str) -> Outcome<PostReceipt> {
    match session.client().send_tweet(text).await {
        Ok(id) => Outcome::success(PostReceipt {
            result: PostedTweet {
                text: text.to_string(),
                id,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
            message: "Tweet posted successfully".to_string(),
        }),
        Err(e) => {
            error!("Error posting to Twitter: {e:#}");
            Outcome::failure(e.to_string())
        }
    }
}

pub async fn like<C: SocialClient>(session: &Session<C>, tweet_id: &str) -> Outcome<Confirmation> {
    match session.client().like_tweet(tweet_id).await {
        Ok(()) => Outcome::success(Confirmation {
            message: "Tweet liked successfully".to_string(),
        }),
        Err(e) => {
            error!("Error liking tweet: {e:#}");
            Outcome::failure(e.to_string())
        }
    }
}

pub async fn retweet<C: SocialClient>(
    session: &Session<C>,
    tweet_id: &str,
) -> Outcome<Confirmation> {
    match session.client().retweet(tweet_id).await {
        Ok(()) => Outcome::success(Confirmation {
            message: "Tweet retweeted successfully".to_string(),
        }),
        Err(e) => {
            error!("Error retweeting: {e:#}");
            Outcome::failure(e.to_string())
        }
    }
}

/// Collect up to `limit` well-formed posts for `query`.
///
/// Posts missing text, username or timestamp are skipped and do not count
/// toward the limit. Reading stops as soon as the limit is reached.
pub async fn search<C: SocialClient>(
    session: &Session<C>,
    query: &str,
    limit: usize,
) -> Outcome<SearchResults> {
    let mut posts = Vec::with_capacity(limit);
    if limit == 0 {
        return Outcome::success(SearchResults { posts });
    }

    let mut stream = session.client().search_tweets(query, limit);
    while let Some(item) = stream.next().await {
        let tweet = match item {
            Ok(tweet) => tweet,
            Err(e) => {
                error!("Error searching tweets: {e:#}");
                return Outcome::failure(e.to_string());
            }
        };

        let (Some(text), Some(username), Some(timestamp)) = (
            tweet.text.filter(|s| !s.is_empty()),
            tweet.username.filter(|s| !s.is_empty()),
            tweet.timestamp,
        ) else {
            continue;
        };

        posts.push(Post {
            text,
            username,
            timestamp,
        });
        if posts.len() >= limit {
            break;
        }
    }

    Outcome::success(SearchResults { posts })
}

pub async fn get_user<C: SocialClient>(
    session: &Session<C>,
    username: &str,
) -> Outcome<ProfileReceipt> {
    let profile = match session.client().get_profile(username).await {
        Ok(profile) => profile,
        Err(e) => {
            error!("Error getting user profile: {e:#}");
            return Outcome::failure(e.to_string());
        }
    };

    match (
        profile.name.filter(|n| !n.is_empty()),
        profile.followers_count,
        profile.statuses_count,
    ) {
        (Some(name), Some(followers), Some(posts)) => Outcome::success(ProfileReceipt {
            profile: Profile {
                name,
                followers,
                posts,
            },
        }),
        _ => {
            error!(username, "Error getting user profile: {INVALID_PROFILE}");
            Outcome::failure(INVALID_PROFILE)
        }
    }
}
