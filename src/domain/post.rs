use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identifier of a piece of content, as assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The kind of content an item represents
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentKind {
    Post,
    Track,
    Album,
    Playlist,
}

/// Interaction counter updates that may be applied to a loaded item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Interaction {
    Like,
    Unlike,
    Save,
    Unsave,
}

/// A single feed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub kind: ContentKind,
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub saves: u64,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        kind: ContentKind,
        author: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PostId::new(id),
            kind,
            author: author.into(),
            title: title.into(),
            body: String::new(),
            tags: Vec::new(),
            created_at,
            likes: 0,
            saves: 0,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_likes(mut self, likes: u64) -> Self {
        self.likes = likes;
        self
    }

    /// Whether the item carries the given tag (case-insensitive, leading `#` ignored)
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim_start_matches('#');
        self.tags
            .iter()
            .any(|t| t.trim_start_matches('#').eq_ignore_ascii_case(wanted))
    }

    /// Apply an interaction to the counters. Counters never underflow.
    pub fn apply_interaction(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Like => self.likes = self.likes.saturating_add(1),
            Interaction::Unlike => self.likes = self.likes.saturating_sub(1),
            Interaction::Save => self.saves = self.saves.saturating_add(1),
            Interaction::Unsave => self.saves = self.saves.saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn sample() -> Post {
        Post::new("p1", ContentKind::Track, "alice", "Night drive", Utc::now())
            .with_tags(["#synthwave", "Chill"])
    }

    #[test]
    fn test_has_tag_ignores_hash_and_case() {
        let post = sample();
        assert!(post.has_tag("synthwave"));
        assert!(post.has_tag("#chill"));
        assert!(!post.has_tag("jazz"));
    }

    #[test]
    fn test_interactions_saturate() {
        let mut post = sample();
        post.apply_interaction(Interaction::Unlike);
        assert_eq!(post.likes, 0);

        post.apply_interaction(Interaction::Like);
        post.apply_interaction(Interaction::Like);
        post.apply_interaction(Interaction::Save);
        assert_eq!(post.likes, 2);
        assert_eq!(post.saves, 1);
    }

    #[test]
    fn test_content_kind_parse() {
        assert_eq!(ContentKind::from_str("Album").ok(), Some(ContentKind::Album));
        assert_eq!(ContentKind::Playlist.to_string(), "playlist");
        assert!(ContentKind::from_str("video").is_err());
    }

    #[test]
    fn test_post_deserializes_with_defaults() {
        let json = r#"{
            "id": "t-9",
            "kind": "track",
            "author": "bob",
            "title": "Loop",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(json).expect("valid post json");
        assert_eq!(post.id, PostId::from("t-9"));
        assert_eq!(post.kind, ContentKind::Track);
        assert!(post.tags.is_empty());
        assert_eq!(post.likes, 0);
    }
}
