//! Stats domain types (spec section 3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Like,
    Dislike,
    Favorite,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Like => "Like",
            ActionKind::Dislike => "Dislike",
            ActionKind::Favorite => "Favorite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Like" => Some(ActionKind::Like),
            "Dislike" => Some(ActionKind::Dislike),
            "Favorite" => Some(ActionKind::Favorite),
            _ => None,
        }
    }

    /// The opposite action in the like/dislike mutual-exclusion set, if
    /// any (Favorite has no opposite — spec section 4.3 / DESIGN.md
    /// open question 2).
    pub fn opposite(&self) -> Option<ActionKind> {
        match self {
            ActionKind::Like => Some(ActionKind::Dislike),
            ActionKind::Dislike => Some(ActionKind::Like),
            ActionKind::Favorite => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn dirty_set_key(&self) -> &'static str {
        match self {
            TargetKind::Post => super::keys::POST_DIRTY_SET,
            TargetKind::Comment => super::keys::COMMENT_DIRTY_SET,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PostStats {
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
    pub view_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CommentStats {
    pub like_count: i64,
    pub dislike_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ActionFlags {
    pub liked: bool,
    pub disliked: bool,
    pub favorited: bool,
}
