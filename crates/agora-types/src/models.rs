use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Row identifiers are SQLite rowids.
pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;
pub type CategoryId = i64;

/// A voter's recorded position on a subject. Absence of a vote is `None`
/// wherever a stance is optional; there is no neutral variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Like,
    Dislike,
}

impl Stance {
    /// Stored `vote_type` value.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
        }
    }
}

impl TryFrom<i64> for Stance {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Like),
            -1 => Ok(Self::Dislike),
            other => Err(format!("vote type must be 1 (like) or -1 (dislike), got {other}")),
        }
    }
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" | "1" => Ok(Self::Like),
            "dislike" | "-1" => Ok(Self::Dislike),
            other => Err(format!("unknown stance '{other}'")),
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Dislike => f.write_str("dislike"),
        }
    }
}

/// What a vote is cast on. Posts and comments keep disjoint ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Post,
    Comment,
}

impl FromStr for SubjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(format!("unknown subject kind '{other}'")),
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => f.write_str("post"),
            Self::Comment => f.write_str("comment"),
        }
    }
}

/// Like/dislike counts for one subject, derived on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub likes: u64,
    pub dislikes: u64,
}

impl Aggregate {
    pub fn new(likes: u64, dislikes: u64) -> Self {
        Self { likes, dislikes }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}
