//! Post Types
//!
//! Immutable content records and their compact triple form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of fields in a stripped post.
pub const POST_TUPLE_ARITY: usize = 3;

/// Largest id that survives the trip through an `f64` column unchanged (2^53).
const MAX_EXACT_ID: u64 = 1 << 53;

/// Compact `[leaning, interest_value, id]` form used by the content store.
pub type PostTuple = [f64; POST_TUPLE_ARITY];

/// Unique identifier for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post_{:08}", self.0)
    }
}

/// Errors raised when building a post from raw values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PostError {
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("post tuple must have 3 fields, got {0}")]
    TupleArity(usize),
    #[error("post id {0} is not a non-negative integer below 2^53")]
    InvalidId(f64),
}

/// A unit of content. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    id: PostId,
    /// Position on the tracked issue, 0.0 to 1.0
    leaning: f64,
    /// Intrinsic engagingness, independent of leaning, 0.0 to 1.0
    interest_value: f64,
    /// Display name of whoever wrote it. Descriptive only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
}

impl Post {
    pub fn new(id: PostId, leaning: f64, interest_value: f64) -> Result<Self, PostError> {
        check_unit("leaning", leaning)?;
        check_unit("interest_value", interest_value)?;
        Ok(Self {
            id,
            leaning,
            interest_value,
            author: None,
        })
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Rebuilds a post from its stripped triple. The author is not part of
    /// the triple and comes back as `None`.
    pub fn from_tuple(tuple: PostTuple) -> Result<Self, PostError> {
        let [leaning, interest_value, raw_id] = tuple;
        if !(raw_id >= 0.0 && raw_id.fract() == 0.0 && raw_id <= MAX_EXACT_ID as f64) {
            return Err(PostError::InvalidId(raw_id));
        }
        Self::new(PostId(raw_id as u64), leaning, interest_value)
    }

    /// Same as [`Post::from_tuple`] but accepts an unchecked slice.
    pub fn from_slice(values: &[f64]) -> Result<Self, PostError> {
        let tuple: PostTuple = values
            .try_into()
            .map_err(|_| PostError::TupleArity(values.len()))?;
        Self::from_tuple(tuple)
    }

    pub fn to_tuple(&self) -> PostTuple {
        [self.leaning, self.interest_value, self.id.0 as f64]
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn leaning(&self) -> f64 {
        self.leaning
    }

    pub fn interest_value(&self) -> f64 {
        self.interest_value
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), PostError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PostError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(matches!(
            Post::new(PostId(1), 1.2, 0.5),
            Err(PostError::OutOfRange { field: "leaning", .. })
        ));
        assert!(matches!(
            Post::new(PostId(1), 0.5, -0.1),
            Err(PostError::OutOfRange { field: "interest_value", .. })
        ));
        assert!(Post::new(PostId(1), f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_tuple_round_trip() {
        let post = Post::new(PostId(4_321), 0.137, 0.862).unwrap().with_author("Ada");
        let restored = Post::from_tuple(post.to_tuple()).unwrap();

        assert_eq!(restored.id(), post.id());
        assert_eq!(restored.leaning(), post.leaning());
        assert_eq!(restored.interest_value(), post.interest_value());
        assert_eq!(restored.author(), None);
    }

    #[test]
    fn test_from_slice_checks_arity() {
        assert_eq!(
            Post::from_slice(&[0.1, 0.2]).unwrap_err(),
            PostError::TupleArity(2)
        );
        assert_eq!(
            Post::from_slice(&[0.1, 0.2, 3.0, 4.0]).unwrap_err(),
            PostError::TupleArity(4)
        );
        assert_eq!(Post::from_slice(&[0.1, 0.2, 3.0]).unwrap().id(), PostId(3));
    }

    #[test]
    fn test_from_tuple_rejects_fractional_id() {
        assert!(matches!(
            Post::from_tuple([0.5, 0.5, 2.5]),
            Err(PostError::InvalidId(_))
        ));
        assert!(matches!(
            Post::from_tuple([0.5, 0.5, -1.0]),
            Err(PostError::InvalidId(_))
        ));
    }

    #[test]
    fn test_post_serialization_omits_missing_author() {
        let post = Post::new(PostId(7), 0.25, 0.75).unwrap();
        let json = serde_json::to_string(&post).unwrap();
        assert!(!json.contains("author"));

        let parsed: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, post);
    }
}
