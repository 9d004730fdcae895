//! Domain models for the comment service.
//!
//! - [`Comment`]: the only persisted entity. The relational store owns it;
//!   the cache holds disposable JSON snapshots of it.
//! - Request inputs ([`CreateCommentInput`], [`UpdateCommentInput`]) and
//!   response bodies ([`CommentsResponse`], [`DetailResponse`]) shared by the
//!   HTTP handlers and the API client.

mod comment;

pub use comment::*;
