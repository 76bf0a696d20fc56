use thiserror::Error;

use crate::node::NodeUid;

/// Consistency errors raised by the tree arena.
///
/// These indicate a caller bug (attaching children to a node that does not
/// exist, reusing a uid twice) rather than an I/O condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeUid),

    #[error("node is not expandable: {0}")]
    NotExpandable(NodeUid),

    #[error("duplicate node uid: {0}")]
    DuplicateUid(NodeUid),
}

pub type Result<T> = std::result::Result<T, TreeError>;
