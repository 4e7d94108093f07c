// Core comment logic, independent of storage and transport

pub mod comment_tree;

pub use comment_tree::{page_window, CommentStore, CommentTree, CommentTreeBuilder, LikeOracle};
