// Comment tree assembly - threads a flat comment snapshot and pages it by top-level comment

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Comment, CommentId, CommentView, Subject, UserId};

/// Source of approved comments for one subject.
///
/// Implementations return the whole approved set in a single call, ordered
/// newest first. The tree builder keeps that order for top-level comments and
/// for each reply list.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn fetch_approved(&self, subject: Subject) -> AppResult<Vec<Comment>>;
}

/// Answers whether a viewer has liked a comment. A missing record is `Ok(false)`.
#[async_trait]
pub trait LikeOracle: Send + Sync {
    async fn has_liked(&self, comment_id: CommentId, viewer: UserId) -> AppResult<bool>;
}

/// Result of [`CommentTreeBuilder::build_tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommentTree {
    pub items: Vec<CommentView>,
    /// Number of top-level comments across all pages. Replies are not counted.
    pub total_top_level: usize,
}

/// Reply levels kept nested when no other limit is configured.
pub const DEFAULT_MAX_REPLY_DEPTH: usize = 10;

/// Arena slot: the view without replies plus indices of its direct replies.
struct Node {
    view: CommentView,
    children: Vec<usize>,
}

/// Builds the threaded, paginated comment view for a subject.
///
/// The full approved set is fetched and threaded in memory before paging.
/// This caps comfortable volume at a few thousand comments per subject; going
/// past that needs the store to page top-level comments itself and fetch only
/// their descendants.
///
/// Replies nest at most `max_depth` levels below a top-level comment. Deeper
/// replies are flattened, in thread order, into their ancestor at that level.
#[derive(Clone)]
pub struct CommentTreeBuilder {
    store: Arc<dyn CommentStore>,
    likes: Arc<dyn LikeOracle>,
    max_depth: usize,
}

impl CommentTreeBuilder {
    pub fn new(store: Arc<dyn CommentStore>, likes: Arc<dyn LikeOracle>) -> Self {
        Self {
            store,
            likes,
            max_depth: DEFAULT_MAX_REPLY_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Threads the subject's approved comments and returns one page of
    /// top-level comments, each carrying its complete reply subtree.
    ///
    /// `viewer` of `None` or `Some(0)` is anonymous: nothing is marked liked and
    /// the like oracle is not consulted. Pages past the end come back empty with
    /// an accurate `total_top_level`.
    #[instrument(skip(self))]
    pub async fn build_tree(
        &self,
        subject: Subject,
        viewer: Option<UserId>,
        page: i64,
        page_size: i64,
    ) -> AppResult<CommentTree> {
        let comments = self.store.fetch_approved(subject).await.map_err(|e| match e {
            AppError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            other => AppError::StoreUnavailable(other.to_string()),
        })?;

        let viewer = viewer.filter(|id| *id != 0);

        let mut arena: Vec<Node> = Vec::with_capacity(comments.len());
        let mut index: HashMap<CommentId, usize> = HashMap::with_capacity(comments.len());
        for comment in &comments {
            let is_liked = match viewer {
                Some(viewer_id) => self.viewer_liked(comment.id, viewer_id).await,
                None => false,
            };
            index.insert(comment.id, arena.len());
            arena.push(Node {
                view: CommentView::from_comment(comment, is_liked),
                children: Vec::new(),
            });
        }

        let mut top_level: Vec<usize> = Vec::new();
        for (position, comment) in comments.iter().enumerate() {
            match comment.parent_id {
                None => top_level.push(position),
                Some(parent_id) => match index.get(&parent_id) {
                    Some(&parent) => arena[parent].children.push(position),
                    None => debug!(
                        comment_id = comment.id,
                        parent_id, "dropping reply whose parent is not in the snapshot"
                    ),
                },
            }
        }

        let total_top_level = top_level.len();
        let (start, end) = page_window(page, page_size, total_top_level);
        let items = top_level[start..end]
            .iter()
            .map(|&position| materialize(&arena, position, self.max_depth))
            .collect();

        Ok(CommentTree {
            items,
            total_top_level,
        })
    }

    /// Oracle lookup collapsed to `false` on error.
    async fn viewer_liked(&self, comment_id: CommentId, viewer: UserId) -> bool {
        match self.likes.has_liked(comment_id, viewer).await {
            Ok(liked) => liked,
            Err(e) => {
                warn!(comment_id, viewer, "like lookup failed, treating as not liked: {}", e);
                false
            }
        }
    }
}

/// Copies the node at `root` out of the arena with its replies filled in.
///
/// Walks with an explicit stack, so stored depth never touches the call
/// stack. Only nodes reachable from a top-level comment are visited, so parent
/// cycles in bad data are never walked.
fn materialize(arena: &[Node], root: usize, max_depth: usize) -> CommentView {
    // Pre-order (node, host) pairs for every descendant of `root`.
    let mut order: Vec<(usize, usize)> = Vec::new();
    let mut stack: Vec<(usize, usize, usize)> = Vec::new();
    push_children(&mut stack, &arena[root].children, root, 1);

    while let Some((position, depth, host)) = stack.pop() {
        order.push((position, host));
        // Below the cap, descendants collect under the capped node.
        let child_host = if depth <= max_depth { position } else { host };
        push_children(&mut stack, &arena[position].children, child_host, depth + 1);
    }

    // Reverse pre-order sees every node after all of its descendants.
    let mut replies: HashMap<usize, Vec<CommentView>> = HashMap::new();
    for &(position, host) in order.iter().rev() {
        let mut view = arena[position].view.clone();
        if let Some(mut children) = replies.remove(&position) {
            children.reverse();
            view.replies = children;
        }
        replies.entry(host).or_default().push(view);
    }

    let mut view = arena[root].view.clone();
    if let Some(mut children) = replies.remove(&root) {
        children.reverse();
        view.replies = children;
    }
    view
}

fn push_children(
    stack: &mut Vec<(usize, usize, usize)>,
    children: &[usize],
    host: usize,
    depth: usize,
) {
    for &child in children.iter().rev() {
        stack.push((child, depth, host));
    }
}

/// Slice bounds for `page` of `page_size` over `len` items, clamped to
/// `[0, len]`. Out-of-range or negative windows yield an empty range.
pub fn page_window(page: i64, page_size: i64, len: usize) -> (usize, usize) {
    let len_wide = len as i128;
    let start = (i128::from(page) - 1) * i128::from(page_size);
    let end = start + i128::from(page_size);
    let clamp = |value: i128| value.clamp(0, len_wide) as usize;
    let (start, end) = (clamp(start), clamp(end));
    (start, end.max(start))
}
