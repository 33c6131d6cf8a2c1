//! Post and comment operations, gated by the group authorization checks.

use crate::db::{CommentRecord, Database, PostRecord, PostSummary};
use crate::error::CoreError;
use crate::groups::authz;
use tracing::info;
use uuid::Uuid;

/// Create a top-level post in a group. Members only.
pub async fn create_post(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
    content: &str,
) -> Result<PostRecord, CoreError> {
    if !authz::is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    let post = db.posts().create(group_id, user_id, content, None).await?;
    Ok(post)
}

/// Comment on a post. The commenter must be a member of the post's
/// group; the comment lands in that same group.
pub async fn create_comment(
    db: &Database,
    user_id: Uuid,
    post_id: Uuid,
    content: &str,
) -> Result<PostRecord, CoreError> {
    let parent = db
        .posts()
        .find_by_id(post_id)
        .await?
        .ok_or(CoreError::PostNotFound)?;

    if !authz::is_member(db, user_id, parent.group_id).await? {
        return Err(CoreError::NotMember);
    }

    let comment = db
        .posts()
        .create(parent.group_id, user_id, content, Some(parent.id))
        .await?;
    Ok(comment)
}

/// Delete a post, subject to [`authz::can_delete_post`].
pub async fn delete_post(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
    post_id: Uuid,
) -> Result<(), CoreError> {
    let post = db
        .posts()
        .find_by_id(post_id)
        .await?
        .ok_or(CoreError::PostNotFound)?;

    // A post ID from another group is treated as not found rather than
    // leaking cross-group existence.
    if post.group_id != group_id {
        return Err(CoreError::PostNotFound);
    }

    authz::can_delete_post(db, user_id, &post, group_id).await?;

    db.posts().delete(post_id).await?;
    info!(post_id = %post_id, group_id = %group_id, by = %user_id, "Post deleted");
    Ok(())
}

/// Paginated feed of a group's top-level posts. Members only.
pub async fn post_feed(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
    limit: u32,
    offset: u32,
) -> Result<Vec<PostSummary>, CoreError> {
    if !authz::is_member(db, user_id, group_id).await? {
        return Err(CoreError::NotMember);
    }

    Ok(db.posts().feed(group_id, limit, offset).await?)
}

/// A post together with its comments. Members of the post's group only.
pub async fn post_with_comments(
    db: &Database,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<(PostRecord, Vec<CommentRecord>), CoreError> {
    let post = db
        .posts()
        .find_by_id(post_id)
        .await?
        .ok_or(CoreError::PostNotFound)?;

    if !authz::is_member(db, user_id, post.group_id).await? {
        return Err(CoreError::NotMember);
    }

    let comments = db.posts().comments_for(post.id).await?;
    Ok((post, comments))
}
