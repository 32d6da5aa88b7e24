use crate::{
    errors::ApiError,
    models::{Comment, CommentDto, NewComment},
    repository::RepositoryState,
};

const COMMENT_NOT_IN_POST: &str = "Comment does not belong to post";

#[derive(Clone)]
pub struct CommentService {
    repo: RepositoryState,
}

impl CommentService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// create_comment
    ///
    /// The post must exist. A `postId` in the payload, when given, has to agree
    /// with the post the comment is addressed under.
    pub async fn create_comment(&self, post_id: i64, dto: CommentDto) -> Result<CommentDto, ApiError> {
        self.require_post(post_id).await?;
        if dto.post_id.is_some_and(|claimed| claimed != post_id) {
            return Err(ApiError::Conflict(COMMENT_NOT_IN_POST.to_string()));
        }

        let saved = self
            .repo
            .insert_comment(NewComment {
                name: dto.name,
                email: dto.email,
                body: dto.body,
                post_id,
            })
            .await?;
        tracing::info!(post_id, comment_id = saved.id, "comment created");
        Ok(saved.into())
    }

    pub async fn get_comments_by_post_id(&self, post_id: i64) -> Result<Vec<CommentDto>, ApiError> {
        self.require_post(post_id).await?;
        let comments = self.repo.find_comments_by_post(post_id).await?;
        Ok(comments.into_iter().map(CommentDto::from).collect())
    }

    pub async fn get_comment_by_id(&self, post_id: i64, comment_id: i64) -> Result<CommentDto, ApiError> {
        Ok(self.load_in_post(post_id, comment_id).await?.into())
    }

    pub async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        dto: CommentDto,
    ) -> Result<CommentDto, ApiError> {
        let mut comment = self.load_in_post(post_id, comment_id).await?;
        comment.name = dto.name;
        comment.email = dto.email;
        comment.body = dto.body;

        self.repo
            .update_comment(comment)
            .await?
            .map(CommentDto::from)
            .ok_or_else(|| comment_not_found(comment_id))
    }

    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<(), ApiError> {
        self.load_in_post(post_id, comment_id).await?;
        if !self.repo.delete_comment(comment_id).await? {
            return Err(comment_not_found(comment_id));
        }
        tracing::info!(post_id, comment_id, "comment deleted");
        Ok(())
    }

    async fn require_post(&self, post_id: i64) -> Result<(), ApiError> {
        match self.repo.find_post(post_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Post", "postId", post_id)),
        }
    }

    // Post first, then comment, then ownership.
    async fn load_in_post(&self, post_id: i64, comment_id: i64) -> Result<Comment, ApiError> {
        self.require_post(post_id).await?;
        let comment = self
            .repo
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| comment_not_found(comment_id))?;

        if comment.post_id != post_id {
            tracing::debug!(post_id, comment_id, owner = comment.post_id, "comment addressed under wrong post");
            return Err(ApiError::Conflict(COMMENT_NOT_IN_POST.to_string()));
        }
        Ok(comment)
    }
}

fn comment_not_found(id: i64) -> ApiError {
    ApiError::not_found("Comment", "commentId", id)
}
