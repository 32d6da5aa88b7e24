use std::collections::HashMap;

use crate::{
    errors::ApiError,
    models::{Comment, NewPost, Post, PostDto, PostDtoV2, PostResponse},
    pagination::{PageRequest, page_accounting},
    repository::RepositoryState,
};

#[derive(Clone)]
pub struct PostService {
    repo: RepositoryState,
}

impl PostService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// The category is resolved before anything is written.
    pub async fn create_post(&self, dto: PostDto) -> Result<PostDto, ApiError> {
        self.require_category(dto.category_id).await?;

        let saved = self
            .repo
            .insert_post(NewPost {
                title: dto.title,
                description: dto.description,
                content: dto.content,
                category_id: dto.category_id,
            })
            .await?;
        tracing::info!(post_id = saved.id, category_id = saved.category_id, "post created");
        Ok(PostDto::from_record(saved, Vec::new()))
    }

    /// get_all_posts
    ///
    /// One page of posts, each with its comments. Comments for the whole page are
    /// fetched in a single batch.
    pub async fn get_all_posts(&self, request: PageRequest) -> Result<PostResponse, ApiError> {
        let page = self.repo.page_posts(request).await?;

        let ids: Vec<i64> = page.content.iter().map(|p| p.id).collect();
        let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
        for comment in self.repo.find_comments_by_posts(&ids).await? {
            by_post.entry(comment.post_id).or_default().push(comment);
        }

        let content = page
            .content
            .into_iter()
            .map(|post| {
                let comments = by_post.remove(&post.id).unwrap_or_default();
                PostDto::from_record(post, comments)
            })
            .collect();

        let (total_pages, last) =
            page_accounting(request.page_no, request.page_size, page.total_elements);

        Ok(PostResponse {
            content,
            page_no: request.page_no,
            page_size: request.page_size,
            total_elements: page.total_elements,
            total_pages,
            last,
        })
    }

    pub async fn get_post_by_id(&self, id: i64) -> Result<PostDto, ApiError> {
        let post = self.load(id).await?;
        let comments = self.repo.find_comments_by_post(id).await?;
        Ok(PostDto::from_record(post, comments))
    }

    /// The v2 shape: the v1 post plus tags taken from its category.
    pub async fn get_post_by_id_v2(&self, id: i64) -> Result<PostDtoV2, ApiError> {
        let post = self.get_post_by_id(id).await?;
        let tags = self
            .repo
            .find_category(post.category_id)
            .await?
            .map(|category| vec![category.name])
            .unwrap_or_default();
        Ok(PostDtoV2::from_v1(post, tags))
    }

    pub async fn update_post(&self, id: i64, dto: PostDto) -> Result<PostDto, ApiError> {
        self.require_category(dto.category_id).await?;
        let existing = self.load(id).await?;

        let post = Post {
            id: existing.id,
            title: dto.title,
            description: dto.description,
            content: dto.content,
            category_id: dto.category_id,
        };
        let updated = self
            .repo
            .update_post(post)
            .await?
            .ok_or_else(|| post_not_found(id))?;

        let comments = self.repo.find_comments_by_post(id).await?;
        Ok(PostDto::from_record(updated, comments))
    }

    pub async fn delete_post_by_id(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_post(id).await? {
            return Err(post_not_found(id));
        }
        tracing::info!(post_id = id, "post deleted");
        Ok(())
    }

    pub async fn get_posts_by_category(&self, category_id: i64) -> Result<Vec<PostDto>, ApiError> {
        self.require_category(category_id).await?;

        let posts = self.repo.find_posts_by_category(category_id).await?;
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
        for comment in self.repo.find_comments_by_posts(&ids).await? {
            by_post.entry(comment.post_id).or_default().push(comment);
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = by_post.remove(&post.id).unwrap_or_default();
                PostDto::from_record(post, comments)
            })
            .collect())
    }

    async fn load(&self, id: i64) -> Result<Post, ApiError> {
        self.repo
            .find_post(id)
            .await?
            .ok_or_else(|| post_not_found(id))
    }

    async fn require_category(&self, category_id: i64) -> Result<(), ApiError> {
        match self.repo.find_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Category", "categoryId", category_id)),
        }
    }
}

fn post_not_found(id: i64) -> ApiError {
    ApiError::not_found("Post", "ID", id)
}
