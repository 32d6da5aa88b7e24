use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};

use super::{RepoResult, Repository};
use crate::{
    models::{Category, Comment, NewCategory, NewComment, NewPost, NewUser, Post, Role, User},
    pagination::{Page, PageRequest, PostSortField},
};

const CATEGORY_COLUMNS: &str = "id, name, description";
const POST_COLUMNS: &str = "id, title, description, content, category_id";
const COMMENT_COLUMNS: &str = "id, name, email, body, post_id";
const USER_COLUMNS: &str = "id, name, username, email, password";

const ROLES_FOR_USER: &str = r#"
    SELECT r.id, r.name
    FROM roles r
    JOIN users_roles ur ON ur.role_id = r.id
    WHERE ur.user_id = $1
    ORDER BY r.id
"#;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Each method is a single statement except
/// `create_user`, which runs in a transaction.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_roles(&self, mut user: User) -> RepoResult<User> {
        user.roles = sqlx::query_as::<_, Role>(ROLES_FOR_USER)
            .bind(user.id)
            .fetch_all(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- CATEGORIES ---

    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let query = format!(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(category.name)
            .bind(category.description)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id");
        Ok(sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_category(&self, category: Category) -> RepoResult<Option<Category>> {
        let query = format!(
            "UPDATE categories SET name = $2, description = $3 WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(category.id)
            .bind(category.name)
            .bind(category.description)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Fails with a constraint violation while posts still reference the category.
    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- POSTS ---

    async fn insert_post(&self, post: NewPost) -> RepoResult<Post> {
        let query = format!(
            "INSERT INTO posts (title, description, content, category_id) VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(post.title)
            .bind(post.description)
            .bind(post.content)
            .bind(post.category_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// page_posts
    ///
    /// The ORDER BY column comes from the `PostSortField` whitelist, never from raw
    /// input; LIMIT and OFFSET are bound parameters. Ties are broken by id so pages
    /// never overlap.
    async fn page_posts(&self, request: PageRequest) -> RepoResult<Page<Post>> {
        let total_elements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts ORDER BY "));
        builder
            .push(request.sort_by.column())
            .push(" ")
            .push(request.direction.as_sql());
        if request.sort_by != PostSortField::Id {
            builder.push(", id ASC");
        }
        builder.push(" LIMIT ");
        builder.push_bind(request.page_size);
        builder.push(" OFFSET ");
        builder.push_bind(request.offset());

        let content = builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            content,
            total_elements,
        })
    }

    async fn find_posts_by_category(&self, category_id: i64) -> RepoResult<Vec<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE category_id = $1 ORDER BY id");
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_post(&self, post: Post) -> RepoResult<Option<Post>> {
        let query = format!(
            r#"UPDATE posts
               SET title = $2, description = $3, content = $4, category_id = $5
               WHERE id = $1
               RETURNING {POST_COLUMNS}"#
        );
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(post.id)
            .bind(post.title)
            .bind(post.description)
            .bind(post.content)
            .bind(post.category_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn insert_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let query = format!(
            "INSERT INTO comments (name, email, body, post_id) VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(comment.name)
            .bind(comment.email)
            .bind(comment.body)
            .bind(comment.post_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_comments_by_post(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY id");
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_comments_by_posts(&self, post_ids: &[i64]) -> RepoResult<Vec<Comment>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ANY($1) ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_comment(&self, comment: Comment) -> RepoResult<Option<Comment>> {
        let query = format!(
            "UPDATE comments SET name = $2, email = $3, body = $4 WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(comment.id)
            .bind(comment.name)
            .bind(comment.email)
            .bind(comment.body)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- USERS & ROLES ---

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) => Ok(Some(self.attach_roles(user).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) => Ok(Some(self.attach_roles(user).await?)),
            None => Ok(None),
        }
    }

    async fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(
            sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// create_user
    ///
    /// Inserts the user row and its `users_roles` links in one transaction, then
    /// returns the user with its roles resolved.
    async fn create_user(&self, user: NewUser, role_ids: &[i64]) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO users (name, username, email, password) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let mut created = sqlx::query_as::<_, User>(&query)
            .bind(user.name)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password)
            .fetch_one(&mut *tx)
            .await?;

        for role_id in role_ids {
            sqlx::query("INSERT INTO users_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(created.id)
                .bind(*role_id)
                .execute(&mut *tx)
                .await?;
        }

        created.roles = sqlx::query_as::<_, Role>(ROLES_FOR_USER)
            .bind(created.id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = created.id, username = %created.username, "user created");
        Ok(created)
    }
}
