use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    auth::{ROLE_ADMIN, ROLE_USER},
    models::{Category, Comment, NewCategory, NewComment, NewPost, NewUser, Post, Role, User},
    pagination::{Page, PageRequest, PostSortField, SortDirection},
};

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    // (user_id, role_id)
    user_roles: Vec<(i64, i64)>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn roles_of(&self, user_id: i64) -> Vec<Role> {
        self.user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| self.roles.get(rid).cloned())
            .collect()
    }

    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.posts
            .values()
            .any(|p| p.title == title && Some(p.id) != except)
    }
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. It enforces the same constraints as
/// the Postgres schema (unique post titles and credentials, foreign keys, comment
/// cascade on post deletion) so services behave identically against it.
///
/// Used by the test suites and for running the API without a database. Roles
/// `ROLE_ADMIN` and `ROLE_USER` are seeded on construction.
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for name in [ROLE_ADMIN, ROLE_USER] {
            let id = tables.next_id();
            tables.roles.insert(
                id,
                Role {
                    id,
                    name: name.to_string(),
                },
            );
        }
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panicking test must not wedge every other caller.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn compare_posts(a: &Post, b: &Post, field: PostSortField) -> Ordering {
    match field {
        PostSortField::Id => a.id.cmp(&b.id),
        PostSortField::Title => a.title.cmp(&b.title),
        PostSortField::Description => a.description.cmp(&b.description),
        PostSortField::Content => a.content.cmp(&b.content),
        PostSortField::CategoryId => a.category_id.cmp(&b.category_id),
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let mut tables = self.lock();
        let id = tables.next_id();
        let created = Category {
            id,
            name: category.name,
            description: category.description,
        };
        tables.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.lock().categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self.lock().categories.values().cloned().collect())
    }

    async fn update_category(&self, category: Category) -> RepoResult<Option<Category>> {
        let mut tables = self.lock();
        Ok(tables.categories.get_mut(&category.id).map(|stored| {
            *stored = category;
            stored.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.lock();
        if tables.posts.values().any(|p| p.category_id == id) {
            return Err(RepositoryError::Constraint(format!(
                "category {id} is still referenced by posts"
            )));
        }
        Ok(tables.categories.remove(&id).is_some())
    }

    async fn insert_post(&self, post: NewPost) -> RepoResult<Post> {
        let mut tables = self.lock();
        if !tables.categories.contains_key(&post.category_id) {
            return Err(RepositoryError::Constraint(format!(
                "category {} does not exist",
                post.category_id
            )));
        }
        if tables.title_taken(&post.title, None) {
            return Err(RepositoryError::Constraint(format!(
                "post title '{}' already exists",
                post.title
            )));
        }
        let id = tables.next_id();
        let created = Post {
            id,
            title: post.title,
            description: post.description,
            content: post.content,
            category_id: post.category_id,
        };
        tables.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>> {
        Ok(self.lock().posts.get(&id).cloned())
    }

    async fn page_posts(&self, request: PageRequest) -> RepoResult<Page<Post>> {
        let tables = self.lock();
        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        posts.sort_by(|a, b| {
            let primary = compare_posts(a, b, request.sort_by);
            let primary = match request.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total_elements = posts.len() as i64;
        let content = posts
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();

        Ok(Page {
            content,
            total_elements,
        })
    }

    async fn find_posts_by_category(&self, category_id: i64) -> RepoResult<Vec<Post>> {
        Ok(self
            .lock()
            .posts
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn update_post(&self, post: Post) -> RepoResult<Option<Post>> {
        let mut tables = self.lock();
        if !tables.categories.contains_key(&post.category_id) {
            return Err(RepositoryError::Constraint(format!(
                "category {} does not exist",
                post.category_id
            )));
        }
        if tables.title_taken(&post.title, Some(post.id)) {
            return Err(RepositoryError::Constraint(format!(
                "post title '{}' already exists",
                post.title
            )));
        }
        Ok(tables.posts.get_mut(&post.id).map(|stored| {
            *stored = post;
            stored.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.lock();
        let removed = tables.posts.remove(&id).is_some();
        if removed {
            tables.comments.retain(|_, c| c.post_id != id);
        }
        Ok(removed)
    }

    async fn insert_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let mut tables = self.lock();
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepositoryError::Constraint(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        let id = tables.next_id();
        let created = Comment {
            id,
            name: comment.name,
            email: comment.email,
            body: comment.body,
            post_id: comment.post_id,
        };
        tables.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn find_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        Ok(self.lock().comments.get(&id).cloned())
    }

    async fn find_comments_by_post(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        self.find_comments_by_posts(&[post_id]).await
    }

    async fn find_comments_by_posts(&self, post_ids: &[i64]) -> RepoResult<Vec<Comment>> {
        Ok(self
            .lock()
            .comments
            .values()
            .filter(|c| post_ids.contains(&c.post_id))
            .cloned()
            .collect())
    }

    async fn update_comment(&self, comment: Comment) -> RepoResult<Option<Comment>> {
        let mut tables = self.lock();
        Ok(tables.comments.get_mut(&comment.id).map(|stored| {
            stored.name = comment.name;
            stored.email = comment.email;
            stored.body = comment.body;
            stored.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock().comments.remove(&id).is_some())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.lock();
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| User {
                roles: tables.roles_of(u.id),
                ..u.clone()
            }))
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Option<User>> {
        let tables = self.lock();
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username || u.email == email)
            .map(|u| User {
                roles: tables.roles_of(u.id),
                ..u.clone()
            }))
    }

    async fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        Ok(self.lock().users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        Ok(self.lock().users.values().any(|u| u.email == email))
    }

    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(self
            .lock()
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn create_user(&self, user: NewUser, role_ids: &[i64]) -> RepoResult<User> {
        let mut tables = self.lock();
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Constraint(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        if let Some(missing) = role_ids.iter().find(|id| !tables.roles.contains_key(*id)) {
            return Err(RepositoryError::Constraint(format!(
                "role {missing} does not exist"
            )));
        }

        let id = tables.next_id();
        tables.users.insert(
            id,
            User {
                id,
                name: user.name,
                username: user.username,
                email: user.email,
                password: user.password,
                roles: vec![],
            },
        );
        tables
            .user_roles
            .extend(role_ids.iter().map(|role_id| (id, *role_id)));

        let roles = tables.roles_of(id);
        let created = tables
            .users
            .get_mut(&id)
            .map(|stored| {
                stored.roles = roles;
                stored.clone()
            })
            .ok_or_else(|| RepositoryError::Constraint(format!("user {id} vanished")))?;
        Ok(created)
    }
}
