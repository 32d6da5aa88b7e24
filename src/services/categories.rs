use crate::{
    errors::ApiError,
    models::{Category, CategoryDto, NewCategory},
    repository::RepositoryState,
};

#[derive(Clone)]
pub struct CategoryService {
    repo: RepositoryState,
}

impl CategoryService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn add_category(&self, dto: CategoryDto) -> Result<CategoryDto, ApiError> {
        let saved = self
            .repo
            .insert_category(NewCategory {
                name: dto.name,
                description: dto.description,
            })
            .await?;
        tracing::info!(category_id = saved.id, "category created");
        Ok(saved.into())
    }

    pub async fn get_category(&self, id: i64) -> Result<CategoryDto, ApiError> {
        Ok(self.load(id).await?.into())
    }

    pub async fn get_all_categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
        let categories = self.repo.list_categories().await?;
        Ok(categories.into_iter().map(CategoryDto::from).collect())
    }

    pub async fn update_category(&self, id: i64, dto: CategoryDto) -> Result<CategoryDto, ApiError> {
        let mut category = self.load(id).await?;
        category.name = dto.name;
        category.description = dto.description;

        self.repo
            .update_category(category)
            .await?
            .map(CategoryDto::from)
            .ok_or_else(|| not_found(id))
    }

    /// Refused with a constraint error while posts still belong to the category.
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.load(id).await?;
        if !self.repo.delete_category(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }

    async fn load(&self, id: i64) -> Result<Category, ApiError> {
        self.repo
            .find_category(id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found("Category", "categoryId", id)
}
