//! Paging and sorting for the post listing.
//!
//! `PageRequest` is built from raw query parameters and rejects anything the
//! repository could not honor, so repositories only ever see whitelisted columns.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::ApiError;

pub const DEFAULT_PAGE_NUMBER: i64 = 0;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_SORT_BY: &str = "id";
pub const DEFAULT_SORT_DIRECTION: &str = "asc";

/// Raw `GET /api/v1/posts` query parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Zero-based page index.
    #[serde(default = "default_page_no")]
    pub page_no: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// One of `id`, `title`, `description`, `content`, `categoryId`.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// `asc` or `desc`.
    #[serde(default = "default_sort_dir")]
    pub sort_dir: String,
}

fn default_page_no() -> i64 {
    DEFAULT_PAGE_NUMBER
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_by() -> String {
    DEFAULT_SORT_BY.to_string()
}

fn default_sort_dir() -> String {
    DEFAULT_SORT_DIRECTION.to_string()
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page_no: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: default_sort_by(),
            sort_dir: default_sort_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only `desc` (any case) selects descending order.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Columns a post listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSortField {
    Id,
    Title,
    Description,
    Content,
    CategoryId,
}

impl PostSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "id" => Some(PostSortField::Id),
            "title" => Some(PostSortField::Title),
            "description" => Some(PostSortField::Description),
            "content" => Some(PostSortField::Content),
            "categoryId" | "category_id" => Some(PostSortField::CategoryId),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            PostSortField::Id => "id",
            PostSortField::Title => "title",
            PostSortField::Description => "description",
            PostSortField::Content => "content",
            PostSortField::CategoryId => "category_id",
        }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_no: i64,
    pub page_size: i64,
    pub sort_by: PostSortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        self.page_no.saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_no: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: PostSortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = ApiError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        if params.page_no < 0 {
            return Err(ApiError::BadRequest(
                "Page index must not be less than zero".to_string(),
            ));
        }
        if params.page_size < 1 {
            return Err(ApiError::BadRequest(
                "Page size must not be less than one".to_string(),
            ));
        }
        let sort_by = PostSortField::parse(&params.sort_by).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "No property '{}' found for type 'Post'",
                params.sort_by
            ))
        })?;

        Ok(Self {
            page_no: params.page_no,
            page_size: params.page_size,
            sort_by,
            direction: SortDirection::parse(&params.sort_dir),
        })
    }
}

/// One slice of a larger result set plus the size of the whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
}

/// `(total_pages, last)` for a result set of `total_elements` split into pages of
/// `page_size`, as seen from page `page_no`.
pub fn page_accounting(page_no: i64, page_size: i64, total_elements: i64) -> (i64, bool) {
    // Query values reach here unbounded; no intermediate sum may overflow.
    let total_pages = if page_size > 0 {
        total_elements / page_size + i64::from(total_elements % page_size != 0)
    } else {
        0
    };
    (total_pages, page_no.saturating_add(1) >= total_pages)
}
