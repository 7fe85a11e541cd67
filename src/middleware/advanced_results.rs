use crate::database::{Document, Repository, StoreError};
use crate::filter::{AdvancedQuery, Filter, Pagination};
use crate::middleware::response::ApiResponse;

/// One page of a collection read through the advanced query language
#[derive(Debug)]
pub struct AdvancedResults {
    pub data: Vec<Document>,
    pub pagination: Pagination,
}

impl AdvancedResults {
    /// Run `query` against `repo`.
    ///
    /// The total behind the page links counts the whole collection, not the
    /// filtered set.
    pub async fn fetch(repo: &Repository, query: &AdvancedQuery) -> Result<Self, StoreError> {
        let total = repo.count(&Filter::new()).await?;
        let data = repo.select_any(&query.to_find_query()).await?;
        Ok(Self {
            data,
            pagination: query.pagination(total),
        })
    }

    pub fn into_response(self) -> ApiResponse<Vec<Document>> {
        ApiResponse::list(self.data).with_pagination(self.pagination)
    }
}
