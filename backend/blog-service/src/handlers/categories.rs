/// Category handlers - HTTP endpoints for category administration
use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::CategoryListQuery;
use crate::services::{action_result, CategoryService, DeletionError};

#[derive(Debug, Deserialize)]
pub struct ListCategoriesParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn deletion_status(err: &DeletionError) -> StatusCode {
    match err {
        DeletionError::Unauthorized => StatusCode::UNAUTHORIZED,
        DeletionError::Forbidden => StatusCode::FORBIDDEN,
        DeletionError::NotFound => StatusCode::NOT_FOUND,
        DeletionError::CannotDeleteFallback { .. } | DeletionError::FallbackMissing { .. } => {
            StatusCode::CONFLICT
        }
        DeletionError::PartialFailure(_) | DeletionError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Delete a category, re-linking its otherwise uncategorized posts to the
/// fallback category. Always answers with `{"success": ..}` or `{"error": ..}`.
pub async fn delete_category(
    service: web::Data<CategoryService>,
    user_id: Option<UserId>,
    category_id: web::Path<Uuid>,
) -> HttpResponse {
    let requester = user_id.map(|UserId(id)| id);

    let result = service.delete_category(requester, *category_id).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => deletion_status(err),
    };

    HttpResponse::build(status).json(action_result(&result))
}

/// List categories (cached per query)
pub async fn list_categories(
    service: web::Data<CategoryService>,
    params: web::Query<ListCategoriesParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let query = CategoryListQuery::normalized(params.search, params.limit, params.offset);
    let page = service.list_categories(&query).await?;

    Ok(HttpResponse::Ok().json(page.as_ref()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/categories")
            .route("", web::get().to(list_categories))
            .route("/{category_id}", web::delete().to(delete_category)),
    );
}
