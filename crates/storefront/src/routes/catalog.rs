//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Page, media_url};
use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Category, Product, ProductDetail};
use crate::state::AppState;

/// Maximum products on one listing page.
const PAGE_SIZE: i64 = 60;

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub name: String,
    pub slug: String,
    pub price: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            price: product.price.to_string(),
            image: product.main_image.as_deref().map(media_url),
        }
    }
}

/// Category link display data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub name: String,
    pub slug: String,
    pub active: bool,
}

/// Size option display data for templates.
#[derive(Clone)]
pub struct SizeOptionView {
    pub id: i64,
    pub name: String,
    pub in_stock: bool,
}

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub color: String,
    pub description: String,
    pub category_name: String,
    pub category_slug: String,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub sizes: Vec<SizeOptionView>,
}

impl From<&ProductDetail> for ProductView {
    fn from(detail: &ProductDetail) -> Self {
        let product = &detail.product;
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            price: product.price.to_string(),
            color: product.color.clone(),
            description: product.description.clone(),
            category_name: detail.category.name.clone(),
            category_slug: detail.category.slug.clone(),
            main_image: product.main_image.as_deref().map(media_url),
            images: detail.images.iter().map(|i| media_url(&i.image)).collect(),
            sizes: detail
                .sizes
                .iter()
                .map(|s| SizeOptionView {
                    id: s.id.as_i64(),
                    name: s.size_name.clone(),
                    in_stock: s.in_stock(),
                })
                .collect(),
        }
    }
}

/// Catalog listing query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub page: Page,
    pub title: String,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductCardView>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/show.html")]
pub struct ProductTemplate {
    pub page: Page,
    pub product: ProductView,
}

fn category_views(categories: &[Category], active: Option<&Category>) -> Vec<CategoryView> {
    categories
        .iter()
        .map(|c| CategoryView {
            name: c.name.clone(),
            slug: c.slug.clone(),
            active: active.is_some_and(|a| a.id == c.id),
        })
        .collect()
}

/// Display the product listing, optionally filtered by category.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    let catalog = CatalogRepository::new(state.pool());

    let category = match query.category.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => Some(
            catalog
                .get_category_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?,
        ),
        None => None,
    };

    let products = catalog
        .list_products(category.as_ref().map(|c| c.id), PAGE_SIZE)
        .await?;
    let categories = catalog.list_categories().await?;

    Ok(CatalogTemplate {
        page: Page::load(&session, user.as_ref()).await,
        title: category
            .as_ref()
            .map_or_else(|| "Catalog".to_owned(), |c| c.name.clone()),
        categories: category_views(&categories, category.as_ref()),
        products: products.iter().map(ProductCardView::from).collect(),
    })
}

/// Display one product.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = CatalogRepository::new(state.pool())
        .product_detail(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    Ok(ProductTemplate {
        page: Page::load(&session, user.as_ref()).await,
        product: ProductView::from(&detail),
    })
}
