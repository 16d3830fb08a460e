use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use dongne_types::api::{FieldError, ItemQuery, NewItem};
use dongne_types::models::{CategoryId, ItemId, ItemStatus};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::images::{MAX_IMAGE_BYTES, MAX_IMAGES, thumbnail_data_url};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const INVALID_ITEM: &str = "Invalid item data";

/// GET /api/items
pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query
        .into_filter()
        .map_err(|errors| ApiError::validation("Invalid query", errors))?;
    let items = blocking(&state, move |db| db.list_items(&filter)).await?;
    Ok(Json(items))
}

/// GET /api/items/{id}
///
/// Counts the view after reading, so the response shows the count before this visit.
pub async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ItemId>,
    viewer: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = viewer.map(|Extension(user)| user.id);
    let item = blocking(&state, move |db| {
        let Some(item) = db.get_item(id, viewer.as_deref())? else {
            return Ok(None);
        };
        db.increment_views(id)?;
        Ok(Some(item))
    })
    .await?;

    item.map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".into()))
}

/// Text fields of the `POST /api/items` multipart form, as submitted.
#[derive(Debug, Default)]
pub struct ItemForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category_id: Option<String>,
    pub region_code: Option<String>,
    pub is_negotiable: Option<String>,
    pub status: Option<String>,
}

impl ItemForm {
    /// Check every field and report all failures at once.
    pub fn validate(
        self,
        seller_id: &str,
        default_region: &str,
    ) -> Result<NewItem, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = self.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        } else if title.chars().count() > MAX_TITLE_CHARS {
            errors.push(FieldError::new("title", format!("Title must be at most {MAX_TITLE_CHARS} characters")));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            errors.push(FieldError::new(
                "description",
                format!("Description must be at most {MAX_DESCRIPTION_CHARS} characters"),
            ));
        }

        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("price", "Price is required"));
                0
            }
            Some(raw) => match raw.parse::<i64>() {
                Ok(p) if p >= 0 => p,
                Ok(_) => {
                    errors.push(FieldError::new("price", "Price must not be negative"));
                    0
                }
                Err(_) => {
                    errors.push(FieldError::new("price", "Price must be a whole number"));
                    0
                }
            },
        };

        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("categoryId", "Category is required"));
                0
            }
            Some(raw) => raw.parse::<CategoryId>().unwrap_or_else(|_| {
                errors.push(FieldError::new("categoryId", "Category must be a number"));
                0
            }),
        };

        let region_code = self
            .region_code
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| default_region.to_string());

        let is_negotiable = match self.is_negotiable.as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") | Some("off") => false,
            Some("true") | Some("1") | Some("on") => true,
            Some(_) => {
                errors.push(FieldError::new("isNegotiable", "Expected true or false"));
                false
            }
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => ItemStatus::Active,
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                errors.push(FieldError::new("status", e));
                ItemStatus::Active
            }),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewItem {
            seller_id: seller_id.to_string(),
            title,
            description,
            price,
            category_id,
            region_code,
            images: Vec::new(),
            status,
            is_negotiable,
        })
    }
}

/// POST /api/items (multipart)
pub async fn create_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let mut form = ItemForm::default();
    let mut uploads: Vec<Vec<u8>> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" {
            if uploads.len() >= MAX_IMAGES {
                return Err(ApiError::BadRequest(format!("At most {MAX_IMAGES} images are allowed")));
            }
            let mut data = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
            {
                if data.len() + chunk.len() > MAX_IMAGE_BYTES {
                    warn!("User {} sent an image over the size limit", user.id);
                    return Err(ApiError::BadRequest("Each image must be at most 5 MB".into()));
                }
                data.extend_from_slice(&chunk);
            }
            if !data.is_empty() {
                uploads.push(data);
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let slot = match name.as_str() {
            "title" => &mut form.title,
            "description" => &mut form.description,
            "price" => &mut form.price,
            "categoryId" => &mut form.category_id,
            "regionCode" => &mut form.region_code,
            "isNegotiable" => &mut form.is_negotiable,
            "status" => &mut form.status,
            _ => continue,
        };
        *slot = Some(value);
    }

    let mut new = form
        .validate(&user.id, &state.config.default_region)
        .map_err(|errors| ApiError::validation(INVALID_ITEM, errors))?;

    if !uploads.is_empty() {
        new.images = tokio::task::spawn_blocking(move || {
            uploads
                .iter()
                .map(|bytes| thumbnail_data_url(bytes))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal server error".into())
        })?
        .map_err(|e| {
            warn!("Rejected undecodable image from {}: {}", user.id, e);
            ApiError::validation(
                INVALID_ITEM,
                vec![FieldError::new("images", "Could not read image")],
            )
        })?;
    }

    let created = blocking(&state, move |db| {
        if !db.category_exists(new.category_id)? {
            return Ok(None);
        }
        db.create_item(&new).map(Some)
    })
    .await?;

    let item = created.ok_or_else(|| {
        ApiError::validation(INVALID_ITEM, vec![FieldError::new("categoryId", "Unknown category")])
    })?;

    info!("User {} listed item {} ({} images)", user.id, item.id, item.images.len());
    Ok((StatusCode::CREATED, Json(item)))
}
