//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use super::checkout::OrderView;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::forms::{FieldErrors, ProfileForm};
use crate::middleware::{RequireAuth, set_flash};
use crate::models::{CurrentUser, User, session_keys};
use crate::services::{AccountError, AccountService};
use crate::state::AppState;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: Page,
    pub email: String,
    pub form: ProfileForm,
    pub errors: FieldErrors,
    pub orders: Vec<OrderView>,
}

async fn render(
    state: &AppState,
    session: &Session,
    current: &CurrentUser,
    user: &User,
    form: ProfileForm,
    errors: FieldErrors,
) -> Result<Response> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(AccountIndexTemplate {
        page: Page::load(session, Some(current)).await,
        email: user.email.to_string(),
        form,
        errors,
        orders: orders.iter().map(OrderView::from).collect(),
    }
    .into_response())
}

/// Display the profile form and order history.
#[instrument(skip(state, session, current))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Response> {
    let user = AccountService::new(state.pool()).get_user(current.id).await?;
    let form = ProfileForm::from_user(&user);
    render(&state, &session, &current, &user, form, FieldErrors::default()).await
}

/// Update the profile.
#[instrument(skip(state, session, current, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let accounts = AccountService::new(state.pool());

    let errors = match form.validate() {
        Ok(update) => match accounts.update_profile(current.id, update).await {
            Ok(user) => {
                // Keep the greeting in the layout current
                session
                    .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
                    .await
                    .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
                if let Err(e) = set_flash(&session, "Profile updated.").await {
                    tracing::warn!("Failed to queue profile notice: {e}");
                }
                return Ok(Redirect::to("/account").into_response());
            }
            Err(AccountError::AlreadyExists(_)) => {
                let mut errors = FieldErrors::default();
                errors.add("phone", "This phone number is already in use.");
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let user = accounts.get_user(current.id).await?;
    render(&state, &session, &current, &user, form, errors).await
}
