//! Login, registration, and logout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::forms::{FieldErrors, LoginForm, RegisterForm};
use crate::middleware::auth::is_safe_next;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user, set_flash};
use crate::models::{CurrentUser, User};
use crate::services::{AccountError, AccountService};
use crate::state::AppState;

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

fn safe_next(next: Option<&str>) -> String {
    next.filter(|n| is_safe_next(n))
        .unwrap_or("/account")
        .to_owned()
}

/// Put a freshly authenticated user into the session.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }

    LoginTemplate {
        page: Page::load(&session, None).await,
        email: String::new(),
        next,
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(Some(&form.next));

    match AccountService::new(state.pool())
        .authenticate(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            start_session(&session, &user).await?;
            tracing::info!(user_id = %user.id, "user logged in");
            Ok(Redirect::to(&next).into_response())
        }
        Err(AccountError::InvalidCredentials) => {
            tracing::warn!("Login failed");
            Ok(LoginTemplate {
                page: Page::load(&session, None).await,
                email: form.email,
                next,
                error: Some("Invalid email or password.".to_owned()),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    RegisterTemplate {
        page: Page::load(&session, None).await,
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// A successful registration logs the new user in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let errors = match form.validate() {
        Ok(registration) => {
            match AccountService::new(state.pool()).register(&registration).await {
                Ok(user) => {
                    start_session(&session, &user).await?;
                    let welcome = "Welcome! Your account has been created.";
                    if let Err(e) = set_flash(&session, welcome).await {
                        tracing::warn!("Failed to queue welcome notice: {e}");
                    }
                    return Ok(Redirect::to("/account").into_response());
                }
                Err(AccountError::AlreadyExists(_)) => {
                    let mut errors = FieldErrors::default();
                    errors.add("email", "An account with this email already exists.");
                    errors
                }
                Err(AccountError::WeakPassword(message)) => {
                    let mut errors = FieldErrors::default();
                    errors.add("password", message);
                    errors
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(errors) => errors,
    };

    // Never echo passwords back into the page
    let form = RegisterForm {
        password: String::new(),
        password_confirm: String::new(),
        ..form
    };

    Ok(RegisterTemplate {
        page: Page::load(&session, None).await,
        form,
        errors,
    }
    .into_response())
}

/// Log out and return to the home page.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(Redirect::to("/").into_response())
}
