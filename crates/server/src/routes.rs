//! Route table and request handlers.

use axum::extract::{Multipart, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use croco_core::{clean_word, normalize_words, Error};
use croco_store::WordOrder;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AdminUser, BasicAdmin, BasicUser, SessionUser, SESSION_COOKIE};
use crate::error::AppError;
use crate::html::{self, DEFAULT_WORD_COUNT, MAX_WORDS_PAGE_SIZE, MAX_WORD_COUNT};
use crate::state::AppState;
use crate::upload::{process_uploads, UploadReport, UploadedFile};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/words", get(words_page))
        .route("/words/edit", post(edit_word))
        .route("/words.txt", get(download_words))
        .route("/upload", post(upload))
        .route("/usage/reset", post(reset_usage))
        .route("/admin", get(admin_page))
        .route("/admin/users/create", post(admin_create_user))
        .route("/admin/users/password", post(admin_change_password))
        .route("/admin/users/role", post(admin_change_role))
        .route("/admin/users/delete", post(admin_delete_user))
        .route("/admin/users/reset-usage", post(admin_reset_usage))
        .route("/api/upload", post(api_upload))
        .route("/api/words", get(api_words))
        .route("/api/users", post(api_create_user))
        .with_state(state)
}

/// Run store work off the async workers; rusqlite calls block.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> croco_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

/// Redirect carrying a flash message in the query string. Messages are
/// plain ASCII phrases; spaces form-encode as `+`.
fn flash(path: &str, message: &str) -> Redirect {
    let encoded = message.replace(' ', "+");
    Redirect::to(&format!("{path}?msg={encoded}"))
}

/// HTML checkboxes submit "on" (or nothing); API clients may send other
/// spellings of true.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

fn session_cookie(token: &str, max_age: i64) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}"
    ))
    .map_err(|e| AppError::Internal(e.to_string()))
}

// --- HTML surface ---

async fn index(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Html<String>, AppError> {
    let store = state.store.clone();
    let total = blocking(move || store.count_words()).await?;
    Ok(Html(html::render_index(&user.username, user.is_admin, total)))
}

async fn login_page() -> Html<String> {
    Html(html::render_login("", None))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let store = state.store.clone();
    let username = form.username.clone();
    let password = form.password.clone();
    let verified = blocking(move || store.verify_credentials(&username, &password)).await?;

    let Some(user) = verified else {
        info!("failed login for {}", form.username);
        return Ok((
            StatusCode::UNAUTHORIZED,
            Html(html::render_login(
                &form.username,
                Some("Invalid username or password."),
            )),
        )
            .into_response());
    };

    let store = state.store.clone();
    let token = blocking(move || store.create_session(user.id)).await?;
    let cookie = session_cookie(&token, croco_store::SESSION_TTL_SECONDS)?;

    info!("login for {}", user.username);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = crate::auth::cookie_value(&headers, SESSION_COOKIE) {
        let store = state.store.clone();
        blocking(move || store.delete_session(&token)).await?;
    }
    let cookie = session_cookie("", 0)?;
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/login")).into_response())
}

#[derive(Deserialize)]
struct WordsQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    order: Option<String>,
    msg: Option<String>,
}

fn parse_order(value: Option<&str>) -> WordOrder {
    match value {
        Some("created_desc") => WordOrder::CreatedDesc,
        _ => WordOrder::Alpha,
    }
}

async fn words_page(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<WordsQuery>,
) -> Result<Html<String>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(200)
        .clamp(1, MAX_WORDS_PAGE_SIZE);
    let order = parse_order(query.order.as_deref());
    let offset = (page - 1) * per_page;

    let store = state.store.clone();
    let user_id = user.id;
    let (total, words) = blocking(move || {
        let total = store.count_words()?;
        let words = store.list_words(user_id, per_page, offset, order)?;
        Ok((total, words))
    })
    .await?;

    let order_name = match order {
        WordOrder::Alpha => "alpha",
        WordOrder::CreatedDesc => "created_desc",
    };
    Ok(Html(html::render_words_page(&html::WordsPage {
        username: &user.username,
        words: &words,
        total,
        page,
        per_page,
        order: order_name,
        message: query.msg.as_deref(),
    })))
}

#[derive(Deserialize)]
struct EditForm {
    word_id: i64,
    word: String,
}

async fn edit_word(
    State(state): State<AppState>,
    SessionUser(_user): SessionUser,
    Form(form): Form<EditForm>,
) -> Result<Redirect, AppError> {
    let store = state.store.clone();
    let speller = state.speller.clone();
    let outcome = blocking(move || {
        let cleaned = clean_word(&form.word);
        if cleaned.is_empty() {
            return Ok(None);
        }
        let mut checked = normalize_words([cleaned], speller.as_ref())?;
        let Some(word) = checked.pop() else {
            return Ok(None);
        };
        store.update_word(form.word_id, &word)?;
        Ok(Some(word))
    })
    .await;

    match outcome {
        Ok(Some(_)) => Ok(flash("/words", "Word updated")),
        Ok(None) => Ok(flash("/words", "Word is empty after cleaning")),
        Err(AppError::Core(Error::Conflict(_))) => Ok(flash("/words", "Word already exists")),
        Err(AppError::Core(Error::NotFound(_))) => Ok(flash("/words", "Word not found")),
        Err(e) => Err(e),
    }
}

/// Buffer every file field of a multipart body.
async fn collect_uploads(mut multipart: Multipart) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Core(Error::InvalidInput(e.to_string())))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Core(Error::InvalidInput(e.to_string())))?;
        files.push(UploadedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(AppError::Core(Error::InvalidInput(
            "no files in upload".to_string(),
        )));
    }
    Ok(files)
}

async fn run_upload(state: &AppState, files: Vec<UploadedFile>) -> Result<UploadReport, AppError> {
    let store = state.store.clone();
    let speller = state.speller.clone();
    blocking(move || process_uploads(&store, speller.as_ref(), &files)).await
}

async fn upload(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let files = collect_uploads(multipart).await?;
    let report = run_upload(&state, files).await?;
    info!(
        "upload by {}: {} extracted, {} inserted",
        user.username, report.extracted, report.inserted
    );
    Ok(Html(html::render_upload_result(&user.username, &report)))
}

#[derive(Deserialize)]
struct DownloadQuery {
    n: Option<i64>,
    shuffle: Option<String>,
}

async fn download_words(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let n = query.n.unwrap_or(DEFAULT_WORD_COUNT).clamp(1, MAX_WORD_COUNT);
    let shuffle = parse_flag(query.shuffle.as_deref());

    let store = state.store.clone();
    let user_id = user.id;
    let mut words = blocking(move || store.select_words_for_user(user_id, n)).await?;

    if shuffle {
        words.shuffle(&mut rand::thread_rng());
    }

    let mut body = words.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    info!("words.txt for {}: {} words", user.username, words.len());
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=words.txt"),
            ),
        ],
        body,
    )
        .into_response())
}

async fn reset_usage(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Redirect, AppError> {
    let store = state.store.clone();
    let user_id = user.id;
    blocking(move || store.reset_user_usage(user_id)).await?;
    info!("usage reset for {}", user.username);
    Ok(Redirect::to("/"))
}

// --- Admin surface ---

#[derive(Deserialize)]
struct AdminQuery {
    msg: Option<String>,
}

async fn admin_page(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<AdminQuery>,
) -> Result<Html<String>, AppError> {
    let store = state.store.clone();
    let users = blocking(move || store.list_users()).await?;
    Ok(Html(html::render_admin(
        &user.username,
        &users,
        query.msg.as_deref(),
    )))
}

#[derive(Deserialize)]
struct CreateUserForm {
    username: String,
    password: String,
    is_admin: Option<String>,
}

async fn admin_create_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<CreateUserForm>,
) -> Result<Redirect, AppError> {
    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return Ok(flash("/admin", "Username and password are required"));
    }
    let is_admin = parse_flag(form.is_admin.as_deref());

    let store = state.store.clone();
    let outcome =
        blocking(move || store.create_user(&username, &form.password, is_admin)).await;
    match outcome {
        Ok(_) => Ok(flash("/admin", "User created")),
        Err(AppError::Core(Error::Conflict(_))) => Ok(flash("/admin", "User already exists")),
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
struct PasswordForm {
    username: String,
    password: String,
}

async fn admin_change_password(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect, AppError> {
    if form.password.is_empty() {
        return Ok(flash("/admin", "Password is required"));
    }
    let store = state.store.clone();
    let outcome =
        blocking(move || store.update_user_password(&form.username, &form.password)).await;
    match outcome {
        Ok(()) => Ok(flash("/admin", "Password updated")),
        Err(AppError::Core(Error::NotFound(_))) => Ok(flash("/admin", "User not found")),
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
struct RoleForm {
    username: String,
    is_admin: Option<String>,
}

async fn admin_change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<RoleForm>,
) -> Result<Redirect, AppError> {
    let is_admin = parse_flag(form.is_admin.as_deref());
    if form.username == admin.username && !is_admin {
        return Ok(flash("/admin", "You cannot demote yourself"));
    }

    let store = state.store.clone();
    let username = form.username.clone();
    let outcome = blocking(move || {
        let Some(target) = store.get_user_by_username(&username)? else {
            return Err(Error::NotFound(format!("no such user: {username}")));
        };
        if target.is_admin && !is_admin && store.count_admins()? <= 1 {
            return Err(Error::Forbidden("last admin".to_string()));
        }
        store.update_user_admin(&username, is_admin)
    })
    .await;

    match outcome {
        Ok(()) => Ok(flash("/admin", "Role updated")),
        Err(AppError::Core(Error::NotFound(_))) => Ok(flash("/admin", "User not found")),
        Err(AppError::Core(Error::Forbidden(_))) => {
            Ok(flash("/admin", "Cannot demote the last admin"))
        }
        Err(e) => Err(e),
    }
}

#[derive(Deserialize)]
struct TargetForm {
    username: String,
}

async fn admin_delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<TargetForm>,
) -> Result<Redirect, AppError> {
    if form.username == admin.username {
        return Ok(flash("/admin", "You cannot delete yourself"));
    }

    let store = state.store.clone();
    let username = form.username.clone();
    let outcome = blocking(move || {
        let Some(target) = store.get_user_by_username(&username)? else {
            return Err(Error::NotFound(format!("no such user: {username}")));
        };
        if target.is_admin && store.count_admins()? <= 1 {
            return Err(Error::Forbidden("last admin".to_string()));
        }
        store.delete_user(&username)
    })
    .await;

    match outcome {
        Ok(()) => Ok(flash("/admin", "User deleted")),
        Err(AppError::Core(Error::NotFound(_))) => Ok(flash("/admin", "User not found")),
        Err(AppError::Core(Error::Forbidden(_))) => {
            Ok(flash("/admin", "Cannot delete the last admin"))
        }
        Err(e) => Err(e),
    }
}

async fn admin_reset_usage(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<TargetForm>,
) -> Result<Redirect, AppError> {
    let store = state.store.clone();
    let username = form.username.clone();
    let outcome = blocking(move || {
        let Some(target) = store.get_user_by_username(&username)? else {
            return Err(Error::NotFound(format!("no such user: {username}")));
        };
        store.reset_user_usage(target.id)
    })
    .await;

    match outcome {
        Ok(()) => Ok(flash("/admin", "Usage reset")),
        Err(AppError::Core(Error::NotFound(_))) => Ok(flash("/admin", "User not found")),
        Err(e) => Err(e),
    }
}

// --- JSON API ---

async fn api_upload(
    State(state): State<AppState>,
    BasicUser(user): BasicUser,
    multipart: Multipart,
) -> Result<Json<UploadReport>, AppError> {
    let files = collect_uploads(multipart).await?;
    let report = run_upload(&state, files).await?;
    info!(
        "api upload by {}: {} extracted, {} inserted",
        user.username, report.extracted, report.inserted
    );
    Ok(Json(report))
}

#[derive(Serialize)]
struct WordListResponse {
    count: usize,
    words: Vec<String>,
}

/// Same selection semantics as the words.txt download, JSON-shaped.
/// Stamps usage for the returned words.
async fn api_words(
    State(state): State<AppState>,
    BasicUser(user): BasicUser,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<WordListResponse>, AppError> {
    let n = query.n.unwrap_or(DEFAULT_WORD_COUNT).clamp(1, MAX_WORD_COUNT);
    let shuffle = parse_flag(query.shuffle.as_deref());

    let store = state.store.clone();
    let user_id = user.id;
    let mut words = blocking(move || store.select_words_for_user(user_id, n)).await?;
    if shuffle {
        words.shuffle(&mut rand::thread_rng());
    }

    Ok(Json(WordListResponse {
        count: words.len(),
        words,
    }))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    is_admin: Option<bool>,
}

#[derive(Serialize)]
struct CreateUserResponse {
    id: i64,
    username: String,
    is_admin: bool,
}

async fn api_create_user(
    State(state): State<AppState>,
    BasicAdmin(_admin): BasicAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<Response, AppError> {
    let username = request.username.trim().to_string();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::Core(Error::InvalidInput(
            "username and password are required".to_string(),
        )));
    }
    let is_admin = request.is_admin.unwrap_or(false);

    let store = state.store.clone();
    let name = username.clone();
    let id = blocking(move || store.create_user(&name, &request.password, is_admin)).await?;

    let body = Json(CreateUserResponse {
        id,
        username,
        is_admin,
    });
    Ok((StatusCode::CREATED, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_truthy_spellings() {
        assert!(parse_flag(Some("on")));
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("YES")));
        assert!(!parse_flag(Some("off")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order(Some("created_desc")), WordOrder::CreatedDesc);
        assert_eq!(parse_order(Some("alpha")), WordOrder::Alpha);
        assert_eq!(parse_order(Some("bogus")), WordOrder::Alpha);
        assert_eq!(parse_order(None), WordOrder::Alpha);
    }
}
