use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    config::AppConfig,
    error::{AppError, RenderError},
    models::{AllSetting, Inbound, InboundForm, LoginForm, Msg, UpdateUserForm},
    render::{INBOUNDS_PAGE, LOGIN_PAGE, Renderer, SETTING_PAGE, STATUS_PAGE},
    repository::RepositoryState,
    session::{build_clear_cookie, build_session_cookie},
};
use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::time::Duration;

// --- Pages ---

/// index
///
/// [Panel Route] Status overview page.
pub async fn index(State(renderer): State<Renderer>) -> Result<Html<String>, RenderError> {
    renderer.page(STATUS_PAGE)
}

/// inbounds
///
/// [Panel Route] Inbound list page. The list itself is fetched by the page
/// through `/xpanel/inbound/list`.
pub async fn inbounds(State(renderer): State<Renderer>) -> Result<Html<String>, RenderError> {
    renderer.page(INBOUNDS_PAGE)
}

/// setting
///
/// [Panel Route] Settings page.
pub async fn setting(State(renderer): State<Renderer>) -> Result<Html<String>, RenderError> {
    renderer.page(SETTING_PAGE)
}

const PANEL_CSS: &str = include_str!("../assets/css/panel.css");

/// panel_css
///
/// [Public Route] The stylesheet every page links to. Compiled into the
/// binary alongside the embedded templates.
pub async fn panel_css() -> Response {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        PANEL_CSS,
    )
        .into_response()
}

// --- Login ---

/// login_page
///
/// [Public Route] Shows the login form, or forwards a browser that already
/// holds a valid session straight into the panel.
pub async fn login_page(
    user: Result<AuthUser, StatusCode>,
    State(renderer): State<Renderer>,
) -> Response {
    if user.is_ok() {
        return Redirect::temporary("/xpanel/").into_response();
    }

    renderer.page(LOGIN_PAGE).into_response()
}

/// login
///
/// [Public Route] Verifies the submitted credentials and hands out a session
/// cookie. Wrong credentials are answered with `success: false`, not with an
/// error status, so the login form can show the message.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Login outcome", body = Msg))
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if form.username.is_empty() {
        return Ok(Json(Msg::fail("请输入用户名")).into_response());
    }
    if form.password.is_empty() {
        return Ok(Json(Msg::fail("请输入密码")).into_response());
    }

    let user = match state.repo.check_user(&form.username, &form.password).await {
        Some(user) => user,
        None => {
            tracing::warn!(username = %form.username, "Failed panel login");
            return Ok(Json(Msg::fail("用户名或密码错误")).into_response());
        }
    };

    let token = issue_token(user.id, &state.config)?;
    let cookie = build_session_cookie(
        &token,
        Duration::from_secs(state.config.session_max_age),
        state.config.secure_cookie,
    );

    tracing::info!(username = %user.username, "Panel login");
    Ok(([(header::SET_COOKIE, cookie)], Json(Msg::ok("登录成功", None))).into_response())
}

/// logout
///
/// [Public Route] Drops the session cookie and returns to the login page.
pub async fn logout(State(config): State<AppConfig>) -> Response {
    (
        [(header::SET_COOKIE, build_clear_cookie(config.secure_cookie))],
        Redirect::temporary("/"),
    )
        .into_response()
}

// --- Inbounds ---

/// list_inbounds
///
/// [Panel Route] Inbounds owned by the session user.
#[utoipa::path(
    post,
    path = "/xpanel/inbound/list",
    responses(
        (status = 200, description = "Inbounds of the session user", body = Msg),
        (status = 401, description = "No valid session", body = Msg)
    )
)]
pub async fn list_inbounds(
    Extension(user): Extension<AuthUser>,
    State(repo): State<RepositoryState>,
) -> Json<Msg> {
    let inbounds = repo.get_inbounds(user.id).await;
    Json(Msg::obj(&inbounds))
}

/// add_inbound
///
/// [Panel Route] Creates an inbound. Ports are unique across all users.
#[utoipa::path(
    post,
    path = "/xpanel/inbound/add",
    request_body(content = InboundForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Add outcome", body = Msg))
)]
pub async fn add_inbound(
    Extension(user): Extension<AuthUser>,
    State(repo): State<RepositoryState>,
    Form(form): Form<InboundForm>,
) -> Json<Msg> {
    let result = match check_port(form.port) {
        Ok(()) => repo.add_inbound(Inbound::from_form(user.id, form)).await,
        Err(reason) => Err(reason),
    };

    if let Ok(inbound) = &result {
        tracing::info!(id = inbound.id, port = inbound.port, "Inbound added");
    }

    Json(Msg::action("添加", result))
}

/// del_inbound
///
/// [Panel Route] Deletes an inbound owned by the session user.
#[utoipa::path(
    post,
    path = "/xpanel/inbound/del/{id}",
    params(("id" = i64, Path, description = "Inbound ID")),
    responses((status = 200, description = "Delete outcome", body = Msg))
)]
pub async fn del_inbound(
    Extension(user): Extension<AuthUser>,
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Json<Msg> {
    let result = if repo.del_inbound(id, user.id).await {
        tracing::info!(id, "Inbound deleted");
        Ok(())
    } else {
        Err(format!("入站不存在: {}", id))
    };

    Json(Msg::action("删除", result))
}

/// update_inbound
///
/// [Panel Route] Replaces the editable fields of an inbound owned by the
/// session user.
#[utoipa::path(
    post,
    path = "/xpanel/inbound/update/{id}",
    params(("id" = i64, Path, description = "Inbound ID")),
    request_body(content = InboundForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Update outcome", body = Msg))
)]
pub async fn update_inbound(
    Extension(user): Extension<AuthUser>,
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
    Form(form): Form<InboundForm>,
) -> Json<Msg> {
    let result = match check_port(form.port) {
        Ok(()) => repo.update_inbound(id, user.id, form).await,
        Err(reason) => Err(reason),
    };

    Json(Msg::action("修改", result))
}

// Uniqueness is checked by the repository, atomically with the write.
fn check_port(port: u16) -> Result<(), String> {
    if port == 0 {
        return Err("端口无效: 0".to_string());
    }
    Ok(())
}

// --- Settings ---

/// get_all_settings
///
/// [Panel Route] The current panel settings.
#[utoipa::path(
    post,
    path = "/xpanel/setting/all",
    responses((status = 200, description = "Current settings", body = Msg))
)]
pub async fn get_all_settings(State(repo): State<RepositoryState>) -> Json<Msg> {
    let settings = repo.get_settings().await;
    Json(Msg::obj(&settings))
}

/// update_settings
///
/// [Panel Route] Validates and stores new panel settings.
#[utoipa::path(
    post,
    path = "/xpanel/setting/update",
    request_body(content = AllSetting, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Update outcome", body = Msg))
)]
pub async fn update_settings(
    State(repo): State<RepositoryState>,
    Form(mut settings): Form<AllSetting>,
) -> Json<Msg> {
    let result = match settings.check_valid() {
        Ok(()) => {
            let stored = repo.update_settings(settings).await;
            tracing::info!("Panel settings updated");
            Ok(stored)
        }
        Err(reason) => Err(reason),
    };

    Json(Msg::action("修改设置", result))
}

/// update_user
///
/// [Panel Route] Changes the session user's credentials. The current ones
/// must be supplied again.
#[utoipa::path(
    post,
    path = "/xpanel/setting/updateUser",
    request_body(content = UpdateUserForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Update outcome", body = Msg))
)]
pub async fn update_user(
    Extension(user): Extension<AuthUser>,
    State(repo): State<RepositoryState>,
    Form(form): Form<UpdateUserForm>,
) -> Json<Msg> {
    let current = repo
        .check_user(&form.old_username, &form.old_password)
        .await
        .filter(|current| current.id == user.id);

    let result = if current.is_none() {
        Err("原用户名或原密码错误".to_string())
    } else if form.new_username.is_empty() || form.new_password.is_empty() {
        Err("新用户名和新密码不能为空".to_string())
    } else if repo
        .update_user(user.id, form.new_username, form.new_password)
        .await
    {
        Ok(())
    } else {
        Err("用户不存在".to_string())
    };

    Json(Msg::action("修改用户", result))
}
