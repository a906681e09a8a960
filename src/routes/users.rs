// src/routes/users.rs
//
// User accounts, permissions, and appearance settings. Everything except
// login and own-appearance edits is admin-only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::{query, query_as};
use uuid::Uuid;

use crate::auth::{
    hash_password, verify_password, AuthContext, FEATURE_PERMISSIONS, USER_ROLES,
};
use crate::models::AppUser;
use crate::AppState;

use super::{forbidden, internal_error};

pub const THEMES: [&str; 8] = [
    "light", "dark", "blue", "ocean", "skyblue", "darkgreen", "darkgold", "classic",
];
pub const FONT_STYLES: [&str; 5] = ["inter", "poppins", "roboto-slab", "open-sans", "merriweather"];
pub const FONT_SIZES: [&str; 4] = ["small", "normal", "large", "xlarge"];

fn validate_role(role: &str) -> Result<(), (StatusCode, String)> {
    if USER_ROLES.contains(&role) {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, format!("unknown role '{role}'")))
    }
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/login: credential check only; session handling lives with
/// the identity collaborator.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AppUser>, (StatusCode, String)> {
    let user = query_as::<_, AppUser>(r#"SELECT * FROM public.app_users WHERE username=$1"#)
        .bind(&body.username)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?;

    match user {
        Some(u) if verify_password(&body.password, &u.password_salt, &u.password_hash) => {
            Ok(Json(u))
        }
        _ => Err((
            StatusCode::UNAUTHORIZED,
            "invalid username or password".to_string(),
        )),
    }
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AppUser>>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage users"));
    }
    let rows = query_as::<_, AppUser>(r#"SELECT * FROM public.app_users ORDER BY username"#)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct CreateUserBody {
    pub username: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub password: String,
    pub role: String,
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<CreateUserBody>,
) -> Result<Json<AppUser>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage users"));
    }
    validate_role(&b.role)?;

    let salt = Uuid::new_v4().simple().to_string();
    let hash = hash_password(&b.password, &salt);

    let row = query_as::<_, AppUser>(
        r#"
        INSERT INTO public.app_users(username, email, mobile, password_hash, password_salt, role)
        VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT (username) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&b.username)
    .bind(&b.email)
    .bind(&b.mobile)
    .bind(&hash)
    .bind(&salt)
    .bind(&b.role)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((
        StatusCode::CONFLICT,
        format!("username '{}' already exists", b.username),
    ))?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct PatchUserBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// PATCH /api/v1/users/:id
pub async fn patch_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<PatchUserBody>,
) -> Result<Json<AppUser>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage users"));
    }
    if let Some(role) = &b.role {
        validate_role(role)?;
    }

    // A password change re-salts.
    let (hash, salt) = match &b.password {
        Some(pw) => {
            let salt = Uuid::new_v4().simple().to_string();
            (Some(hash_password(pw, &salt)), Some(salt))
        }
        None => (None, None),
    };

    let row = query_as::<_, AppUser>(
        r#"
        UPDATE public.app_users SET
          username = COALESCE($2, username),
          email = COALESCE($3, email),
          mobile = COALESCE($4, mobile),
          password_hash = COALESCE($5, password_hash),
          password_salt = COALESCE($6, password_salt),
          role = COALESCE($7, role),
          updated_at = now()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.username)
    .bind(b.email)
    .bind(b.mobile)
    .bind(hash)
    .bind(salt)
    .bind(b.role)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "user not found".to_string()))?;
    Ok(Json(row))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage users"));
    }
    if id == ctx.user_id {
        return Err((
            StatusCode::CONFLICT,
            "you cannot delete your own account".to_string(),
        ));
    }
    let res = query(r#"DELETE FROM public.app_users WHERE user_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::json!({"deleted": res.rows_affected() > 0})))
}

#[derive(Deserialize)]
pub struct PermissionsBody {
    pub allowed_locations: Vec<String>,
    pub feature_permissions: Vec<String>,
}

/// PUT /api/v1/users/:id/permissions
pub async fn set_permissions(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<PermissionsBody>,
) -> Result<Json<AppUser>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage permissions"));
    }
    for code in &b.feature_permissions {
        if !FEATURE_PERMISSIONS.contains(&code.as_str()) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown feature permission '{code}'"),
            ));
        }
    }

    let row = query_as::<_, AppUser>(
        r#"
        UPDATE public.app_users SET
          allowed_locations = $2,
          permissions = $3,
          updated_at = now()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&b.allowed_locations)
    .bind(&b.feature_permissions)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "user not found".to_string()))?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct AppearanceBody {
    pub theme: Option<String>,
    pub font_style: Option<String>,
    pub font_size: Option<String>,
}

/// PUT /api/v1/users/:id/appearance: users may restyle themselves; admins
/// may restyle anyone. Unknown option values are rejected.
pub async fn set_appearance(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<AppearanceBody>,
) -> Result<Json<AppUser>, (StatusCode, String)> {
    if id != ctx.user_id && !ctx.is_admin() {
        return Err(forbidden("you can only change your own appearance settings"));
    }
    if let Some(t) = &b.theme {
        if !THEMES.contains(&t.as_str()) {
            return Err((StatusCode::BAD_REQUEST, format!("unknown theme '{t}'")));
        }
    }
    if let Some(f) = &b.font_style {
        if !FONT_STYLES.contains(&f.as_str()) {
            return Err((StatusCode::BAD_REQUEST, format!("unknown font style '{f}'")));
        }
    }
    if let Some(s) = &b.font_size {
        if !FONT_SIZES.contains(&s.as_str()) {
            return Err((StatusCode::BAD_REQUEST, format!("unknown font size '{s}'")));
        }
    }

    let row = query_as::<_, AppUser>(
        r#"
        UPDATE public.app_users SET
          theme = COALESCE($2, theme),
          font_style = COALESCE($3, font_style),
          font_size = COALESCE($4, font_size),
          updated_at = now()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.theme)
    .bind(b.font_style)
    .bind(b.font_size)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "user not found".to_string()))?;
    Ok(Json(row))
}
