use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::{headers::Cookie, TypedHeader};
use cookie::{time::Duration, SameSite};

use crate::{
    config::WebsiteConfig,
    errors::AppError,
    log_and_wrap_custom_internal,
    models::User,
    sessions::{Session, Sessions},
    state::WebsiteState,
};

/// The authenticated user behind the current request.
///
/// Extracting it outside of [`login_required_middleware`] still works: a
/// missing or stale session rejects with [`AppError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct Principal(pub User);

impl FromRequestParts<WebsiteState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebsiteState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;
        let user_pk = session.user_pk().await.ok_or(AppError::Unauthorized)?;

        User::find(user_pk, &**state.database())
            .await?
            .map(Principal)
            .ok_or(AppError::Unauthorized)
    }
}

pub async fn login_required_middleware(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if session.is_authenticated().await {
        return next.run(request).await;
    }

    let original = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let query = serde_urlencoded::to_string([("next", original)]).unwrap_or_default();
    Redirect::to(&format!("/login?{}", query)).into_response()
}

pub async fn sessions_middleware(
    State(state): State<WebsiteState>,
    cookie: Option<TypedHeader<Cookie>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sessions = state.sessions();
    let config = state.config();

    let current_session = match cookie
        .as_ref()
        .and_then(|TypedHeader(cookie)| cookie.get(&config.session_cookie_name))
    {
        Some(value) => sessions.find_session(value, &config.session_key).await?,
        None => None,
    };

    let session = match current_session {
        Some(session) => session,
        None => sessions.create_session(config.session_expiration).await?,
    };

    request.extensions_mut().insert(session.clone());

    let mut resp = next.run(request).await;

    sessions.persist(&session).await?;
    set_session_cookies(resp.headers_mut(), &session, config).await?;

    Ok(resp)
}

pub async fn set_session_cookies(
    headers: &mut HeaderMap<HeaderValue>,
    session: &Session,
    config: &WebsiteConfig,
) -> Result<(), AppError> {
    let value = Sessions::cookie_value(session, &config.session_key).await;
    let cookie = cookie::Cookie::build((config.session_cookie_name.as_str(), value))
        .path("/")
        .max_age(Duration::days(config.session_expiration))
        .secure(config.secure_cookies())
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    headers.append(
        SET_COOKIE,
        HeaderValue::from_bytes(cookie.encoded().to_string().as_bytes())
            .map_err(|e| log_and_wrap_custom_internal!(e))?,
    );

    if config.secure_cookies() {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    // Prevent MIME type sniffing.
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );

    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("frame-ancestors 'none'"),
    );

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    Ok(())
}
