#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde::Serialize;
use serde_json::Value;
use taskboard::{app, WebsiteConfig, WebsiteState};
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

pub struct TestApp {
    pub state: WebsiteState,
    app: NormalizePath<Router>,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = WebsiteState::new(WebsiteConfig::stub());
        state.database().run_migrations().await;
        Self {
            app: app(state.clone()),
            state,
        }
    }

    pub fn browser(&self) -> Browser<'_> {
        Browser {
            app: self,
            cookie: None,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Keeps the session cookie between requests like a real browser would.
pub struct Browser<'a> {
    app: &'a TestApp,
    cookie: Option<String>,
}

impl Browser<'_> {
    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let response = self.app.send(builder.body(body).unwrap()).await;

        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let pair = value.split_once(';').map(|(pair, _)| pair).unwrap_or(value);
            self.cookie = Some(pair.to_owned());
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    pub async fn post_form<T: Serialize>(&mut self, uri: &str, form: &T) -> Response<Body> {
        let body = serde_urlencoded::to_string(form).unwrap();
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> Response<Body> {
        self.post_raw_json(uri, body.to_string()).await
    }

    pub async fn post_raw_json(&mut self, uri: &str, body: String) -> Response<Body> {
        self.post_body(uri, "application/json", body).await
    }

    pub async fn post_body(&mut self, uri: &str, content_type: &str, body: String) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type),
            Body::from(body),
        )
        .await
    }

    pub async fn post_multipart(&mut self, uri: &str, boundary: &str, body: Vec<u8>) -> Response<Body> {
        self.send(
            Request::builder().method("POST").uri(uri).header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            ),
            Body::from(body),
        )
        .await
    }

    pub async fn register(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/register",
            &[("username", username), ("password", password)],
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &[("username", username), ("password", password)])
            .await
    }

    /// Registers and logs in, asserting both steps went through.
    pub async fn sign_up(&mut self, username: &str) {
        let response = self.register(username, "verysecurepass").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let response = self.login(username, "verysecurepass").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("no location header")
        .to_str()
        .unwrap()
}

pub async fn text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
