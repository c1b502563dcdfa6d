//! Web frontend: builds keyboard-layout APKs from HTML form submissions.

use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::core::builder::ApkBuilder;
use crate::core::config::{APK_DOWNLOAD_NAME, APK_MIME};
use crate::core::layout;

#[derive(Clone)]
pub struct AppState {
    pub builder: Arc<ApkBuilder>,
    pub resources: PathBuf,
}

pub fn create_app(state: AppState) -> Router {
    let public = state.resources.join("public");
    Router::new()
        .route("/", get(index))
        .route("/simple", get(simple_redirect).post(build_simple))
        .route("/complex", get(complex_redirect).post(build_complex))
        .route("/docs", get(docs))
        .fallback_service(ServeDir::new(public))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = create_app(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Redirect {
    Redirect::to("/simple.html")
}

async fn simple_redirect() -> Redirect {
    Redirect::to("/simple.html")
}

async fn complex_redirect() -> Redirect {
    Redirect::to("/complex.html")
}

async fn docs(State(state): State<AppState>) -> Response {
    match tokio::fs::read(state.resources.join("public").join("docs.html")).await {
        Ok(bytes) => Html(bytes).into_response(),
        Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
    }
}

/// Build from the simple form: named base layouts plus `fromN`/`toN`
/// remapping pairs, applied in ascending index order.
async fn build_simple(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let layout_name = form.get("layout").map(String::as_str).filter(|s| !s.is_empty());
    let layout2_name = form
        .get("layout2")
        .map(String::as_str)
        .filter(|s| !s.is_empty() && *s != "-");

    let mut pairs: Vec<(u32, String, String)> = Vec::new();
    for (key, value) in &form {
        let Some(index) = key.strip_prefix("from") else {
            continue;
        };
        let Ok(index) = index.parse::<u32>() else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if let Some(to) = form.get(&format!("to{index}")).filter(|to| !to.is_empty()) {
            pairs.push((index, value.clone(), to.clone()));
        }
    }
    pairs.sort_by_key(|(index, _, _)| *index);
    let mappings: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(_, from, to)| (from, to))
        .collect();

    let layout = match layout::from_named_layout(&state.resources, layout_name, &mappings) {
        Ok(layout) => layout,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };
    let layout2 = match layout2_name {
        Some(name) => match layout::from_named_layout(&state.resources, Some(name), &mappings) {
            Ok(layout2) => Some(layout2),
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        },
        None => None,
    };

    serve_apk(&state, &layout, layout2.as_deref())
}

/// Build from the complex form: raw KCM layout text.
async fn build_complex(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let Some(layout) = form.get("layout").filter(|layout| !layout.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing layout").into_response();
    };
    let layout2 = form.get("layout2").filter(|layout2| !layout2.is_empty());

    serve_apk(&state, layout, layout2.map(String::as_str))
}

fn serve_apk(state: &AppState, layout: &str, layout2: Option<&str>) -> Response {
    match state.builder.build_apk(layout, layout2) {
        Ok(apk) => (
            [
                (header::CONTENT_TYPE, APK_MIME.to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{APK_DOWNLOAD_NAME}\""),
                ),
            ],
            apk,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("error building APK: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::ApkBuilder;
    use crate::core::config::{LAYOUT2_PATH, LAYOUT_PATH};
    use crate::core::signer::fixtures::{template, SIGNING_PEM};
    use crate::core::signer::ApkSigner;
    use axum::body::Body;
    use axum::http::Request;
    use std::io::{Cursor, Read as _};
    use tower::ServiceExt as _;
    use zip::ZipArchive;

    fn test_state() -> AppState {
        let signer = ApkSigner::from_pem(SIGNING_PEM).unwrap();
        let one = template(&[(LAYOUT_PATH, b"type OVERLAY\n")]);
        let two = template(&[
            (LAYOUT_PATH, b"type OVERLAY\n".as_slice()),
            (LAYOUT2_PATH, b"type OVERLAY\n".as_slice()),
        ]);
        AppState {
            builder: Arc::new(ApkBuilder::new(signer, one, two)),
            resources: std::env::temp_dir(),
        }
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn should_redirect_index_to_simple_form() {
        let app = create_app(test_state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/simple.html"
        );
    }

    #[tokio::test]
    async fn should_redirect_simple_get() {
        let app = create_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/simple")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());
    }

    #[tokio::test]
    async fn should_build_apk_from_simple_form() {
        let app = create_app(test_state());
        let response = app
            .oneshot(form_request("/simple", "layout=&from0=58&to0=CTRL_LEFT"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APK_MIME
        );

        let apk = body_bytes(response).await;
        let mut archive = ZipArchive::new(Cursor::new(apk.as_slice())).unwrap();
        assert!(archive.by_name("META-INF/MANIFEST.MF").is_ok());
        let mut kcm = String::new();
        archive
            .by_name(LAYOUT_PATH)
            .unwrap()
            .read_to_string(&mut kcm)
            .unwrap();
        assert!(kcm.contains("map key 58 CTRL_LEFT"));
    }

    #[tokio::test]
    async fn should_build_apk_from_complex_form() {
        let app = create_app(test_state());
        let response = app
            .oneshot(form_request(
                "/complex",
                "layout=type%20OVERLAY%0Amap%20key%2058%20ESC%0A",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APK_MIME
        );
    }

    #[tokio::test]
    async fn should_reject_complex_form_without_layout() {
        let app = create_app(test_state());
        let response = app
            .oneshot(form_request("/complex", "layout2=whatever"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_reject_traversal_layout_names() {
        let app = create_app(test_state());
        let response = app
            .oneshot(form_request(
                "/simple",
                "layout=..%2Fkeymod_key.pem&from0=58&to0=CTRL_LEFT",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
