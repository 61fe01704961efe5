use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use super::api::certificate_download;
use crate::code::normalize_code;
use crate::flow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    code: String,
}

pub async fn index() -> impl IntoResponse {
    render_form("", None)
}

pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CodeForm>,
) -> Response {
    let code = normalize_code(&form.code);
    match flow::submit(&state, &code).await {
        Ok(certificate) => certificate_download(certificate),
        Err(e) => (e.status_code(), render_form(&code, Some(&e.to_string()))).into_response(),
    }
}

fn render_form(code: &str, error: Option<&str>) -> Html<String> {
    let mut ctx = Context::new();
    ctx.insert("code", code);
    ctx.insert("error", &error);
    render_template("index.html", &ctx)
}

fn render_template(name: &str, ctx: &Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, ctx).unwrap_or_else(|e| {
        tracing::error!("Failed to render {}: {}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}
