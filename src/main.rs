#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::Context;
use chrono::Duration;
use log::{error, info};
use std::sync::Arc;

use httpsession::{
    settings::Settings, token::cookie::CookieOptions, AuthCookieSession, CookieSession, MemoryStore,
    SessionError, SessionManager,
};

/// Shared state handed to every handler
struct AppState {
    manager: SessionManager,
    cookie_name: String,
    cookie_options: CookieOptions,
    session_timeout: Duration,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Loads .env and Settings.toml, applies env overrides, initializes the logger
    let settings =
        Settings::load().map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    let config = settings.session_config();
    let manager = SessionManager::new(Arc::new(MemoryStore::new()), settings.codec(), config);
    let state = web::Data::new(AppState {
        manager,
        cookie_name: settings.cookies.name.clone(),
        cookie_options: settings.cookie_options(),
        session_timeout: config.session_timeout,
    });

    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server terminated with an error")
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/visits", web::get().to(visits))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout));
}

fn print_startup_info(bind_address: &str, settings: &Settings) {
    println!("Starting session demo on http://{bind_address}");
    println!("Session codec: {}", settings.session.codec);
    println!(
        "Cookies: {name}_session, {name}_auth (auth), {name}_plain_session (plain)",
        name = settings.cookies.name
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /        - Count visits in this session");
    println!("  GET  /visits  - Count visits in a plain session without auth token");
    println!("  POST /login   - Start a fresh logged-in session");
    println!("  POST /logout  - Terminate the session and drop its cookies");
}

fn open(req: &HttpRequest, state: &AppState) -> Result<AuthCookieSession, HttpResponse> {
    AuthCookieSession::open(
        &state.cookie_name,
        &state.manager,
        req,
        &state.cookie_options,
    )
    .map_err(|e| error_response(&e))
}

fn error_response(err: &SessionError) -> HttpResponse {
    if err.is_authentication_failure() {
        info!("Rejected request: {err}");
        HttpResponse::Unauthorized().body("authentication failed\n")
    } else {
        error!("Session failure: {err}");
        HttpResponse::InternalServerError().body("session unavailable\n")
    }
}

/// Respond with the queued cookies and a plain-text body
fn respond(mut session: AuthCookieSession, body: String) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    session.apply(&mut builder);
    builder.content_type("text/plain; charset=utf-8").body(body)
}

async fn index(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let mut cs = match open(&req, &state) {
        Ok(cs) => cs,
        Err(response) => return response,
    };

    let since = cs.session().duration_since_last_update();
    let count = cs.session().int64_var("count") + 1;
    let logged_in = cs.session().bool_var("login");
    cs.session_mut().set_var("count", count);

    if let Err(e) = cs.save(state.session_timeout) {
        return error_response(&e);
    }

    let body = format!(
        "count: {count}\nlogged in: {logged_in}\nseconds since last visit: {}\n",
        since.num_seconds()
    );
    respond(cs, body)
}

async fn login(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let mut cs = match open(&req, &state) {
        Ok(cs) => cs,
        Err(response) => return response,
    };

    // Fresh id on privilege change
    if let Err(e) = cs.renew() {
        return error_response(&e);
    }
    cs.session_mut().set_var("login", true);
    if let Err(e) = cs.save(state.session_timeout) {
        return error_response(&e);
    }
    respond(cs, "logged in\n".to_string())
}

async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let mut cs = match open(&req, &state) {
        Ok(cs) => cs,
        Err(response) => return response,
    };

    if let Err(e) = cs.renew() {
        return error_response(&e);
    }
    cs.remove_cookies();
    respond(cs, "logged out\n".to_string())
}

async fn visits(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let name = format!("{}_plain", state.cookie_name);
    let mut cs = match CookieSession::open(&name, &state.manager, &req, &state.cookie_options) {
        Ok(cs) => cs,
        Err(e) => return error_response(&e),
    };

    let count = cs.session().int64_var("visits") + 1;
    cs.session_mut().set_var("visits", count);
    if let Err(e) = cs.save(state.session_timeout) {
        return error_response(&e);
    }

    let mut builder = HttpResponse::Ok();
    cs.apply(&mut builder);
    builder
        .content_type("text/plain; charset=utf-8")
        .body(format!("visits: {count}\n"))
}
