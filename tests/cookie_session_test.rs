// Integration tests for cookie-bound auth sessions
use actix_web::cookie::Cookie;
use actix_web::test as actix_test;
use actix_web::{web, App, HttpRequest, HttpResponse};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

use httpsession::testing::constants::TEST_COOKIE_NAME;
use httpsession::testing::TestFixtures;
use httpsession::token::cookie::CookieOptions;
use httpsession::{
    AuthCookieSession, CookieSession, JsonCodec, MemoryStore, SessionConfig, SessionManager,
};

fn options() -> CookieOptions {
    CookieOptions {
        secure: false,
        ..CookieOptions::default()
    }
}

fn session_cookie() -> String {
    format!("{TEST_COOKIE_NAME}_session")
}

fn auth_cookie() -> String {
    format!("{TEST_COOKIE_NAME}_auth")
}

fn rotating_manager() -> (SessionManager, Arc<MemoryStore>) {
    let store = TestFixtures::store();
    let config = SessionConfig {
        auth_timeout: TestFixtures::auth_timeout(),
        ..SessionConfig::default()
    };
    let manager = SessionManager::new(store.clone(), Arc::new(JsonCodec), config);
    (manager, store)
}

fn request_with(cookies: &HashMap<String, Cookie<'static>>) -> HttpRequest {
    cookies
        .values()
        .fold(actix_test::TestRequest::get(), |req, cookie| {
            req.cookie(cookie.clone())
        })
        .to_http_request()
}

/// Cookies the response for `cs` would carry
fn response_cookies(cs: &mut AuthCookieSession) -> HashMap<String, Cookie<'static>> {
    let mut builder = HttpResponse::Ok();
    cs.apply(&mut builder);
    let response = builder.finish();
    let cookies = response
        .cookies()
        .map(|c| (c.name().to_string(), c.into_owned()))
        .collect();
    cookies
}

/// Run one counting request and return the cookies it set
fn visit(
    manager: &SessionManager,
    cookies: &HashMap<String, Cookie<'static>>,
) -> (i64, HashMap<String, Cookie<'static>>) {
    let req = request_with(cookies);
    let mut cs = AuthCookieSession::open(TEST_COOKIE_NAME, manager, &req, &options()).unwrap();
    let count = cs.session().int64_var("count") + 1;
    cs.session_mut().set_var("count", count);
    cs.save(Duration::minutes(10)).unwrap();
    (count, response_cookies(&mut cs))
}

#[test]
fn test_two_requests_share_a_session() {
    let (manager, _) = rotating_manager();

    let (count, cookies) = visit(&manager, &HashMap::new());
    assert_eq!(count, 1);
    assert!(cookies.contains_key(&session_cookie()));
    assert!(cookies.contains_key(&auth_cookie()));
    let id = cookies[&session_cookie()].value().to_string();
    assert_eq!(cookies[&session_cookie()].http_only(), Some(true));

    let (count, second) = visit(&manager, &cookies);
    assert_eq!(count, 2);
    assert_eq!(second[&session_cookie()].value(), id);
    assert_eq!(
        second[&auth_cookie()].value(),
        cookies[&auth_cookie()].value()
    );
}

#[test]
fn test_tampered_auth_cookie_is_rejected() {
    let (manager, _) = rotating_manager();
    let (_, mut cookies) = visit(&manager, &HashMap::new());
    cookies.insert(auth_cookie(), Cookie::new(auth_cookie(), "tampered"));

    let req = request_with(&cookies);
    let err = AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap_err();
    assert!(err.is_authentication_failure());
}

#[test]
fn test_rotation_reissues_auth_cookie_only() {
    let (manager, store) = rotating_manager();
    let (_, cookies) = visit(&manager, &HashMap::new());
    let id = httpsession::Token::from(cookies[&session_cookie()].value());

    TestFixtures::backdate_rotation(&*store, &id, TestFixtures::auth_timeout() + Duration::seconds(1));
    let (count, rotated) = visit(&manager, &cookies);
    assert_eq!(count, 2);
    assert_eq!(rotated[&session_cookie()].value(), id.as_str());
    assert_ne!(
        rotated[&auth_cookie()].value(),
        cookies[&auth_cookie()].value()
    );

    // New pair works
    let (count, _) = visit(&manager, &rotated);
    assert_eq!(count, 3);
}

#[test]
fn test_grace_request_leaves_cookies_alone() {
    let (manager, store) = rotating_manager();
    let (_, cookies) = visit(&manager, &HashMap::new());
    let id = httpsession::Token::from(cookies[&session_cookie()].value());

    TestFixtures::backdate_rotation(&*store, &id, TestFixtures::auth_timeout() + Duration::seconds(1));
    let (_, rotated) = visit(&manager, &cookies);

    // A request still carrying the old pair, racing the rotation
    let (count, stale_response) = visit(&manager, &cookies);
    assert_eq!(count, 3);
    assert!(stale_response.is_empty());

    let (count, _) = visit(&manager, &rotated);
    assert_eq!(count, 4);
}

#[test]
fn test_renew_issues_new_id_and_drops_old_entry() {
    let (manager, _) = rotating_manager();
    let (_, cookies) = visit(&manager, &HashMap::new());
    let old_id = cookies[&session_cookie()].value().to_string();

    let req = request_with(&cookies);
    let mut cs = AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    cs.renew().unwrap();
    assert!(cs.session().values().is_empty());
    cs.session_mut().set_var("login", true);
    cs.save(Duration::minutes(10)).unwrap();
    let renewed = response_cookies(&mut cs);
    assert_ne!(renewed[&session_cookie()].value(), old_id);

    // Old cookies now name a terminated entry
    let req = request_with(&cookies);
    let cs = AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    assert!(cs.session().is_new());

    let req = request_with(&renewed);
    let cs = AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    assert!(cs.session().bool_var("login"));
}

#[test]
fn test_remove_cookies_clears_both() {
    let (manager, _) = rotating_manager();
    let (_, cookies) = visit(&manager, &HashMap::new());

    let req = request_with(&cookies);
    let mut cs = AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    cs.remove_cookies();
    let removed = response_cookies(&mut cs);
    assert_eq!(removed.len(), 2);
    assert!(removed.values().all(|c| c.value().is_empty()));
    assert!(removed
        .values()
        .all(|c| c.max_age() == Some(actix_web::cookie::time::Duration::ZERO)));
}

#[test]
fn test_plain_cookie_session_counts_with_id_cookie_only() {
    let (manager, _) = rotating_manager();

    let mut cookies = HashMap::new();
    for expected in 1..=2 {
        let req = request_with(&cookies);
        let mut cs = CookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
        assert!(cs.session().auth_token().is_none());
        let count = cs.session().int64_var("count") + 1;
        assert_eq!(count, expected);
        cs.session_mut().set_var("count", count);
        cs.save(Duration::minutes(10)).unwrap();

        let mut builder = HttpResponse::Ok();
        cs.apply(&mut builder);
        let response = builder.finish();
        let issued: HashMap<String, Cookie<'static>> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.into_owned()))
            .collect();
        assert_eq!(issued.len(), 1);
        assert!(issued.contains_key(&session_cookie()));
        if let Some(previous) = cookies.get(&session_cookie()) {
            assert_eq!(issued[&session_cookie()].value(), previous.value());
        }
        cookies = issued;
    }

    let req = request_with(&cookies);
    let mut cs = CookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    cs.renew().unwrap();
    cs.remove_cookie();
    let mut builder = HttpResponse::Ok();
    cs.apply(&mut builder);
    let response = builder.finish();
    assert!(response.cookies().all(|c| c.value().is_empty()));

    // The renewed-away id no longer names a session
    let req = request_with(&cookies);
    let cs = CookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()).unwrap();
    assert!(cs.session().is_new());
}

async fn count_handler(req: HttpRequest, manager: web::Data<SessionManager>) -> HttpResponse {
    let mut cs = match AuthCookieSession::open(TEST_COOKIE_NAME, &manager, &req, &options()) {
        Ok(cs) => cs,
        Err(e) if e.is_authentication_failure() => return HttpResponse::Unauthorized().finish(),
        Err(_) => return HttpResponse::InternalServerError().finish(),
    };
    let count = cs.session().int64_var("count") + 1;
    cs.session_mut().set_var("count", count);
    if cs.save(Duration::minutes(10)).is_err() {
        return HttpResponse::InternalServerError().finish();
    }
    let mut builder = HttpResponse::Ok();
    cs.apply(&mut builder);
    builder.body(count.to_string())
}

#[actix_web::test]
async fn test_counter_through_service() {
    let manager = SessionManager::with_defaults(TestFixtures::store());
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(manager))
            .route("/", web::get().to(count_handler)),
    )
    .await;

    let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
    let cookies: Vec<Cookie<'static>> = resp.response().cookies().map(Cookie::into_owned).collect();
    assert_eq!(cookies.len(), 2);
    let body = actix_test::read_body(resp).await;
    assert_eq!(body, web::Bytes::from_static(b"1"));

    let req = cookies
        .iter()
        .fold(actix_test::TestRequest::get().uri("/"), |req, c| req.cookie(c.clone()))
        .to_request();
    let body = actix_test::call_and_read_body(&app, req).await;
    assert_eq!(body, web::Bytes::from_static(b"2"));

    let id_cookie = cookies
        .iter()
        .find(|c| c.name() == session_cookie())
        .cloned()
        .unwrap();
    let forged = actix_test::TestRequest::get()
        .uri("/")
        .cookie(id_cookie)
        .cookie(Cookie::new(auth_cookie(), "forged"))
        .to_request();
    let resp = actix_test::call_service(&app, forged).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}
