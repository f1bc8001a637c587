#![allow(dead_code)]

use std::{fmt, fs::File, net::SocketAddr, path::Path};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, request::Builder, Method, Request, StatusCode},
};
use chrono::{Duration, NaiveDate, Utc};
use cucumber::{given, then, when, World as _};
use planner::{
    auth::{self, AuthenticatedUser},
    config::{parse_base_url, AppConfig},
    db::{init_pool, run_migrations},
    error::AppError,
    models::{
        activity::{ActivityInput, ActivityStatus},
        dashboard::DashboardData,
        itinerary::{DataSource, DayProgram, ItineraryDay, NewDay},
        sync::{SyncOperation, SyncReport, ACTIVITIES_TABLE},
        trip::{NewTrip, Trip},
        user::SignUp,
    },
    routes::create_router,
    services::{
        activities, dashboard,
        days,
        import::{self, MigrationOptions, MigrationReport},
        itinerary,
        storage::StorageService,
        sync::DbSyncTarget,
        trips,
    },
    state::AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    registered_user: Option<AuthenticatedUser>,
    session_cookie: Option<String>,
    last_status: Option<StatusCode>,
    last_body: Value,
    trip: Option<Trip>,
    day: Option<ItineraryDay>,
    activity_id: Option<String>,
    reset_token: Option<String>,
    login_token: Option<String>,
    avatar_url: Option<String>,
    import_report: Option<MigrationReport>,
    sync_report: Option<SyncReport>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self) -> &AuthenticatedUser {
        self.registered_user
            .as_ref()
            .expect("a user must be registered first")
    }

    fn itinerary_dir(&self) -> &Path {
        &self.app_state().config.itinerary_dir
    }

    /// Replaces `{trip}`, `{day}` and `{activity}` with the ids created so far.
    fn expand(&self, text: &str) -> String {
        let mut text = text.to_string();
        if let Some(trip) = &self.trip {
            text = text.replace("{trip}", &trip.id);
        }
        if let Some(day) = &self.day {
            text = text.replace("{day}", &day.id);
        }
        if let Some(activity_id) = &self.activity_id {
            text = text.replace("{activity}", activity_id);
        }
        text
    }

    fn request(&self, method: Method, uri: &str) -> Builder {
        let request = Request::builder().method(method).uri(uri);
        match &self.session_cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) {
        match body {
            Some(body) => {
                self.send_bytes(method, uri, "application/json", body.to_string().into_bytes())
                    .await
            }
            None => {
                let request = self
                    .request(method, uri)
                    .body(Body::empty())
                    .expect("request");
                self.dispatch(request).await
            }
        }
    }

    async fn send_bytes(&mut self, method: Method, uri: &str, content_type: &str, bytes: Vec<u8>) {
        let request = self
            .request(method, uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .expect("request");
        self.dispatch(request).await
    }

    async fn dispatch(&mut self, request: Request<Body>) {
        let response = create_router(self.app_state().clone())
            .oneshot(request)
            .await
            .expect("router response");
        if let Some(cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = cookie
                .to_str()
                .expect("ascii cookie")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            self.session_cookie = Some(pair);
        }
        self.last_status = Some(response.status());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        self.last_body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let itinerary_dir = root.path().join("standardized");
        let offline_root = root.path().join("offline");
        let avatar_root = root.path().join("avatars");
        std::fs::create_dir_all(&itinerary_dir)?;
        std::fs::create_dir_all(&avatar_root)?;

        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            itinerary_dir,
            offline_root: offline_root.clone(),
            avatar_root,
            public_base_url: parse_base_url("http://planner.test/")?,
            cookie_secret: "bdd-cookie-secret".into(),
            travelers: 6,
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let storage = StorageService::new(offline_root);
        storage.ensure_structure().await?;

        let app = AppState::new(config, db, storage);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn date(raw: &str) -> NaiveDate {
    raw.parse().expect("valid date")
}

fn parse_status(raw: &str) -> ActivityStatus {
    serde_json::from_value(Value::String(raw.into())).expect("activity status")
}

async fn register(world: &AppWorld, email: String, password: String) -> AuthenticatedUser {
    let sign_up = SignUp {
        email,
        password,
        first_name: Some("Ana".into()),
        last_name: None,
    };
    auth::register_user(world.app_state(), &sign_up)
        .await
        .expect("register user")
}

fn arrival_day() -> Value {
    json!({
        "id": "day-2025-06-14",
        "date": "2025-06-14",
        "title": "FIFA Club World Cup arrival",
        "summary": "Landing in Newark",
        "weather": { "temperature": 26, "condition": "Sunny", "icon": "sun" },
        "reminders": ["Passport"],
        "documents": [{ "file_name": "booking.pdf", "file_path": "docs/booking.pdf" }],
        "activities": [{
            "id": "act-arrival-1",
            "type": "transport",
            "title": "Airport transfer",
            "time": "14:00:00",
            "status": "confirmed",
            "sequence_order": 1,
            "location": { "name": "Newark Airport", "latitude": 40.68, "longitude": -74.17 },
            "transport": {
                "mode": "Van",
                "carrier": "Uber",
                "seat_map": { "Ana": "1A" },
                "shared_with": ["Ben"]
            }
        }],
        "travel_essentials": [{ "id": "ess-1", "name": "Passport" }],
        "metadata": {
            "source": "standardizer",
            "version": "2.0",
            "timezone": "America/New_York",
            "additional_data": { "city": "Newark" }
        }
    })
}

fn match_day() -> Value {
    json!({
        "id": "day-2025-06-16",
        "date": "2025-06-16",
        "title": "Match 8: Flamengo vs EST",
        "activities": [
            {
                "id": "act-match-1",
                "type": "match",
                "title": "Flamengo vs EST",
                "time": "21:00:00",
                "sequence_order": 1,
                "location": { "name": "Lincoln Financial Field", "latitude": 39.9, "longitude": -75.17 }
            },
            {
                "id": "act-match-2",
                "type": "meal",
                "title": "Cheesesteak dinner",
                "time": "18:00:00",
                "sequence_order": 2
            }
        ]
    })
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.registered_user = None;
    world.session_cookie = None;
}

#[given("standardized itinerary files for the opening days")]
async fn given_itinerary_files(world: &mut AppWorld) {
    let dir = world.itinerary_dir().to_path_buf();
    std::fs::write(
        dir.join("14-06_2025-06-14.json"),
        arrival_day().to_string(),
    )
    .expect("write arrival file");
    std::fs::write(dir.join("16-06_2025-06-16.json"), match_day().to_string())
        .expect("write match file");
    std::fs::write(
        dir.join("validation_errors_2025-06-15.json"),
        json!({ "errors": [] }).to_string(),
    )
    .expect("write validation file");
}

#[given(regex = r#"^a registered user "([^"]+)" with password "([^"]+)"$"#)]
async fn given_registered_user(world: &mut AppWorld, email: String, password: String) {
    let user = register(world, email, password).await;
    world.registered_user = Some(user);
}

#[when(regex = r#"^another user "([^"]+)" with password "([^"]+)" is signed in over HTTP$"#)]
async fn when_other_user_signs_in(world: &mut AppWorld, email: String, password: String) {
    register(world, email.clone(), password.clone()).await;
    world.session_cookie = None;
    world
        .send(
            Method::POST,
            "/auth/signin",
            Some(json!({ "email": email, "password": password })),
        )
        .await;
    assert_eq!(world.last_status, Some(StatusCode::OK));
}

#[given("the itinerary directory is missing")]
async fn given_missing_itinerary_dir(world: &mut AppWorld) {
    let dir = world.itinerary_dir().to_path_buf();
    std::fs::remove_dir_all(dir).expect("remove itinerary dir");
}

#[given(regex = r#"^a corrupt itinerary file for "([^"]+)"$"#)]
async fn given_corrupt_file(world: &mut AppWorld, day_date: String) {
    let path = world.itinerary_dir().join(format!("broken_{day_date}.json"));
    std::fs::write(path, "{not json").expect("write corrupt file");
}

#[given(regex = r#"^a trip "([^"]+)" from "([^"]+)" to "([^"]+)"$"#)]
async fn given_trip(world: &mut AppWorld, title: String, start: String, end: String) {
    let new = NewTrip {
        title,
        destination: "New Jersey, USA".into(),
        start_date: date(&start),
        end_date: date(&end),
    };
    let trip = trips::create_trip(&world.app_state().db, &world.user().uuid, new)
        .await
        .expect("create trip");
    world.trip = Some(trip);
}

#[given(regex = r#"^a day on "([^"]+)" titled "([^"]+)"$"#)]
async fn given_day(world: &mut AppWorld, day_date: String, title: String) {
    let trip_id = world.trip.as_ref().expect("trip first").id.clone();
    let day = days::create_day(
        &world.app_state().db,
        &world.user().uuid,
        &trip_id,
        NewDay {
            date: date(&day_date),
            title,
            summary: None,
        },
    )
    .await
    .expect("create day");
    world.day = Some(day);
}

#[when(regex = r#"^I sign up over HTTP as "([^"]+)" with password "([^"]+)"$"#)]
async fn when_sign_up_http(world: &mut AppWorld, email: String, password: String) {
    world
        .send(
            Method::POST,
            "/auth/signup",
            Some(json!({ "email": email, "password": password, "firstName": "Ana" })),
        )
        .await;
}

#[when(regex = r#"^I sign in over HTTP as "([^"]+)" with password "([^"]+)"$"#)]
async fn when_sign_in_http(world: &mut AppWorld, email: String, password: String) {
    world
        .send(
            Method::POST,
            "/auth/signin",
            Some(json!({ "email": email, "password": password })),
        )
        .await;
}

#[when("I sign out over HTTP")]
async fn when_sign_out_http(world: &mut AppWorld) {
    world.send(Method::POST, "/auth/signout", None).await;
}

#[when(regex = r#"^I (GET|POST|PUT|PATCH|DELETE) "([^"]+)"$"#)]
async fn when_request(world: &mut AppWorld, method: String, uri: String) {
    let method: Method = method.parse().expect("http method");
    let uri = world.expand(&uri);
    world.send(method, &uri, None).await;
}

#[when(regex = r#"^I (POST|PUT|PATCH) "([^"]+)" with body '(.+)'$"#)]
async fn when_request_with_body(world: &mut AppWorld, method: String, uri: String, body: String) {
    let method: Method = method.parse().expect("http method");
    let uri = world.expand(&uri);
    let body: Value = serde_json::from_str(&world.expand(&body)).expect("json body");
    world.send(method, &uri, Some(body)).await;
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, status: u16) {
    assert_eq!(
        world.last_status.expect("a request must be sent first").as_u16(),
        status,
        "body: {}",
        world.last_body
    );
}

#[then(regex = r#"^the response field "([^"]+)" is "([^"]*)"$"#)]
async fn then_field(world: &mut AppWorld, field: String, expected: String) {
    let value = world
        .last_body
        .pointer(&field)
        .unwrap_or_else(|| panic!("missing {field} in {}", world.last_body));
    let actual = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    assert_eq!(actual, expected);
}

#[then(regex = r#"^the response field "([^"]+)" starts with "([^"]*)"$"#)]
async fn then_field_prefix(world: &mut AppWorld, field: String, prefix: String) {
    let value = world
        .last_body
        .pointer(&field)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing text {field} in {}", world.last_body));
    assert!(value.starts_with(&prefix), "{value} should start with {prefix}");
}

#[then(regex = r"^the response is a list of (\d+) entries$")]
async fn then_list_len(world: &mut AppWorld, expected: usize) {
    let list = world.last_body.as_array().expect("json array body");
    assert_eq!(list.len(), expected);
}

#[when(regex = r#"^I request a password reset for "([^"]+)"$"#)]
async fn when_request_reset(world: &mut AppWorld, email: String) {
    world.reset_token = auth::request_password_reset(world.app_state(), &email)
        .await
        .expect("reset request");
}

#[then("no reset token is issued")]
async fn then_no_reset_token(world: &mut AppWorld) {
    assert!(world.reset_token.is_none());
}

#[when(regex = r#"^I confirm the password reset over HTTP with "([^"]+)"$"#)]
async fn when_confirm_reset_http(world: &mut AppWorld, password: String) {
    let token = world.reset_token.clone().expect("reset token issued");
    world
        .send(
            Method::POST,
            "/auth/reset-password/confirm",
            Some(json!({ "token": token, "password": password })),
        )
        .await;
}

#[when(regex = r#"^I request a sign-in link for "([^"]+)"$"#)]
async fn when_request_login_link(world: &mut AppWorld, email: String) {
    world.login_token = auth::request_login_link(world.app_state(), &email)
        .await
        .expect("sign-in link request");
}

#[then("no sign-in link is issued")]
async fn then_no_login_link(world: &mut AppWorld) {
    assert!(world.login_token.is_none());
}

#[when("I confirm the sign-in link over HTTP")]
async fn when_confirm_login_link(world: &mut AppWorld) {
    let token = world.login_token.clone().expect("sign-in link issued");
    world
        .send(
            Method::POST,
            "/auth/magic-link/confirm",
            Some(json!({ "token": token })),
        )
        .await;
}

#[when("my stored sessions expire")]
async fn when_sessions_expire(world: &mut AppWorld) {
    sqlx::query("UPDATE sessions SET expires_at = ?1 WHERE user_id = ?2")
        .bind(Utc::now() - Duration::hours(1))
        .bind(world.user().id)
        .execute(&world.app_state().db)
        .await
        .expect("expire sessions");
}

#[then(regex = r"^I have (\d+) stored sessions?$")]
async fn then_session_count(world: &mut AppWorld, expected: i64) {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?1")
        .bind(world.user().id)
        .fetch_one(&world.app_state().db)
        .await
        .expect("count sessions");
    assert_eq!(count, expected);
}

#[when(regex = r#"^I upload a "([^"]+)" avatar over HTTP$"#)]
async fn when_upload_avatar(world: &mut AppWorld, content_type: String) {
    let bytes = b"\x89PNG\r\n\x1a\nfake image bytes".to_vec();
    world
        .send_bytes(Method::PUT, "/me/avatar", &content_type, bytes)
        .await;
    world.avatar_url = world
        .last_body
        .get("avatar_url")
        .and_then(Value::as_str)
        .map(str::to_string);
}

#[then("the uploaded avatar is stored, served and on my profile")]
async fn then_avatar_stored(world: &mut AppWorld) {
    let url = world.avatar_url.clone().expect("avatar uploaded");
    let file_name = url
        .rsplit('/')
        .next()
        .expect("avatar file name")
        .to_string();
    assert!(file_name.starts_with(&world.user().uuid));
    assert!(file_name.ends_with(".png"));
    assert!(world.app_state().config.avatar_root.join(&file_name).is_file());

    world
        .send(Method::GET, &format!("/avatars/{file_name}"), None)
        .await;
    assert_eq!(world.last_status, Some(StatusCode::OK));

    world.send(Method::GET, "/me/profile", None).await;
    assert_eq!(world.last_body["avatar_url"], url.as_str());
}

#[then(regex = r#"^the store holds (\d+) rows? in "([^"]+)"$"#)]
async fn then_row_count(world: &mut AppWorld, expected: i64, table: String) {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&world.app_state().db)
        .await
        .expect("count rows");
    assert_eq!(count, expected, "rows in {table}");
}

#[then(regex = r#"^I can reset the password to "([^"]+)" and sign in with it$"#)]
async fn then_reset_and_sign_in(world: &mut AppWorld, password: String) {
    let token = world.reset_token.clone().expect("reset token issued");
    auth::complete_password_reset(world.app_state(), &token, &password)
        .await
        .expect("complete reset");
    let email = world.user().email.clone();
    auth::authenticate_user(world.app_state(), &email, &password)
        .await
        .expect("sign in with new password");

    let reused = auth::complete_password_reset(world.app_state(), &token, "another-pass-1").await;
    assert!(matches!(reused, Err(AppError::BadRequest(_))));
}

fn activity_input(kind: &str, title: &str, time: &str, order: Option<i64>) -> ActivityInput {
    let mut input = json!({
        "type": kind,
        "title": title,
        "time": time,
        "sequence_order": order,
        "location": { "name": "Lincoln Financial Field", "latitude": 39.9, "longitude": -75.17 },
    });
    if kind == "transport" {
        input["transport"] = json!({
            "mode": "Train",
            "carrier": "NJ Transit",
            "seat_map": { "Ana": "12C" },
            "shared_with": ["Ben"]
        });
    }
    serde_json::from_value(input).expect("activity input")
}

async fn add_activity(
    world: &AppWorld,
    kind: &str,
    title: &str,
    time: &str,
    order: Option<i64>,
) -> Result<String, AppError> {
    let day_id = world.day.as_ref().expect("day first").id.clone();
    activities::create_activity(
        &world.app_state().db,
        &world.user().uuid,
        &day_id,
        activity_input(kind, title, time, order),
    )
    .await
    .map(|item| item.id)
}

#[when(regex = r#"^I add a "([^"]+)" activity "([^"]+)" at "([^"]+)"$"#)]
async fn when_add_activity(world: &mut AppWorld, kind: String, title: String, time: String) {
    let id = add_activity(world, &kind, &title, &time, None)
        .await
        .expect("create activity");
    world.activity_id = Some(id);
}

#[then(regex = r#"^adding a "([^"]+)" activity "([^"]+)" at "([^"]+)" is rejected with status (\d+)$"#)]
async fn then_activity_rejected(
    world: &mut AppWorld,
    kind: String,
    title: String,
    time: String,
    status: u16,
) {
    let err = add_activity(world, &kind, &title, &time, None)
        .await
        .expect_err("activity should be rejected");
    assert_eq!(err.status().as_u16(), status);
}

#[then(regex = r#"^adding a "([^"]+)" activity "([^"]+)" at sequence (\d+) is rejected with status (\d+)$"#)]
async fn then_sequence_rejected(
    world: &mut AppWorld,
    kind: String,
    title: String,
    order: i64,
    status: u16,
) {
    let err = add_activity(world, &kind, &title, "12:00", Some(order))
        .await
        .expect_err("duplicate sequence should be rejected");
    assert_eq!(err.status().as_u16(), status);
}

async fn current_day_program(world: &AppWorld) -> DayProgram {
    let day_id = world.day.as_ref().expect("day first").id.clone();
    itinerary::fetch_day(&world.app_state().db, &world.user().uuid, &day_id)
        .await
        .expect("fetch day")
}

#[then(regex = r#"^the day lists activities "([^"]*)"$"#)]
async fn then_day_lists(world: &mut AppWorld, expected: String) {
    let program = current_day_program(world).await;
    let titles: Vec<&str> = program.items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles.join(", "), expected);
}

#[when(regex = r#"^I mark activity "([^"]+)" as "([^"]+)"$"#)]
async fn when_mark_activity(world: &mut AppWorld, title: String, status: String) {
    let program = current_day_program(world).await;
    let item = program
        .items
        .iter()
        .find(|item| item.title == title)
        .expect("activity on day");
    let status = parse_status(&status);
    let updated = activities::update_activity_status(
        &world.app_state().db,
        &world.user().uuid,
        &item.id,
        status,
    )
    .await
    .expect("update status");
    assert_eq!(updated.status, status);
}

#[then(regex = r#"^activity "([^"]+)" has status "([^"]+)"$"#)]
async fn then_activity_status(world: &mut AppWorld, title: String, status: String) {
    let program = current_day_program(world).await;
    let item = program
        .items
        .iter()
        .find(|item| item.title == title)
        .unwrap_or_else(|| panic!("{title} missing from {:?}", program.items));
    assert_eq!(item.status.as_str(), status);
}

#[then(regex = r"^the trip dashboard counts (\d+) matches out of (\d+) activities$")]
async fn then_trip_dashboard(world: &mut AppWorld, matches: usize, total: usize) {
    let trip_id = world.trip.as_ref().expect("trip first").id.clone();
    let data: DashboardData = dashboard::trip_dashboard(
        &world.app_state().db,
        &world.user().uuid,
        &trip_id,
        6,
        date("2025-06-01"),
    )
    .await
    .expect("trip dashboard");
    assert_eq!(data.statistics.total_matches, matches);
    assert_eq!(data.statistics.total_activities, total);
    assert_eq!(data.countdown.expect("countdown").days_left, 13);
}

#[then(regex = r#"^my itinerary for "([^"]+)" comes from "([^"]+)"$"#)]
async fn then_itinerary_source(world: &mut AppWorld, day_date: String, source: String) {
    let program = itinerary::fetch_itinerary(
        &world.app_state().db,
        &world.app_state().files,
        &world.user().uuid,
        date(&day_date),
    )
    .await
    .expect("fetch itinerary");
    let expected = match source.as_str() {
        "database" => DataSource::Database,
        "standardized" => DataSource::Standardized,
        other => panic!("unknown source {other}"),
    };
    assert_eq!(program.source, expected);
}

#[then(regex = r#"^my itinerary for "([^"]+)" is not found$"#)]
async fn then_itinerary_missing(world: &mut AppWorld, day_date: String) {
    let result = itinerary::fetch_itinerary(
        &world.app_state().db,
        &world.app_state().files,
        &world.user().uuid,
        date(&day_date),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[when("I import the itinerary files")]
async fn when_import(world: &mut AppWorld) {
    let report = import::migrate_all(
        &world.app_state().db,
        &world.app_state().files,
        &world.user().uuid,
        MigrationOptions::default(),
    )
    .await
    .expect("import");
    world.import_report = Some(report);
}

#[then(regex = r"^the import reports (\d+) successes and (\d+) failures$")]
async fn then_import_report(world: &mut AppWorld, success: usize, failed: usize) {
    let report = world.import_report.as_ref().expect("import ran");
    assert_eq!(report.success, success, "errors: {:?}", report.errors);
    assert_eq!(report.failed, failed);
}

#[then(regex = r#"^the imported day "([^"]+)" keeps its weather, transport and metadata$"#)]
async fn then_imported_day_details(world: &mut AppWorld, day_date: String) {
    let program = itinerary::fetch_itinerary(
        &world.app_state().db,
        &world.app_state().files,
        &world.user().uuid,
        date(&day_date),
    )
    .await
    .expect("fetch imported day");
    assert_eq!(program.weather.expect("weather").condition, "Sunny");
    assert_eq!(program.reminders, vec!["Passport".to_string()]);
    assert_eq!(program.docs, vec!["booking.pdf".to_string()]);
    let item = &program.items[0];
    assert_eq!(item.time, "14:00");
    let transport = item.transport.as_ref().expect("transport");
    assert_eq!(transport.seat_map.get("Ana").map(String::as_str), Some("1A"));
    assert_eq!(transport.shared_with, vec!["Ben".to_string()]);
    assert_eq!(
        program.additional_data.expect("additional data")["city"],
        "Newark"
    );
}

fn offline_program(day_date: &str, activity_id: &str, title: &str) -> DayProgram {
    serde_json::from_value(json!({
        "date": day_date,
        "title": "Fan day",
        "summary": "Fan zone and watch party",
        "reminders": ["Scarf"],
        "items": [{
            "id": activity_id,
            "type": "activity",
            "title": title,
            "time": "15:00"
        }]
    }))
    .expect("offline program")
}

#[when(regex = r#"^I save an offline itinerary for "([^"]+)" with activity "([^"]+)" titled "([^"]+)"$"#)]
async fn when_save_offline(world: &mut AppWorld, day_date: String, activity_id: String, title: String) {
    let saved = world
        .app_state()
        .sync
        .save_itinerary_offline(
            &world.user().uuid,
            date(&day_date),
            offline_program(&day_date, &activity_id, &title),
        )
        .await
        .expect("save offline");
    assert_eq!(saved.source, DataSource::Offline);
}

#[when(regex = r#"^I set offline activity "([^"]+)" on "([^"]+)" to "([^"]+)"$"#)]
async fn when_offline_status(world: &mut AppWorld, activity_id: String, day_date: String, status: String) {
    world
        .app_state()
        .sync
        .update_activity_status_offline(
            &world.user().uuid,
            date(&day_date),
            &activity_id,
            parse_status(&status),
        )
        .await
        .expect("offline status");
}

#[when(regex = r#"^I queue a status change for unknown activity "([^"]+)"$"#)]
async fn when_queue_unknown(world: &mut AppWorld, activity_id: String) {
    world
        .app_state()
        .sync
        .enqueue(
            &world.user().uuid,
            SyncOperation::Update,
            ACTIVITIES_TABLE,
            json!({ "id": activity_id, "status": "completed" }),
        )
        .await
        .expect("enqueue");
}

#[when(regex = r#"^I queue an? "(create|update|delete)" item on "([^"]+)" with '(.+)'$"#)]
async fn when_queue_item(world: &mut AppWorld, operation: String, table: String, data: String) {
    let operation: SyncOperation =
        serde_json::from_value(Value::String(operation)).expect("sync operation");
    let data: Value = serde_json::from_str(&world.expand(&data)).expect("json data");
    world
        .app_state()
        .sync
        .enqueue(&world.user().uuid, operation, &table, data)
        .await
        .expect("enqueue");
}

#[then(regex = r"^the sync queue holds (\d+) items$")]
async fn then_queue_len(world: &mut AppWorld, expected: usize) {
    let queue = world
        .app_state()
        .sync
        .pending(&world.user().uuid)
        .await
        .expect("queue");
    assert_eq!(queue.len(), expected);
}

#[when("I drain the sync queue")]
async fn when_drain(world: &mut AppWorld) {
    let state = world.app_state();
    let target = DbSyncTarget::new(state.db.clone(), world.user().uuid.clone());
    let report = state
        .sync
        .process_sync_queue(&world.user().uuid, &target)
        .await
        .expect("drain");
    world.sync_report = Some(report);
}

#[then(regex = r"^the drain reports (\d+) applied, (\d+) failed and (\d+) remaining$")]
async fn then_drain_report(world: &mut AppWorld, success: usize, failed: usize, remaining: usize) {
    assert_eq!(
        world.sync_report.expect("drain ran"),
        SyncReport {
            success,
            failed,
            remaining
        }
    );
}

#[then(regex = r#"^the stored day for "([^"]+)" lists "([^"]+)" as "([^"]+)"$"#)]
async fn then_stored_day(world: &mut AppWorld, day_date: String, title: String, status: String) {
    let program = itinerary::fetch_itinerary(
        &world.app_state().db,
        &world.app_state().files,
        &world.user().uuid,
        date(&day_date),
    )
    .await
    .expect("stored day");
    assert_eq!(program.source, DataSource::Database);
    assert_eq!(program.reminders, vec!["Scarf".to_string()]);
    let item = program
        .items
        .iter()
        .find(|item| item.title == title)
        .expect("synced activity");
    assert_eq!(item.status.as_str(), status);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
