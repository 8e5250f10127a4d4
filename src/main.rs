mod catalog;
mod database;
mod error;
mod model;
mod notify;
mod store;

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use error::{RegisterError, WatchlistError};
use log::{debug, warn};
use model::Movie;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use store::AccountStore;

type Tera = web::Data<tera::Tera>;
type Store = web::Data<Mutex<AccountStore<sled::Db>>>;

fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> actix_web::Error {
    debug!("{:?}", err);
    actix_web::error::ErrorInternalServerError(message)
}

fn found(location: &str) -> HttpResponse {
    HttpResponse::Found().header("location", location).finish()
}

#[derive(Serialize)]
struct MovieCard {
    id: u32,
    title: &'static str,
    year: u16,
    genre: &'static str,
    rating: f32,
    description: &'static str,
    poster_colors: &'static str,
    poster_emoji: &'static str,
}

impl From<&'static Movie> for MovieCard {
    fn from(movie: &'static Movie) -> Self {
        MovieCard {
            id: movie.id,
            title: movie.title,
            year: movie.year,
            genre: movie.genre,
            rating: movie.rating,
            description: movie.description,
            poster_colors: movie.poster_colors(),
            poster_emoji: movie.poster_emoji(),
        }
    }
}

#[derive(Deserialize)]
struct CatalogQuery {
    #[serde(default)]
    q: String,
    genre: Option<String>,
    year: Option<String>,
}

async fn index(
    query: web::Query<CatalogQuery>,
    tera: Tera,
    store: Store,
) -> actix_web::Result<HttpResponse> {
    let store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    let mut ctx = tera::Context::new();
    if let Some(account) = store.current_session() {
        ctx.insert("user", account);
    }

    // Empty form values mean "no filter"
    let genre = query.genre.as_deref().filter(|genre| !genre.is_empty());
    let year = query.year.as_deref().and_then(|year| year.parse().ok());
    let movies = catalog::filter(&query.q, genre, year)
        .into_iter()
        .map(MovieCard::from)
        .collect::<Vec<_>>();
    ctx.insert("movies", &movies);
    ctx.insert("q", &query.q);
    ctx.insert("genre", &genre.unwrap_or(""));
    ctx.insert("year", &query.year.as_deref().unwrap_or(""));
    ctx.insert(
        "genres",
        &["action", "sci-fi", "romance", "comedy", "horror", "drama"],
    );
    ctx.insert("years", &["2024", "2023"]);

    let body = tera
        .render("index.html", &ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

#[derive(Deserialize)]
struct LoginFlags {
    wrong_password: Option<String>,
    logout: Option<String>,
    login_required: Option<String>,
    reset: Option<String>,
}

async fn login_page(query: web::Query<LoginFlags>, tera: Tera) -> actix_web::Result<HttpResponse> {
    let mut ctx = tera::Context::new();
    if query.wrong_password.is_some() {
        ctx.insert("message", "Invalid email or password");
        ctx.insert("message_kind", "error");
    } else if query.login_required.is_some() {
        ctx.insert("message", "Please login to add to watchlist");
        ctx.insert("message_kind", "error");
    } else if query.logout.is_some() {
        ctx.insert("message", "Logged out successfully!");
        ctx.insert("message_kind", "success");
    } else if query.reset.is_some() {
        ctx.insert("message", "All data cleared! You can register again.");
        ctx.insert("message_kind", "success");
    }
    let body = tera
        .render("login.html", &ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

#[derive(Deserialize)]
struct LoginParams {
    email: String,
    password: String,
}

async fn login_post(
    params: web::Form<LoginParams>,
    store: Store,
) -> actix_web::Result<HttpResponse> {
    let mut store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    match store.login(&params.email, &params.password) {
        Ok(_) => Ok(found("/")),
        Err(err) => {
            debug!("login rejected: {}", err);
            Ok(found("/login?wrong_password"))
        }
    }
}

fn register_flag(err: &RegisterError) -> &'static str {
    match err {
        RegisterError::MissingFields => "missing_fields",
        RegisterError::TermsNotAccepted => "terms",
        RegisterError::PasswordMismatch => "password_mismatch",
        RegisterError::EmailTaken => "email_taken",
    }
}

#[derive(Deserialize)]
struct RegisterFlags {
    error: Option<String>,
}

async fn register_page(
    query: web::Query<RegisterFlags>,
    tera: Tera,
) -> actix_web::Result<HttpResponse> {
    let mut ctx = tera::Context::new();
    let message = match query.error.as_deref() {
        Some("missing_fields") => Some(RegisterError::MissingFields.to_string()),
        Some("terms") => Some(RegisterError::TermsNotAccepted.to_string()),
        Some("password_mismatch") => Some(RegisterError::PasswordMismatch.to_string()),
        Some("email_taken") => Some(RegisterError::EmailTaken.to_string()),
        _ => None,
    };
    if let Some(message) = message {
        ctx.insert("message", &message);
        ctx.insert("message_kind", "error");
    }
    let body = tera
        .render("register.html", &ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

#[derive(Deserialize)]
struct RegisterParams {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
    terms: Option<String>,
}

async fn register_post(
    params: web::Form<RegisterParams>,
    store: Store,
    notify_endpoint: web::Data<String>,
) -> actix_web::Result<HttpResponse> {
    let result = {
        let mut store = store
            .lock()
            .map_err(|_| log_error("store mutex poisoned", "State error"))?;
        store.register(
            &params.name,
            &params.email,
            &params.password,
            &params.confirm_password,
            params.terms.is_some(),
        )
    };
    match result {
        Ok(account) => {
            // Best-effort welcome email; registration has already succeeded
            // and a failure here only gets logged.
            let endpoint = notify_endpoint.get_ref().clone();
            actix_rt::spawn(async move {
                match notify::send_welcome(&endpoint, &account.name, &account.email).await {
                    Ok(()) => debug!("welcome email sent to {}", account.email),
                    Err(err) => warn!("welcome email to {} not sent: {}", account.email, err),
                }
            });
            Ok(found("/"))
        }
        Err(err) => {
            debug!("registration rejected: {}", err);
            Ok(found(&format!("/register?error={}", register_flag(&err))))
        }
    }
}

async fn logout(store: Store) -> actix_web::Result<HttpResponse> {
    let mut store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    store.logout();
    Ok(found("/login?logout"))
}

#[derive(Deserialize)]
struct WatchlistFlags {
    already: Option<String>,
}

async fn watchlist_page(
    query: web::Query<WatchlistFlags>,
    tera: Tera,
    store: Store,
) -> actix_web::Result<HttpResponse> {
    let store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    let mut ctx = tera::Context::new();
    if let Some(account) = store.current_session() {
        ctx.insert("user", account);
    }
    ctx.insert("watchlist", store.watchlist());
    ctx.insert("watchlist_count", &store.watchlist_count());
    ctx.insert("watched_count", &store.watched_count());
    if query.already.is_some() {
        ctx.insert("message", "Already in your watchlist");
        ctx.insert("message_kind", "error");
    }
    let body = tera
        .render("watchlist.html", &ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

#[derive(Deserialize)]
struct TitleParams {
    title: String,
}

async fn watchlist_add(
    params: web::Form<TitleParams>,
    store: Store,
) -> actix_web::Result<HttpResponse> {
    let mut store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    match store.add_to_watchlist(&params.title) {
        Ok(()) => Ok(found("/watchlist")),
        Err(WatchlistError::NotAuthenticated) => Ok(found("/login?login_required")),
        Err(WatchlistError::AlreadyPresent) => Ok(found("/watchlist?already")),
    }
}

async fn watchlist_remove(
    params: web::Form<TitleParams>,
    store: Store,
) -> actix_web::Result<HttpResponse> {
    let mut store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    store.remove_from_watchlist(&params.title);
    Ok(found("/watchlist"))
}

async fn reset(store: Store) -> actix_web::Result<HttpResponse> {
    let mut store = store
        .lock()
        .map_err(|_| log_error("store mutex poisoned", "State error"))?;
    store.reset_all();
    Ok(found("/login?reset"))
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "moviehub=debug,actix_web=info");
    }
    env_logger::init();

    let data_dir =
        std::env::var("MOVIEHUB_DATA_DIR").unwrap_or_else(|_| "moviehub_data".to_owned());
    let bind = std::env::var("MOVIEHUB_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());
    let notify_endpoint = web::Data::new(
        std::env::var("MOVIEHUB_NOTIFY_URL").unwrap_or_else(|_| notify::DEFAULT_ENDPOINT.to_owned()),
    );

    let db = sled::open(&data_dir)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let store = web::Data::new(Mutex::new(AccountStore::open(db)));

    HttpServer::new(move || {
        let tera = tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*")).unwrap();
        App::new()
            .wrap(Logger::default())
            .data(tera)
            .app_data(store.clone())
            .app_data(notify_endpoint.clone())
            .route("/", web::get().to(index))
            .route("/login", web::get().to(login_page))
            .route("/login", web::post().to(login_post))
            .route("/register", web::get().to(register_page))
            .route("/register", web::post().to(register_post))
            .route("/logout", web::get().to(logout))
            .route("/watchlist", web::get().to(watchlist_page))
            .route("/watchlist/add", web::post().to(watchlist_add))
            .route("/watchlist/remove", web::post().to(watchlist_remove))
            .route("/reset", web::post().to(reset))
    })
    .bind(bind.as_str())?
    .run()
    .await
}
