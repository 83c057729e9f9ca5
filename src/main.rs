#[macro_use]
extern crate rocket;

mod cache;
mod client;
mod config;
mod console;
mod guards;
mod models;
mod query;
mod resources;
mod routes;
mod utils;

use dotenvy::dotenv;
use log::info;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(401)]
fn unauthorized() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Missing or invalid operator token"
    })
}

#[catch(403)]
fn forbidden() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Your role cannot use this console page"
    })
}

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /console prefix)"
    })
}

#[catch(422)]
fn unprocessable() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Malformed request body"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/console/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

/// Routes, docs and catchers; the caller supplies the managed state.
fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", routes![options_handler])
        .mount(
            "/console",
            openapi_get_routes![
                // Admin - users
                routes::admin::get_users,
                routes::admin::control_users,
                routes::admin::get_user_status_dialog,
                routes::admin::request_user_status,
                routes::admin::cancel_user_status,
                routes::admin::confirm_user_status,
                // Admin - verification
                routes::admin::get_verifications,
                routes::admin::control_verifications,
                routes::admin::get_verification,
                routes::admin::approve_verification,
                routes::admin::reject_verification,
                // Admin - subscription plans
                routes::admin::get_plans,
                routes::admin::control_plans,
                routes::admin::create_plan,
                routes::admin::update_plan,
                routes::admin::get_plan_status_dialog,
                routes::admin::request_plan_status,
                routes::admin::cancel_plan_status,
                routes::admin::confirm_plan_status,
                // Admin - memberships & sessions
                routes::admin::get_memberships,
                routes::admin::control_memberships,
                routes::admin::get_sessions,
                routes::admin::control_sessions,
                routes::admin::get_session,
                // Admin - dashboard
                routes::admin::get_dashboard_stats,
                routes::admin::get_dashboard_charts,
                // Trainer - slots
                routes::trainer::get_slots,
                routes::trainer::control_slots,
                routes::trainer::create_slot,
                routes::trainer::create_recurring_slots,
                routes::trainer::delete_slot,
                routes::trainer::cancel_slot,
                // Trainer - sessions
                routes::trainer::get_trainer_sessions,
                routes::trainer::control_trainer_sessions,
                // Trainer - profile, wallet, stats
                routes::trainer::get_profile,
                routes::trainer::update_profile,
                routes::trainer::get_wallet,
                routes::trainer::get_trainer_stats,
                // Trainer - verification wizard
                routes::trainer::get_verification_status,
                routes::trainer::get_wizard,
                routes::trainer::submit_details,
                routes::trainer::wizard_back,
                routes::trainer::submit_documents,
                // Shared
                routes::notifications::drain_notifications,
                routes::notifications::leave_pages,
            ],
        )
        .mount("/console/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![unauthorized, forbidden, not_found, unprocessable, internal_error],
        )
}

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    info!("🚀 Trainer console running");
    if config::Config::is_development() {
        info!("📚 Swagger UI → http://localhost:8000/console/docs");
    }

    mount(
        rocket::build()
            .attach(console::fairing::init())
            .attach(console::fairing::sweeper())
            .attach(CORS),
    )
}
