//! Run the nearby-user notification for one report without the webhook, e.g. to
//! replay a report whose webhook call failed.

use aldeias_seguras::{Config, NotificationOutcome, ProximityNotificationService, Report, Services, init_tracing};
use rocket::serde::json::serde_json::json;
use std::time::Duration;

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} <report-id> <lat> <lng>");
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let bin_name = args.first().map(String::as_str).unwrap_or("notify");

    let (report_id, lat, lng) = match args.as_slice() {
        [_, id, lat, lng] => match (parse_coordinate(lat), parse_coordinate(lng)) {
            (Some(lat), Some(lng)) => (id.clone(), lat, lng),
            _ => {
                print_usage(bin_name);
                std::process::exit(2);
            }
        },
        _ => {
            print_usage(bin_name);
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    let report = match Report::from_event(&json!({"record": {"id": report_id, "lat": lat, "lng": lng}})) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Invalid report: {err}");
            std::process::exit(2);
        }
    };

    let services = match Services::from_config(&config) {
        Ok(services) => services,
        Err(err) => {
            eprintln!("Failed to initialize services: {err}");
            std::process::exit(1);
        }
    };

    let service = ProximityNotificationService::new(
        services.proximity.as_ref(),
        services.composer.as_ref(),
        &services.dispatcher,
        config.notifications.radius_meters,
    );

    match service.notify(&report).await {
        Ok(NotificationOutcome::NoTargets) => println!("{}", NotificationOutcome::NoTargets.message()),
        Ok(outcome) => {
            println!("{}", outcome.message());
            let grace = Duration::from_secs(config.notifications.shutdown_grace_seconds.max(60));
            if !services.dispatcher.drain(grace).await {
                eprintln!("Some alerts were still pending when the wait ended");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("Notification failed: {err}");
            std::process::exit(1);
        }
    }
}
