use invoice_actions::observability;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Nothing is listening to tracing yet if this fails.
    if let Err(error) = observability::init_observability("invoice-actions") {
        eprintln!("invoice-actions failed to initialize logging: {error:#}");
        std::process::exit(1);
    }

    if let Err(error) = invoice_actions::run().await {
        error!("invoice-actions exited with error: {:#}", error);
        std::process::exit(1);
    }
}
