use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(error) = stripe_webhook::run().await {
        error!("Service exited with error: {:?}", error);
        std::process::exit(1);
    }
}
