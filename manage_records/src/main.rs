use lambda_http::{run, service_fn, Error, Request};
use manage_records::function_handler;
use record_store::store::RecordStore;

const TRACE_DEBUG: &str = "TRACE_DEBUG";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(match std::env::var(TRACE_DEBUG) {
            Ok(_) => tracing::Level::DEBUG,
            Err(_) => tracing::Level::INFO,
        })
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let store = RecordStore::from_env().await?;
    let store = &store;
    run(service_fn(move |event: Request| async move {
        function_handler(store, event).await
    }))
    .await
}
