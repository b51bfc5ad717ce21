use lambda_http::{run, service_fn, Error, Request};
use record_store::store::RecordStore;
use suggest_tags::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
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
