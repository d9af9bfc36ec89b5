use std::sync::Arc;
use std::time::Duration;

use callback_dispatcher::{DeliveryTarget, Dispatcher, DispatcherConfig, InMemoryCounterStore};

#[tokio::main]
async fn main() {
    let store = Arc::new(InMemoryCounterStore::new());
    let dispatcher = match Dispatcher::new(DispatcherConfig::default(), store.clone()) {
        Ok(d) => d,
        Err(err) => {
            eprintln!("failed to build dispatcher: {err}");
            return;
        }
    };

    let target = DeliveryTarget::new("1001", "https://example.com/webhook")
        .with_timeout(Duration::from_secs(5))
        .confirm_body_regex(r#""result"\s*:\s*true"#);

    if let Err(err) = dispatcher.deliver(&target, r#"{"id":123}"#).await {
        eprintln!("{err}");
    }

    let counters = store.snapshot(&dispatcher.counter_key(&target.subscriber_id)).await;
    println!("total={} failure={}", counters.total, counters.failure);
}
