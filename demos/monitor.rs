use salus_it500::{MIN_POLL_INTERVAL, SalusClient};
use std::env;

#[tokio::main]
async fn main() -> salus_it500::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let device = args.get(1).expect("usage: monitor <device-id> [zone]");
    let zone: u8 = args.get(2).and_then(|z| z.parse().ok()).unwrap_or(1);
    let username = env::var("SALUS_USERNAME").expect("SALUS_USERNAME not set");
    let password = env::var("SALUS_PASSWORD").expect("SALUS_PASSWORD not set");

    let mut client = SalusClient::builder(username, password, device)
        .zone(zone)
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|state| {
            let show = |r: &Option<salus_it500::Reading>| {
                r.as_ref()
                    .and_then(|r| r.celsius())
                    .map_or_else(|| "-".to_string(), |c| format!("{c:.1}"))
            };
            println!(
                "room {} C | target {} C | frost {} C | mode {:?} | {:?}",
                show(&state.current_temperature),
                show(&state.target_temperature),
                show(&state.frost),
                state.operation_mode,
                state.hvac_action(),
            );
        })
        .build()?;

    println!("Polling {} every {}s...", client.unique_id(), MIN_POLL_INTERVAL.as_secs());

    loop {
        if let Err(e) = client.read().await {
            eprintln!("Poll error: {e}");
        }
        tokio::time::sleep(MIN_POLL_INTERVAL).await;
    }
}
