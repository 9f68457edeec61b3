use sntp_query::{NtpClient, Request};
use std::time::Duration;
use tracing::Level;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    // Usage: query [host] [version]
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "pool.ntp.org".to_string());
    let version = args.next().and_then(|v| v.parse().ok()).unwrap_or(4);

    let request = Request::new(host)
        .version(version)
        .timeout(Duration::from_secs(3));

    println!("Querying {}:{} (NTPv{})", request.host, request.port, request.version);

    match NtpClient::new().query_detailed(&request).await {
        Ok(response) => {
            println!("- Local time:  {}", response.local);
            println!("- Server time: {}", response.remote);
            println!("- Offset:      {}", response.offset);
            println!("- Delay:       {}", response.delay);
            println!("- Stratum:     {}", response.stratum);
            println!("- Leap:        {:?}", response.leap);
            if let Some(code) = &response.kiss_code {
                println!("- Kiss code:   {}", code);
            }
            println!("- Root delay:  {:?}", response.root_delay);
        }
        Err(e) => eprintln!("Query failed: {}", e),
    }
}
