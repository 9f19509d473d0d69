use radiotag_client::{
    client::RadioTagClient,
    config::Config,
    protocol::ProtocolEvent,
    telemetry,
    transport::HttpTransport,
};

use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Loaded configuration: {:?}", config);

    let transport =
        HttpTransport::new(&config.service.base_url).with_timeout(config.service.timeout());
    let (client, mut events) = RadioTagClient::new(transport);

    // narration stream from the driver
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ProtocolEvent::Sent(line) | ProtocolEvent::Received(line) => println!("{line}"),
                ProtocolEvent::StateChanged { field, value } => println!("== {field} = {value} =="),
                ProtocolEvent::Failed(reason) => eprintln!("!! {reason}"),
            }
        }
    });

    println!("commands: tag <station> | token | register | submit <key> <pin> | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("tag") => {
                let Some(station) = parts.next() else {
                    println!("usage: tag <station>");
                    continue;
                };
                let client = client.clone();
                let station = station.to_string();
                tokio::spawn(async move {
                    if let Err(err) = client.tag(&station).await {
                        tracing::warn!("tag failed: {err}");
                    }
                });
            }
            Some("token") => {
                let client = client.clone();
                tokio::spawn(async move {
                    if let Err(err) = client.request_token().await {
                        tracing::warn!("token request failed: {err}");
                    }
                });
            }
            Some("register") => {
                if !client.can_register().await {
                    println!("registration has not been offered yet");
                    continue;
                }
                let client = client.clone();
                tokio::spawn(async move {
                    if let Err(err) = client.register().await {
                        tracing::warn!("registration failed: {err}");
                    }
                });
            }
            Some("submit") => {
                let (Some(key), Some(pin)) = (parts.next(), parts.next()) else {
                    println!("usage: submit <key> <pin>");
                    continue;
                };
                let client = client.clone();
                let (key, pin) = (key.to_string(), pin.to_string());
                tokio::spawn(async move {
                    if let Err(err) = client.submit_registration(&key, &pin).await {
                        tracing::warn!("registration submission failed: {err}");
                    }
                });
            }
            Some("quit") | Some("exit") => break,
            Some(other) => println!("unknown command: {other}"),
            None => {}
        }
    }

    Ok(())
}
