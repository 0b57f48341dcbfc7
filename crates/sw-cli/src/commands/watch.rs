//! Live fleet watching over the push relay

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use sw_protocol::Envelope;

use crate::client::AdminClient;
use crate::output::print_info;

/// Register as an administrator on the relay and print events as they
/// arrive, until interrupted.
pub async fn watch_command(client: &AdminClient) -> Result<()> {
    let url = client.relay_url();
    let (ws, _) = connect_async(&url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    let (mut sink, mut stream) = ws.split();

    sink.send(WsMessage::Text(Envelope::RegisterAdmin.to_text()?))
        .await
        .context("Failed to register")?;

    print_info("Watching the fleet (Ctrl+C to stop)...");

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(Ok(message)) = frame else {
                    bail!("Relay connection closed");
                };
                let WsMessage::Text(text) = message else { continue };
                match Envelope::from_text(&text) {
                    Ok(Envelope::RegistrationSuccess) => {}
                    Ok(Envelope::Ping) => {
                        sink.send(WsMessage::Text(Envelope::Pong.to_text()?)).await?;
                    }
                    Ok(Envelope::DeviceConnected { device_id }) => {
                        println!("+ {} connected", device_id);
                    }
                    Ok(Envelope::DeviceDisconnected { device_id }) => {
                        println!("- {} disconnected", device_id);
                    }
                    Ok(Envelope::DeviceStatus { device_id, snapshot }) => {
                        println!(
                            "  {} {:?} {} slide {}",
                            device_id,
                            snapshot.status,
                            snapshot.current_presentation_name.as_deref().unwrap_or("-"),
                            snapshot
                                .slide_index
                                .map(|i| (i + 1).to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        );
                    }
                    Ok(Envelope::CommandResult { device_id, command_id, status, .. }) => {
                        println!("  {} {} {}", device_id, command_id, status);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!("Undecodable relay frame: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }

    Ok(())
}
