//! Device listing command

use anyhow::Result;

use crate::client::AdminClient;
use crate::output::format_devices;

/// List the fleet with derived presence
pub async fn devices_command(client: &AdminClient) -> Result<()> {
    let devices = client.list_devices().await?;
    println!("{}", format_devices(&devices));
    if !devices.is_empty() {
        let online = devices
            .iter()
            .filter(|d| d.presence == sw_core::types::PresenceStatus::Online)
            .count();
        println!("\n{} devices, {} online", devices.len(), online);
    }
    Ok(())
}
