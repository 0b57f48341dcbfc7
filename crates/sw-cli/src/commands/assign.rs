//! Assignment management commands

use anyhow::Result;

use crate::client::AdminClient;
use crate::output::print_success;

/// Bind a device to a presentation
pub async fn assign_command(client: &AdminClient, device_id: &str, presentation_id: u64) -> Result<()> {
    client.assign(device_id, presentation_id).await?;
    print_success(&format!(
        "Assigned presentation {} to {} (auto-play + loop)",
        presentation_id, device_id
    ));
    Ok(())
}

/// Remove a device's assignment
pub async fn unassign_command(client: &AdminClient, device_id: &str) -> Result<()> {
    client.unassign(device_id).await?;
    print_success(&format!("Cleared assignment for {}", device_id));
    Ok(())
}

/// Set or clear the fleet default presentation
pub async fn default_command(client: &AdminClient, presentation_id: Option<u64>) -> Result<()> {
    client.set_default(presentation_id).await?;
    match presentation_id {
        Some(id) => print_success(&format!("Fleet default set to presentation {}", id)),
        None => print_success("Fleet default cleared"),
    }
    Ok(())
}
