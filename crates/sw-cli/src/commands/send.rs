//! Send-command implementation

use anyhow::{bail, Result};

use crate::client::AdminClient;
use crate::output::{print_info, print_success};

/// Enqueue a command for a device.
///
/// `kind` is the wire name (`play`, `goto_slide`, ...); parameterized kinds
/// take their arguments from the dedicated flags.
pub async fn send_command(
    client: &AdminClient,
    device_id: &str,
    kind: &str,
    slide_index: Option<usize>,
    presentation_id: Option<u64>,
) -> Result<()> {
    let parameters = match kind {
        "goto_slide" => {
            let Some(index) = slide_index else {
                bail!("goto_slide needs --slide <INDEX>");
            };
            Some(serde_json::json!({ "slide_index": index }))
        }
        "assign_presentation" => {
            let Some(id) = presentation_id else {
                bail!("assign_presentation needs --presentation <ID>");
            };
            Some(serde_json::json!({
                "presentation_id": id,
                "auto_play": true,
                "loop_mode": true,
            }))
        }
        _ => None,
    };

    let (command, pushed) = client.send_command(device_id, kind, parameters).await?;
    print_success(&format!("Queued {} for {}", command.id, device_id));
    if pushed {
        print_info("Delivered immediately over the push socket");
    } else {
        print_info("Device has no live socket; it will pick the command up on its next heartbeat");
    }
    Ok(())
}
