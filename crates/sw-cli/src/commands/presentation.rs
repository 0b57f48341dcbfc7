//! Presentation catalog commands

use std::path::Path;

use anyhow::{Context, Result};

use sw_protocol::Presentation;

use crate::client::AdminClient;
use crate::output::{print_success, print_warning};

/// Show a catalog entry
pub async fn presentation_show_command(client: &AdminClient, id: u64) -> Result<()> {
    let presentation = client.get_presentation(id).await?;
    println!("{} - {}", presentation.id, presentation.name);
    if let Some(description) = &presentation.description {
        println!("  {}", description);
    }
    for (index, slide) in presentation.slides.iter().enumerate() {
        println!(
            "  [{}] {} ({}s, {:?})",
            index, slide.image_reference, slide.duration_seconds, slide.transition_type
        );
    }
    if presentation.validate_playable().is_err() {
        print_warning("This deck is not playable (no usable slides)");
    }
    Ok(())
}

/// Upload a TOML deck file into the catalog
pub async fn presentation_put_command(client: &AdminClient, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let presentation: Presentation =
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;

    if let Err(e) = presentation.validate_playable() {
        print_warning(&format!("Uploading anyway, but: {}", e));
    }

    let id = client.put_presentation(&presentation).await?;
    print_success(&format!(
        "Uploaded {} ({} slides)",
        id,
        presentation.slides.len()
    ));
    Ok(())
}
