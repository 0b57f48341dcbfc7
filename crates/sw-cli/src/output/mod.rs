//! Output formatting utilities for the CLI

use tabled::{
    settings::Style,
    Table, Tabled,
};

use sw_core::time;

use crate::client::DeviceRow;

/// Format the device list as an ASCII table
pub fn format_devices(devices: &[DeviceRow]) -> String {
    if devices.is_empty() {
        return "No devices have reported yet".to_string();
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "PRESENCE")]
        presence: String,
        #[tabled(rename = "SHOWING")]
        showing: String,
        #[tabled(rename = "SLIDE")]
        slide: String,
        #[tabled(rename = "LAST SEEN")]
        last_seen: String,
    }

    let rows: Vec<Row> = devices
        .iter()
        .map(|d| Row {
            id: d.id.clone(),
            name: d.display_name.clone(),
            presence: d.presence.to_string(),
            showing: d
                .reported
                .current_presentation_name
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            slide: match (d.reported.slide_index, d.reported.total_slides) {
                (Some(index), Some(total)) => format!("{}/{}", index + 1, total),
                _ => "-".to_string(),
            },
            last_seen: format_age(d.last_heartbeat_at),
        })
        .collect();

    Table::new(rows).with(Style::sharp()).to_string()
}

/// Render a millisecond timestamp as a rough age
pub fn format_age(stamp_millis: u64) -> String {
    let elapsed = time::elapsed_since(stamp_millis).as_secs();
    if elapsed < 60 {
        format!("{}s ago", elapsed)
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else {
        format!("{}h ago", elapsed / 3600)
    }
}

/// Print a success message with a green check
pub fn print_success(message: &str) {
    println!("\x1b[32m✓\x1b[0m {}", message);
}

/// Print an informational message
pub fn print_info(message: &str) {
    println!("\x1b[34m•\x1b[0m {}", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("\x1b[33m!\x1b[0m {}", message);
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        let now = time::now_millis();
        assert_eq!(format_age(now), "0s ago");
        assert_eq!(format_age(now - 120_000), "2m ago");
        assert_eq!(format_age(now - 7_200_000), "2h ago");
    }

    #[test]
    fn test_empty_device_table() {
        assert_eq!(format_devices(&[]), "No devices have reported yet");
    }
}
