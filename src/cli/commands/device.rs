//! Node device registry commands

use tabled::{Table, Tabled};

use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, truncate_with_ellipsis};
use crate::db::{Database, DeviceRepository, NodeDevice};

#[derive(Tabled)]
pub(crate) struct DeviceDisplay {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Token")]
    pub(crate) token: String,
}

impl From<&NodeDevice> for DeviceDisplay {
    fn from(device: &NodeDevice) -> Self {
        Self {
            id: device.id,
            name: device.name.clone(),
            // Full tokens are only shown once, at registration
            token: truncate_with_ellipsis(&device.token, 11),
        }
    }
}

pub(crate) fn format_table(devices: &[NodeDevice]) -> String {
    if devices.is_empty() {
        return "No devices registered.".to_string();
    }

    let display: Vec<DeviceDisplay> = devices.iter().map(DeviceDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    table.to_string()
}

/// Register a node device and print its token
pub async fn register<D: Database>(db: &D, name: Option<&str>) -> CliResult<String> {
    let device = db.devices().register(name).await?;
    Ok(format!(
        "Registered {} (#{})\nToken: {}",
        device.name, device.id, device.token
    ))
}

pub async fn list<D: Database>(db: &D) -> CliResult<String> {
    let devices = db.devices().list().await?;
    Ok(format_table(&devices))
}
