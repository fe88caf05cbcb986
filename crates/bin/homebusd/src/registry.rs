//! Static adapter registry — maps the `adapter` config key to a spawn
//! function. Unknown names are a startup error, never a silent skip.

use tokio::task::JoinHandle;

use homebus_app::bus::EventBus;

use crate::config::{AdapterSection, ConfigError};

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The config named an adapter this build does not know.
    #[error("section '{section}' references unknown adapter '{adapter}'")]
    UnknownAdapter {
        /// Config section (instance) name.
        section: String,
        /// The unrecognized `adapter` value.
        adapter: String,
    },
    /// An adapter section is missing a key it needs.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Instantiate the adapter a config section describes and spawn its task.
///
/// # Errors
///
/// Returns [`StartupError::UnknownAdapter`] for an unrecognized `adapter`
/// value, or a config error when the section is missing required keys.
pub fn spawn(section: &AdapterSection<'_>, bus: &EventBus) -> Result<JoinHandle<()>, StartupError> {
    match section.adapter {
        "ruuvi" => {
            let config = ruuvi_config(section)?;
            Ok(tokio::spawn(homebus_adapter_ruuvi::run(bus.clone(), config)))
        }
        other => Err(StartupError::UnknownAdapter {
            section: section.name.to_string(),
            adapter: other.to_string(),
        }),
    }
}

fn ruuvi_config(section: &AdapterSection<'_>) -> Result<homebus_adapter_ruuvi::Config, StartupError> {
    let path = section
        .get_string("path")
        .unwrap_or_else(|_| homebus_adapter_ruuvi::Config::default().path);
    let sensors = section.get_string_map("sensors")?;
    Ok(homebus_adapter_ruuvi::Config { path, sensors })
}
