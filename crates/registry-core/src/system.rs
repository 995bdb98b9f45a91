//! IS-09 System API client
//!
//! When a System API is advertised on the network, the node fetches the
//! system-global resource and merges its parameters into the live
//! settings. The effect propagates to heartbeat intervals immediately;
//! senders' transport files pick up a changed PTP domain the next time
//! they are re-synthesized.

use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use serde_json::Value;
use tracing::{info, warn};

use rnmos_node_core::SharedModel;

use crate::error::{Error, Result};

/// The IS-09 system service type.
pub const SERVICE_SYSTEM: &str = "_nmos-system._tcp";

const SYSTEM_GLOBAL_PATH: &str = "x-nmos/system/v1.0/global";

/// Browse for a System API and return its base URL, if any.
pub async fn discover_system_api(timeout: Duration) -> Result<Option<String>> {
    let daemon = ServiceDaemon::new().map_err(|e| Error::Discovery(e.to_string()))?;
    let browse_type = format!("{}.local.", SERVICE_SYSTEM);
    let receiver = daemon
        .browse(&browse_type)
        .map_err(|e| Error::Discovery(e.to_string()))?;

    let deadline = tokio::time::Instant::now() + timeout;
    let mut base_url = None;
    while base_url.is_none() {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let event = tokio::task::spawn_blocking({
            let receiver = receiver.clone();
            move || receiver.recv_timeout(remaining.min(Duration::from_millis(250)))
        })
        .await
        .map_err(|e| Error::Discovery(e.to_string()))?;

        if let Ok(ServiceEvent::ServiceResolved(resolved)) = event {
            if let Some(address) = resolved.get_addresses().iter().find(|a| a.is_ipv4()) {
                let protocol = resolved
                    .get_property_val_str("api_proto")
                    .unwrap_or("http");
                base_url = Some(format!(
                    "{}://{}:{}/",
                    protocol,
                    address,
                    resolved.get_port()
                ));
            }
        }
    }
    let _ = daemon.stop_browse(&browse_type);
    let _ = daemon.shutdown();
    Ok(base_url)
}

/// Fetch the system-global resource from a System API.
pub async fn fetch_system_global(base_url: &str) -> Result<Value> {
    let response = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?
        .get(format!("{}{}", base_url, SYSTEM_GLOBAL_PATH))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(Error::Rejected(response.status().as_u16()));
    }
    Ok(response.json().await?)
}

/// Discover a System API and merge its global configuration into the
/// model's settings.
pub async fn apply_system_global(model: &SharedModel) -> Result<()> {
    match discover_system_api(Duration::from_secs(2)).await? {
        Some(base_url) => {
            info!(base_url = %base_url, "new system global configuration discovered from the System API");
            let global = fetch_system_global(&base_url).await?;
            let mut model = model.write().await;
            model.settings.merge_system_global(&global);
            model.notify();
            Ok(())
        }
        None => {
            warn!("system global configuration is not discoverable");
            Ok(())
        }
    }
}
