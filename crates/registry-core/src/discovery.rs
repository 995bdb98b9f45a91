//! Registry discovery via DNS-SD
//!
//! Hosts with a `.local` name browse multicast DNS for
//! `_nmos-register._tcp` (and the legacy `_nmos-registration._tcp`);
//! hosts in a unicast DNS domain look up the equivalent SRV records in
//! that domain. Candidates are ordered by (priority, weight).

use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// The IS-04 registration service type.
pub const SERVICE_REGISTER: &str = "_nmos-register._tcp";
/// The pre-v1.3 name for the same service.
pub const SERVICE_REGISTRATION_LEGACY: &str = "_nmos-registration._tcp";

/// A discovered registry candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    /// Base URL, e.g. `http://registry.example.com:8235/`.
    pub base_url: String,
    pub priority: u16,
    pub weight: u16,
}

/// Browse multicast DNS for registries for the given duration.
pub async fn browse_mdns(timeout: Duration) -> Result<Vec<RegistryEndpoint>> {
    let daemon = ServiceDaemon::new().map_err(|e| Error::Discovery(e.to_string()))?;
    let mut endpoints = Vec::new();

    for service_type in [SERVICE_REGISTER, SERVICE_REGISTRATION_LEGACY] {
        let browse_type = format!("{}.local.", service_type);
        let receiver = daemon
            .browse(&browse_type)
            .map_err(|e| Error::Discovery(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
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

            match event {
                Ok(ServiceEvent::ServiceResolved(resolved)) => {
                    let Some(address) = resolved.get_addresses().iter().find(|a| a.is_ipv4())
                    else {
                        continue;
                    };
                    let protocol = resolved
                        .get_property_val_str("api_proto")
                        .unwrap_or("http")
                        .to_string();
                    let priority = resolved
                        .get_property_val_str("pri")
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(0);
                    let endpoint = RegistryEndpoint {
                        base_url: format!("{}://{}:{}/", protocol, address, resolved.get_port()),
                        priority,
                        weight: 0,
                    };
                    info!(base_url = %endpoint.base_url, "discovered registry via mDNS");
                    if !endpoints.contains(&endpoint) {
                        endpoints.push(endpoint);
                    }
                }
                Ok(other) => debug!(?other, "mDNS event"),
                // receive timeout; keep browsing until the deadline
                Err(_) => {}
            }
        }
        let _ = daemon.stop_browse(&browse_type);
    }
    let _ = daemon.shutdown();

    sort_endpoints(&mut endpoints);
    Ok(endpoints)
}

/// Look up registry SRV records in the given unicast DNS domain.
pub async fn lookup_unicast(domain: &str) -> Result<Vec<RegistryEndpoint>> {
    use hickory_resolver::TokioAsyncResolver;

    let resolver = TokioAsyncResolver::tokio_from_system_conf()
        .map_err(|e| Error::Discovery(e.to_string()))?;

    let mut endpoints = Vec::new();
    for service_type in [SERVICE_REGISTER, SERVICE_REGISTRATION_LEGACY] {
        let name = format!("{}.{}.", service_type, domain.trim_end_matches('.'));
        match resolver.srv_lookup(name.clone()).await {
            Ok(lookup) => {
                for srv in lookup.iter() {
                    let endpoint = RegistryEndpoint {
                        base_url: format!(
                            "http://{}:{}/",
                            srv.target().to_utf8().trim_end_matches('.'),
                            srv.port()
                        ),
                        priority: srv.priority(),
                        weight: srv.weight(),
                    };
                    info!(base_url = %endpoint.base_url, "discovered registry via DNS");
                    if !endpoints.contains(&endpoint) {
                        endpoints.push(endpoint);
                    }
                }
            }
            Err(err) => warn!(name = %name, error = %err, "SRV lookup failed"),
        }
    }

    sort_endpoints(&mut endpoints);
    Ok(endpoints)
}

fn sort_endpoints(endpoints: &mut [RegistryEndpoint]) {
    endpoints.sort_by_key(|e| (e.priority, e.weight));
}

/// Discover registries for the given host: multicast for `.local` names,
/// unicast SRV lookup otherwise.
pub async fn discover(is_mdns: bool, domain: &str, timeout: Duration) -> Result<Vec<RegistryEndpoint>> {
    let endpoints = if is_mdns {
        browse_mdns(timeout).await?
    } else {
        lookup_unicast(domain).await?
    };
    if endpoints.is_empty() {
        Err(Error::NoRegistry)
    } else {
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_endpoints_by_priority_then_weight() {
        let mut endpoints = vec![
            RegistryEndpoint {
                base_url: "http://b:80/".to_string(),
                priority: 20,
                weight: 0,
            },
            RegistryEndpoint {
                base_url: "http://c:80/".to_string(),
                priority: 10,
                weight: 5,
            },
            RegistryEndpoint {
                base_url: "http://a:80/".to_string(),
                priority: 10,
                weight: 0,
            },
        ];
        sort_endpoints(&mut endpoints);
        assert_eq!(endpoints[0].base_url, "http://a:80/");
        assert_eq!(endpoints[1].base_url, "http://c:80/");
        assert_eq!(endpoints[2].base_url, "http://b:80/");
    }
}
