//! Embedding configuration

use std::sync::Arc;

use serde_json::json;

use rnmos_connection_core::RtpActivationHandler;
use rnmos_node_core::resources::tags;
use rnmos_node_core::Settings;

/// Severity levels delivered to the log callback. Values greater than
/// zero are warnings and errors; values less than zero are debugging or
/// trace messages.
pub mod log_levels {
    /// Errors which are likely to cause the node to terminate.
    pub const FATAL: i32 = 40;
    /// Errors which are unlikely to be recoverable without a restart.
    pub const SEVERE: i32 = 30;
    /// More serious recoverable errors such as rejected requests.
    pub const ERROR: i32 = 20;
    /// Minor problems that could be recovered automatically.
    pub const WARNING: i32 = 10;
    /// Higher level information about expected events.
    pub const INFO: i32 = 0;
    /// Chatty messages such as detailed request/response tracking.
    pub const VERBOSE: i32 = -10;
    /// Low level debugging information.
    pub const DEVEL: i32 = -40;
}

/// Callback for log messages: `(categories, level, message)`, where
/// categories is a comma separated list of topics.
pub type LogHandler = Arc<dyn Fn(&str, i32, &str) + Send + Sync>;

/// BCP-002-02 asset distinguishing information.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub manufacturer: String,
    pub product: String,
    pub instance_id: String,
    /// The function or functions, e.g. "Decoder" or "Encoder".
    pub functions: Vec<String>,
}

/// Configuration for a [`crate::NodeServer`].
#[derive(Clone, Default)]
pub struct NodeConfig {
    /// Fully-qualified host name, e.g. `nmos-node.local` or
    /// `nmos-node.example.com`. Names ending `.local` select multicast
    /// DNS-SD discovery; others select unicast DNS-SD in their domain.
    pub host_name: String,
    /// Host IP addresses senders and receivers may bind to.
    pub host_addresses: Vec<String>,
    /// Port for the HTTP APIs.
    pub http_port: u16,

    /// Label of the node and device; generated from the asset tags when
    /// absent.
    pub label: Option<String>,
    /// Description of the node and device; generated from the asset tags
    /// when absent.
    pub description: Option<String>,
    pub asset: Option<AssetConfig>,

    /// Seed string ensuring repeatable UUID generation. A random seed is
    /// used when absent; not recommended.
    pub seed: Option<String>,

    /// SDP data for the initial senders.
    pub senders: Vec<String>,
    /// SDP data for the initial receivers.
    pub receivers: Vec<String>,

    /// Called on every IS-05 activation or deactivation with the
    /// effective SDP data.
    ///
    /// The callback runs while the node's state lock is held: it must not
    /// call back into the [`crate::NodeServer`] and should return
    /// quickly.
    pub on_activation: Option<RtpActivationHandler>,

    /// Log message callback.
    pub on_log: Option<LogHandler>,
    /// Minimum severity for which to deliver log callbacks.
    pub log_level: i32,
    /// Topics to deliver; empty means all.
    pub log_categories: Vec<String>,
}

impl NodeConfig {
    pub fn new(host_name: impl Into<String>, http_port: u16) -> Self {
        Self {
            host_name: host_name.into(),
            http_port,
            log_level: log_levels::INFO,
            ..Self::default()
        }
    }

    /// Build the node settings this configuration describes.
    pub(crate) fn make_settings(&self) -> Settings {
        let seed = self
            .seed
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut settings =
            Settings::for_host(&self.host_name, &self.host_addresses, self.http_port, &seed);

        let label = self.label.clone().unwrap_or_else(|| {
            self.asset
                .as_ref()
                .map(|asset| {
                    format!(
                        "{} {} {}",
                        asset.manufacturer, asset.product, asset.instance_id
                    )
                })
                .unwrap_or_default()
        });
        let description = self.description.clone().unwrap_or_else(|| {
            self.asset
                .as_ref()
                .map(|asset| asset.functions.join(", "))
                .unwrap_or_default()
        });
        settings.node_label = label.clone();
        settings.device_label = label;
        settings.node_description = description.clone();
        settings.device_description = description;

        if let Some(asset) = &self.asset {
            settings.node_tags = json!({
                (tags::ASSET_MANUFACTURER): [asset.manufacturer],
                (tags::ASSET_PRODUCT): [asset.product],
                (tags::ASSET_INSTANCE_ID): [asset.instance_id],
            });
            settings.device_tags = json!({
                (tags::ASSET_MANUFACTURER): [asset.manufacturer],
                (tags::ASSET_PRODUCT): [asset.product],
                (tags::ASSET_INSTANCE_ID): [asset.instance_id],
                (tags::ASSET_FUNCTION): asset.functions,
            });
        }

        settings.logging_level = self.log_level;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetConfig {
        AssetConfig {
            manufacturer: "Acme".to_string(),
            product: "Widget Pro".to_string(),
            instance_id: "XYZ123-456789".to_string(),
            functions: vec!["Encoder".to_string(), "Decoder".to_string()],
        }
    }

    #[test]
    fn test_labels_from_asset_tags() {
        let mut config = NodeConfig::new("nmos-node.local", 8080);
        config.asset = Some(asset());
        let settings = config.make_settings();
        assert_eq!(settings.node_label, "Acme Widget Pro XYZ123-456789");
        assert_eq!(settings.node_description, "Encoder, Decoder");
        assert_eq!(
            settings.device_tags[tags::ASSET_FUNCTION][1],
            "Decoder"
        );
        assert!(settings.node_tags[tags::ASSET_FUNCTION].is_null());
    }

    #[test]
    fn test_explicit_label_wins() {
        let mut config = NodeConfig::new("nmos-node.local", 8080);
        config.asset = Some(asset());
        config.label = Some("Studio Node".to_string());
        let settings = config.make_settings();
        assert_eq!(settings.node_label, "Studio Node");
        assert_eq!(settings.device_label, "Studio Node");
    }

    #[test]
    fn test_same_seed_same_identity() {
        let mut a = NodeConfig::new("nmos-node.local", 8080);
        a.seed = Some("nmos-node.local:8080".to_string());
        let mut b = NodeConfig::new("nmos-node.local", 8080);
        b.seed = Some("nmos-node.local:8080".to_string());
        assert_eq!(a.make_settings().seed_id, b.make_settings().seed_id);

        // absent seed randomizes
        let c = NodeConfig::new("nmos-node.local", 8080);
        let d = NodeConfig::new("nmos-node.local", 8080);
        assert_ne!(c.make_settings().seed_id, d.make_settings().seed_id);
    }
}
