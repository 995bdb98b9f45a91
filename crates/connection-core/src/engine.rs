//! The connection management engine
//!
//! Serializes every staged/active transition through the model write
//! lock: PATCH merging, immediate and scheduled activation, the host's
//! direct activation path, and the activation callback to the embedding
//! application.
//!
//! The activation callback is invoked while the write lock is held; hosts
//! must not call back into the node from inside it.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use rnmos_node_core::clock::{make_node_clock, update_node_clock, CLOCK_NAME};
use rnmos_node_core::model::{Model, SharedModel};
use rnmos_node_core::resolve::resolve_rtp_auto;
use rnmos_node_core::resources::connection::{
    make_activation, receiver_params_from_json, receiver_params_to_json, sender_params_from_json,
    sender_params_to_json,
};
use rnmos_node_core::resources::{fields, Resource, ResourceKind};
use rnmos_node_core::{make_id, Version};
use rnmos_sdp_core as sdp;
use rnmos_sdp_core::TransportParams;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::staged::{self, ActivationRequest};
use crate::transportfile::make_transport_file;

/// Callback delivering the effective internal-form SDP for an activation,
/// or `None` for a deactivation. The return value reports whether the host
/// could apply the change.
pub type RtpActivationHandler = Arc<dyn Fn(&str, Option<&str>) -> bool + Send + Sync>;

/// The result of a PATCH `/staged` request.
#[derive(Debug)]
pub enum PatchOutcome {
    /// Applied (or activated) immediately; respond 200 with the endpoint.
    Applied(Value),
    /// Activation scheduled; respond 202 with the endpoint.
    Scheduled(Value),
}

pub struct ConnectionEngine {
    model: SharedModel,
    clock: Arc<dyn Clock>,
    on_activated: Option<RtpActivationHandler>,
}

impl ConnectionEngine {
    pub fn new(
        model: SharedModel,
        clock: Arc<dyn Clock>,
        on_activated: Option<RtpActivationHandler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            model,
            clock,
            on_activated,
        })
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Handle a PATCH to `/single/<kind>s/<id>/staged`.
    pub async fn patch_staged(
        self: &Arc<Self>,
        kind: ResourceKind,
        id: Uuid,
        patch: Value,
    ) -> Result<PatchOutcome> {
        let mut model = self.model.write().await;

        let connection = model
            .connection_resources
            .find(&id, kind)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let legs = connection.data["endpoint_staged"]["transport_params"]
            .as_array()
            .map(Vec::len)
            .unwrap_or_default();
        staged::validate_patch(kind, legs, &patch)?;

        let mut merged = connection.data["endpoint_staged"].clone();

        // a transport file staged to a receiver supplies transport
        // parameter defaults; explicit transport_params in the same patch
        // still win during the merge below
        if kind == ResourceKind::Receiver {
            if let Some(data) = patch["transport_file"]["data"].as_str().filter(|d| !d.is_empty())
            {
                let session = sdp::parse_session_description(data)
                    .map_err(|err| Error::Validation(format!("invalid transport file: {}", err)))?;
                let mut file_params = receiver_params_to_json(
                    &sdp::receiver_transport_params(&session).map_err(|err| {
                        Error::Validation(format!("invalid transport file: {}", err))
                    })?,
                );
                // the file describes the stream, not which interface this
                // receiver should use
                if let Some(legs) = file_params.as_array_mut() {
                    for leg in legs {
                        if let Some(leg) = leg.as_object_mut() {
                            leg.remove("interface_ip");
                        }
                    }
                }
                staged::merge_patch(&mut merged, &json!({ "transport_params": file_params }));
            }
        }

        staged::merge_patch(&mut merged, &patch);
        let request = staged::activation_request(&patch, &merged)?;

        let outcome = match request {
            ActivationRequest::None | ActivationRequest::Clear => {
                if request == ActivationRequest::Clear {
                    merged["activation"] = make_activation();
                    info!(id = %id, "cancelled pending activation");
                }
                let response = merged.clone();
                model.connection_resources.modify(&id, |connection| {
                    connection.data["endpoint_staged"] = merged;
                })?;
                model.notify();
                PatchOutcome::Applied(response)
            }
            ActivationRequest::Immediate => {
                let activation_time = self.clock.tai_now();
                merged["activation"]["requested_time"] = Value::Null;
                merged["activation"]["activation_time"] =
                    json!(activation_time.to_string());
                let response = merged.clone();
                model.connection_resources.modify(&id, |connection| {
                    connection.data["endpoint_staged"] = merged;
                })?;
                self.perform_activation(&mut model, kind, id, activation_time)?;
                model.notify();
                PatchOutcome::Applied(response)
            }
            ActivationRequest::ScheduledAbsolute(deadline)
            | ActivationRequest::ScheduledRelative(deadline) => {
                let deadline = if let ActivationRequest::ScheduledRelative(offset) = request {
                    let now = self.clock.tai_now();
                    let nanoseconds = now.nanoseconds as u64 + offset.nanoseconds as u64;
                    Version::new(
                        now.seconds + offset.seconds + nanoseconds / 1_000_000_000,
                        (nanoseconds % 1_000_000_000) as u32,
                    )
                } else {
                    deadline
                };
                merged["activation"]["activation_time"] = json!(deadline.to_string());
                let response = merged.clone();
                model.connection_resources.modify(&id, |connection| {
                    connection.data["endpoint_staged"] = merged;
                })?;
                model.notify();
                self.spawn_scheduled_activation(kind, id, deadline);
                PatchOutcome::Scheduled(response)
            }
        };
        Ok(outcome)
    }

    fn spawn_scheduled_activation(self: &Arc<Self>, kind: ResourceKind, id: Uuid, deadline: Version) {
        let engine = Arc::clone(self);
        info!(id = %id, deadline = %deadline, "scheduled activation");
        tokio::spawn(async move {
            let now = engine.clock.tai_now();
            if deadline > now {
                let delta = Duration::new(
                    deadline.seconds - now.seconds,
                    deadline.nanoseconds.saturating_sub(now.nanoseconds),
                );
                tokio::time::sleep(delta).await;
            }

            let mut model = engine.model.write().await;
            // a later PATCH may have cancelled or superseded the schedule;
            // whichever held the write lock first wins
            let still_pending = model
                .connection_resources
                .find(&id, kind)
                .map(|connection| {
                    let activation = &connection.data["endpoint_staged"]["activation"];
                    activation["mode"].as_str().map_or(false, |mode| {
                        mode != staged::MODE_ACTIVATE_IMMEDIATE
                    }) && activation["activation_time"] == json!(deadline.to_string())
                })
                .unwrap_or(false);
            if !still_pending {
                info!(id = %id, "scheduled activation no longer pending");
                return;
            }
            if let Err(err) = engine.perform_activation(&mut model, kind, id, deadline) {
                error!(id = %id, error = %err, "scheduled activation failed");
                return;
            }
            model.notify();
        });
    }

    /// Copy staged into active, resolve `auto` values, refresh a sender's
    /// transport file, update the IS-04 subscription, and deliver the
    /// activation callback.
    fn perform_activation(
        &self,
        model: &mut Model,
        kind: ResourceKind,
        id: Uuid,
        activation_time: Version,
    ) -> Result<()> {
        let connection = model
            .connection_resources
            .find(&id, kind)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let mut data = connection.data.clone();
        let staged_endpoint = data["endpoint_staged"].clone();

        let mut active = staged_endpoint;
        active["activation"]["activation_time"] = json!(activation_time.to_string());
        {
            let constraints = data["endpoint_constraints"].clone();
            resolve_rtp_auto(kind, &id, &constraints, &mut active["transport_params"])?;
        }
        data["endpoint_active"] = active;
        data["endpoint_staged"]["activation"] = make_activation();

        let master_enable = data["endpoint_active"]["master_enable"]
            .as_bool()
            .unwrap_or(false);
        info!(id = %id, kind = %kind, master_enable, "activating");

        let resource = model
            .node_resources
            .find(&id, kind)
            .ok_or_else(|| Error::Internal(format!("no node resource for {}", id)))?
            .clone();

        if kind == ResourceKind::Sender {
            let staging = Resource::new(id, kind, data.clone());
            if let Some(transport_file) =
                make_transport_file(model, &resource, &staging, self.clock.ntp_seconds())?
            {
                data["endpoint_transportfile"] = json!({
                    "data": transport_file,
                    "type": "application/sdp",
                });
            }
        }

        model.connection_resources.modify(&id, |connection| {
            connection.data = data.clone();
        })?;
        let peer_key = match kind {
            ResourceKind::Sender => "receiver_id",
            _ => "sender_id",
        };
        model.node_resources.modify(&id, |resource| {
            fields::set_subscription(&mut resource.data, master_enable, peer_key, activation_time);
        })?;

        self.deliver_activation(model, kind, id)?;
        Ok(())
    }

    /// Reconstruct the effective internal-form SDP and hand it to the
    /// host. Called with the model write lock held.
    fn deliver_activation(&self, model: &Model, kind: ResourceKind, id: Uuid) -> Result<()> {
        let Some(handler) = &self.on_activated else {
            return Ok(());
        };
        let resource = model
            .node_resources
            .find(&id, kind)
            .ok_or_else(|| Error::Internal(format!("no node resource for {}", id)))?;
        let Some(internal_id) = resource.internal_id().map(str::to_string) else {
            return Ok(());
        };
        let connection = model
            .connection_resources
            .find(&id, kind)
            .ok_or_else(|| Error::Internal(format!("no connection resource for {}", id)))?;

        let sdp_data = self.make_effective_sdp(model, resource, connection)?;
        let success = handler(&internal_id, sdp_data.as_deref());
        if !success {
            warn!(internal_id = %internal_id, "activation failed for internal id");
        }
        Ok(())
    }

    /// The internal-form SDP for the current active endpoint, or `None`
    /// when the resource is deactivated.
    fn make_effective_sdp(
        &self,
        model: &Model,
        resource: &Resource,
        connection: &Resource,
    ) -> Result<Option<String>> {
        let active = &connection.data["endpoint_active"];
        if !active["master_enable"].as_bool().unwrap_or(false) {
            return Ok(None);
        }

        // the active transport file for a sender; the staged-then-activated
        // transport file for a receiver; the original configuration SDP
        // when neither has been supplied
        let transport_file_data = match resource.kind {
            ResourceKind::Sender => connection.data["endpoint_transportfile"]["data"]
                .as_str()
                .filter(|data| !data.is_empty())
                .map(str::to_string),
            _ => active["transport_file"]["data"]
                .as_str()
                .filter(|data| !data.is_empty())
                .map(str::to_string),
        };
        let config_sdp = match resource.kind {
            ResourceKind::Sender => model.settings.senders.get(&resource.id),
            _ => model.settings.receivers.get(&resource.id),
        };
        let Some(sdp_text) = transport_file_data.or_else(|| config_sdp.cloned()) else {
            return Ok(None);
        };

        let skeleton = sdp::parse_session_description(&sdp_text)?;
        let params = match resource.kind {
            ResourceKind::Sender => {
                TransportParams::Sender(sender_params_from_json(&active["transport_params"])?)
            }
            _ => TransportParams::Receiver(receiver_params_from_json(
                &active["transport_params"],
            )?),
        };

        let internal_id = resource.internal_id().unwrap_or_default();
        let mut effective = sdp::make_internal_session_description(
            internal_id,
            resource.group_hint(),
            fields::description(&resource.data).filter(|info| !info.is_empty()),
            &skeleton,
            &params,
        )?;
        effective.origin.session_version = self.clock.ntp_seconds();
        Ok(Some(effective.to_string()))
    }

    /// The host-initiated activation path: rewrite the active endpoint of
    /// the sender or receiver with the given internal id directly from the
    /// supplied SDP data, or deactivate it when `sdp` is `None`.
    pub async fn activate_rtp_connection(
        &self,
        internal_id: &str,
        sdp_text: Option<&str>,
    ) -> Result<()> {
        let mut model = self.model.write().await;

        let seed_id = model.settings.seed_id;
        let node_id = make_id(&seed_id, ResourceKind::Node, "");
        let sender_id = make_id(&seed_id, ResourceKind::Sender, internal_id);
        let receiver_id = make_id(&seed_id, ResourceKind::Receiver, internal_id);

        let (id, kind) = if model
            .node_resources
            .find(&sender_id, ResourceKind::Sender)
            .is_some()
        {
            (sender_id, ResourceKind::Sender)
        } else if model
            .node_resources
            .find(&receiver_id, ResourceKind::Receiver)
            .is_some()
        {
            (receiver_id, ResourceKind::Receiver)
        } else {
            error!(internal_id = %internal_id, "could not find sender or receiver with internal id");
            return Err(Error::NotFound(internal_id.to_string()));
        };
        info!(id = %id, kind = %kind, internal_id = %internal_id, "updating connection");

        let parsed = sdp_text
            .map(sdp::parse_session_description)
            .transpose()?;

        // a sender's SDP may carry a new clock reference
        if kind == ResourceKind::Sender {
            if let Some(session) = &parsed {
                let refclks = sdp::ts_refclks(session)?;
                let mut ptp_domain = model
                    .settings
                    .clocks
                    .get(CLOCK_NAME)
                    .copied()
                    .unwrap_or_default();
                let clock = make_node_clock(CLOCK_NAME, &refclks, &mut ptp_domain);
                update_node_clock(&mut model.node_resources, &node_id, clock)?;
                model
                    .settings
                    .clocks
                    .insert(CLOCK_NAME.to_string(), ptp_domain);
            }
        }

        let activation_time = self.clock.tai_now();
        let master_enable = parsed.is_some();

        let connection = model
            .connection_resources
            .find(&id, kind)
            .ok_or_else(|| Error::Internal(format!("no connection resource for {}", id)))?;
        let mut data = connection.data.clone();
        {
            let active = &mut data["endpoint_active"];
            let peer_key = match kind {
                ResourceKind::Sender => "receiver_id",
                _ => "sender_id",
            };
            active[peer_key] = Value::Null;
            active["master_enable"] = json!(master_enable);
            active["activation"] = make_activation();
            if let Some(session) = &parsed {
                if kind == ResourceKind::Receiver {
                    active["transport_file"] = json!({
                        "data": sdp_text,
                        "type": "application/sdp",
                    });
                    active["transport_params"] =
                        receiver_params_to_json(&sdp::receiver_transport_params(session)?);
                } else {
                    active["transport_params"] =
                        sender_params_to_json(&sdp::sender_transport_params(session)?);
                }
            }
        }

        if kind == ResourceKind::Sender {
            let resource = model
                .node_resources
                .find(&id, kind)
                .ok_or_else(|| Error::Internal(format!("no node resource for {}", id)))?
                .clone();
            let staging = Resource::new(id, kind, data.clone());
            if let Some(transport_file) =
                make_transport_file(&model, &resource, &staging, self.clock.ntp_seconds())?
            {
                data["endpoint_transportfile"] = json!({
                    "data": transport_file,
                    "type": "application/sdp",
                });
            }
        }

        model.connection_resources.modify(&id, |connection| {
            connection.data = data.clone();
        })?;
        let peer_key = match kind {
            ResourceKind::Sender => "receiver_id",
            _ => "sender_id",
        };
        model.node_resources.modify(&id, |resource| {
            fields::set_subscription(&mut resource.data, master_enable, peer_key, activation_time);
        })?;

        model.notify();
        Ok(())
    }
}
