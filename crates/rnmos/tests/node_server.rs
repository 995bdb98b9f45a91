//! End-to-end scenarios against the embedding API and the HTTP surface.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use rnmos::{NodeConfig, NodeServer};
use rnmos_node_core::{make_id, make_seed_id, ResourceKind};

const SEED: &str = "nmos-api.local:8080";

fn config(port: u16) -> NodeConfig {
    let mut config = NodeConfig::new("nmos-api.local", port);
    config.host_addresses = vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()];
    config.seed = Some(SEED.to_string());
    config
}

fn video_sender_sdp() -> String {
    "v=0\r\n\
     o=- 1697705406 1697705406 IN IP4 192.0.2.10\r\n\
     s=NvNmos Video Sender\r\n\
     i=YCbCr-4:2:2, 10 bit, 1920 x 1080, progressive, 50 Hz\r\n\
     t=0 0\r\n\
     a=x-nvnmos-id:sink-0\r\n\
     a=x-nvnmos-group-hint:tx-0:video\r\n\
     m=video 5020 RTP/AVP 96\r\n\
     c=IN IP4 233.252.0.0/64\r\n\
     a=source-filter: incl IN IP4 233.252.0.0 192.0.2.10\r\n\
     a=x-nvnmos-iface-ip:192.0.2.10\r\n\
     a=x-nvnmos-src-port:5004\r\n\
     a=rtpmap:96 raw/90000\r\n\
     a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; \r\n\
     a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
     a=ts-refclk:ptp=IEEE1588-2008:traceable\r\n\
     a=mediaclk:direct=0\r\n"
        .to_string()
}

fn audio_receiver_sdp() -> String {
    "v=0\r\n\
     o=- 1697705406 1697705406 IN IP4 192.0.2.10\r\n\
     s=NvNmos Audio Receiver\r\n\
     i=2 ch, 48 kHz, 24 bit\r\n\
     t=0 0\r\n\
     a=x-nvnmos-id:source-1\r\n\
     m=audio 5030 RTP/AVP 97\r\n\
     c=IN IP4 233.252.0.1/64\r\n\
     a=source-filter: incl IN IP4 233.252.0.1 192.0.2.1\r\n\
     a=x-nvnmos-iface-ip:192.0.2.10\r\n\
     a=rtpmap:97 L24/48000/2\r\n\
     a=fmtp:97 channel-order=SMPTE2110.(ST); \r\n\
     a=mediaclk:direct=0\r\n"
        .to_string()
}

fn dual_leg_sender_sdp() -> String {
    "v=0\r\n\
     o=- 1697705406 1697705406 IN IP4 192.0.2.10\r\n\
     s=Dual Leg Sender\r\n\
     t=0 0\r\n\
     a=x-nvnmos-id:sink-2\r\n\
     a=group:DUP 0 1\r\n\
     m=video 5020 RTP/AVP 96\r\n\
     c=IN IP4 233.252.0.4/64\r\n\
     a=source-filter: incl IN IP4 233.252.0.4 192.0.2.10\r\n\
     a=x-nvnmos-iface-ip:192.0.2.10\r\n\
     a=rtpmap:96 raw/90000\r\n\
     a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; \r\n\
     a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
     a=mediaclk:direct=0\r\n\
     a=mid:0\r\n\
     m=video 5021 RTP/AVP 96\r\n\
     c=IN IP4 233.252.0.5/64\r\n\
     a=source-filter: incl IN IP4 233.252.0.5 192.0.2.11\r\n\
     a=x-nvnmos-iface-ip:192.0.2.11\r\n\
     a=rtpmap:96 raw/90000\r\n\
     a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; \r\n\
     a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
     a=mediaclk:direct=0\r\n\
     a=mid:1\r\n"
        .to_string()
}

fn expected_id(kind: ResourceKind, internal_id: &str) -> Uuid {
    make_id(&make_seed_id(SEED), kind, internal_id)
}

#[tokio::test(flavor = "multi_thread")]
async fn start_and_serve_node_api() {
    let server = NodeServer::create(config(18621)).await.expect("node started");

    // deterministic node and device identity
    let node_id = expected_id(ResourceKind::Node, "");
    let http = reqwest::Client::new();
    let node: Value = http
        .get("http://127.0.0.1:18621/x-nmos/node/v1.3/self/")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(node["id"], node_id.to_string());
    assert_eq!(node["clocks"][0]["name"], "clk0");
    assert_eq!(node["clocks"][0]["ref_type"], "internal");
    assert!(node["interfaces"].as_array().unwrap().is_empty());

    let devices: Value = http
        .get("http://127.0.0.1:18621/x-nmos/node/v1.3/devices/")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        devices[0]["id"],
        expected_id(ResourceKind::Device, "").to_string()
    );

    // TRACE is not permitted anywhere
    let response = http
        .request(
            reqwest::Method::from_bytes(b"TRACE").unwrap(),
            "http://127.0.0.1:18621/x-nmos/node/v1.3/self/",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn add_sender_updates_clock_and_interfaces() {
    let server = NodeServer::create(config(18622)).await.expect("node started");
    assert!(server.add_sender(&video_sender_sdp()).await);

    let sender_id = expected_id(ResourceKind::Sender, "sink-0");
    let model = server.model().read().await;
    let sender = model
        .node_resources
        .find(&sender_id, ResourceKind::Sender)
        .expect("sender resource");
    assert_eq!(sender.data["label"], "NvNmos Video Sender");

    let node_id = expected_id(ResourceKind::Node, "");
    let node = model
        .node_resources
        .find(&node_id, ResourceKind::Node)
        .unwrap();
    assert_eq!(node.data["clocks"][0]["ref_type"], "ptp");
    assert_eq!(node.data["clocks"][0]["gmid"], "ac-de-48-23-45-67-01-9f");
    assert_eq!(node.data["clocks"][0]["traceable"], true);
    assert_eq!(model.settings.clocks["clk0"], 42);
    assert_eq!(node.data["interfaces"][0]["name"], "192.0.2.10");
    drop(model);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn activate_sender_and_fetch_transport_file() {
    let server = NodeServer::create(config(18623)).await.expect("node started");
    assert!(server.add_sender(&video_sender_sdp()).await);
    assert!(server.activate("sink-0", Some(&video_sender_sdp())).await);

    let sender_id = expected_id(ResourceKind::Sender, "sink-0");
    {
        let model = server.model().read().await;
        let connection = model
            .connection_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap();
        let active = &connection.data["endpoint_active"];
        assert_eq!(active["master_enable"], true);
        assert_eq!(active["transport_params"][0]["destination_ip"], "233.252.0.0");
        assert_eq!(active["transport_params"][0]["destination_port"], 5020);
    }

    let url = format!(
        "http://127.0.0.1:18623/x-nmos/connection/v1.1/single/senders/{}/transportfile/",
        sender_id
    );
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap(),
        "application/sdp"
    );
    let body = response.text().await.unwrap();
    assert!(!body.contains("x-nvnmos-"));
    assert!(body.contains("a=mediaclk:direct=0\r\n"));
    // origin session version refreshed to the current NTP seconds
    let origin_line = body
        .lines()
        .find(|line| line.starts_with("o="))
        .expect("origin line");
    let session_version: u64 = origin_line.split(' ').nth(2).unwrap().parse().unwrap();
    assert!(session_version > 3_900_000_000, "not NTP time: {}", origin_line);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn receiver_capabilities_from_sdp() {
    let server = NodeServer::create(config(18624)).await.expect("node started");
    assert!(server.add_receiver(&audio_receiver_sdp()).await);

    let receiver_id = expected_id(ResourceKind::Receiver, "source-1");
    let model = server.model().read().await;
    let receiver = model
        .node_resources
        .find(&receiver_id, ResourceKind::Receiver)
        .unwrap();
    let set = &receiver.data["caps"]["constraint_sets"][0];
    assert_eq!(set["urn:x-nmos:cap:format:channel_count"]["enum"][0], 2);
    assert_eq!(
        set["urn:x-nmos:cap:format:sample_rate"]["enum"][0]["numerator"],
        48000
    );
    assert_eq!(
        set["urn:x-nmos:cap:format:sample_rate"]["enum"][0]["denominator"],
        1
    );
    assert_eq!(set["urn:x-nmos:cap:format:sample_depth"]["enum"][0], 24);
    drop(model);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_and_readd_keeps_identity() {
    let server = NodeServer::create(config(18625)).await.expect("node started");
    assert!(server.add_sender(&video_sender_sdp()).await);

    let sender_id = expected_id(ResourceKind::Sender, "sink-0");
    let first_version = {
        let model = server.model().read().await;
        model
            .node_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap()
            .version()
            .unwrap()
    };

    assert!(server.remove_sender("sink-0").await);
    {
        let model = server.model().read().await;
        assert!(model.node_resources.get(&sender_id).is_none());
        assert_eq!(model.node_resources.iter_kind(ResourceKind::Flow).count(), 0);
        assert_eq!(
            model.node_resources.iter_kind(ResourceKind::Source).count(),
            0
        );
    }

    assert!(server.add_sender(&video_sender_sdp()).await);
    let model = server.model().read().await;
    let sender = model
        .node_resources
        .find(&sender_id, ResourceKind::Sender)
        .expect("same UUID after re-add");
    assert!(sender.version().unwrap() > first_version);
    drop(model);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn dual_leg_deactivation_flips_only_master_enable() {
    let activations: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = activations.clone();
    let mut config = config(18626);
    config.on_activation = Some(Arc::new(move |_, sdp| {
        sink.lock().unwrap().push(sdp.map(str::to_string));
        true
    }));
    let server = NodeServer::create(config).await.expect("node started");
    assert!(server.add_sender(&dual_leg_sender_sdp()).await);

    let sender_id = expected_id(ResourceKind::Sender, "sink-2");
    {
        let model = server.model().read().await;
        let connection = model
            .connection_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap();
        assert_eq!(
            connection.data["endpoint_active"]["transport_params"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    // enable, then stage a deactivation and activate it
    assert!(server.activate("sink-2", Some(&dual_leg_sender_sdp())).await);
    let http = reqwest::Client::new();
    let url = format!(
        "http://127.0.0.1:18626/x-nmos/connection/v1.1/single/senders/{}/staged/",
        sender_id
    );
    let response = http
        .patch(&url)
        .json(&serde_json::json!({
            "master_enable": false,
            "activation": { "mode": "activate_immediate" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let model = server.model().read().await;
    let connection = model
        .connection_resources
        .find(&sender_id, ResourceKind::Sender)
        .unwrap();
    let active = &connection.data["endpoint_active"];
    assert_eq!(active["master_enable"], false);
    // both legs keep their rtp_enabled state
    assert_eq!(active["transport_params"][0]["rtp_enabled"], true);
    assert_eq!(active["transport_params"][1]["rtp_enabled"], true);
    // transport file re-emitted for the deactivated sender
    let transport_file = connection.data["endpoint_transportfile"]["data"]
        .as_str()
        .unwrap();
    assert!(transport_file.contains("a=group:DUP 0 1"));
    drop(model);

    // the IS-05 deactivation reached the host with no SDP
    let seen = activations.lock().unwrap();
    assert_eq!(seen.last(), Some(&None));
    drop(seen);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn activate_then_deactivate_restores_node_resources() {
    let server = NodeServer::create(config(18627)).await.expect("node started");
    assert!(server.add_sender(&video_sender_sdp()).await);

    let sender_id = expected_id(ResourceKind::Sender, "sink-0");
    let subscription_before = {
        let model = server.model().read().await;
        model
            .node_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap()
            .data["subscription"]
            .clone()
    };

    assert!(server.activate("sink-0", Some(&video_sender_sdp())).await);
    assert!(server.activate("sink-0", None).await);

    let model = server.model().read().await;
    assert_eq!(model.node_resources.iter().count(), 5);
    let sender = model
        .node_resources
        .find(&sender_id, ResourceKind::Sender)
        .unwrap();
    assert_eq!(sender.data["subscription"], subscription_before);
    let connection = model
        .connection_resources
        .find(&sender_id, ResourceKind::Sender)
        .unwrap();
    assert_eq!(connection.data["endpoint_active"]["master_enable"], false);
    drop(model);

    assert!(server.shutdown().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_inputs_return_false_and_leave_the_model_unchanged() {
    let server = NodeServer::create(config(18628)).await.expect("node started");

    // malformed SDP
    assert!(!server.add_sender("not an sdp").await);
    // unsupported media type
    let vp8 = video_sender_sdp().replace("96 raw/90000", "96 VP8/90000");
    assert!(!server.add_sender(&vp8).await);
    // no x-nvnmos-id
    let anonymous = video_sender_sdp().replace("a=x-nvnmos-id:sink-0\r\n", "");
    assert!(!server.add_sender(&anonymous).await);
    // unknown ids
    assert!(!server.remove_sender("missing").await);
    assert!(!server.activate("missing", None).await);

    let model = server.model().read().await;
    // only the node and device remain
    assert_eq!(model.node_resources.iter().count(), 2);
    assert!(model.connection_resources.is_empty());
    drop(model);

    assert!(server.shutdown().await);
}
