//! End-to-end orchestration tests: plan preparation, outcome recording,
//! health exclusion, and campaign pause/resume.

use rotor::config::{EngineConfig, RotationSettings, ServerConfig};
use rotor::orchestrator::{
    DeliveryOrchestrator, EngineError, OutboundMessage, OutcomeDisposition, SendOutcome,
};
use rotor::registry::{ServerKind, ServerProtocol};
use rotor::retry::ErrorType;
use rotor::rotation::RotationStrategy;

fn proxy(name: &str) -> ServerConfig {
    ServerConfig {
        name: Some(name.to_string()),
        host: format!("{}.example.net", name),
        port: 1080,
        protocol: Some(ServerProtocol::Socks5),
        username: None,
        password: None,
        active: true,
    }
}

fn relay(name: &str) -> ServerConfig {
    ServerConfig {
        name: Some(name.to_string()),
        host: format!("{}.example.net", name),
        port: 587,
        protocol: Some(ServerProtocol::Smtp),
        username: None,
        password: None,
        active: true,
    }
}

fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.proxies = vec![proxy("proxy-a"), proxy("proxy-b")];
    config.relays = vec![relay("relay-a"), relay("relay-b"), relay("relay-c")];
    config
}

fn message(id: &str) -> OutboundMessage {
    OutboundMessage {
        message_id: id.to_string(),
        phone_number: "2125550142".to_string(),
    }
}

#[test]
fn prepare_send_produces_complete_plan() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    let plan = engine.prepare_send("u1", "c1", &message("m1")).unwrap();

    assert_eq!(plan.message_id, "m1");
    assert!(plan.proxy.is_some());
    assert!(plan.relay.is_some());
    assert!((1.0..=5.0).contains(&plan.delay_seconds));
    assert_eq!(plan.carrier_hint.as_deref(), Some("Verizon"));
    assert_eq!(plan.timezone_hint.as_deref(), Some("America/New_York"));
    // No carrier window yet: base rate applies.
    assert_eq!(plan.allowed_rate_per_minute, Some(60.0));
}

#[test]
fn round_robin_cycles_the_relay_pool() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    let picks: Vec<String> = (0..6)
        .map(|i| {
            engine
                .prepare_send("u1", "c1", &message(&format!("m{}", i)))
                .unwrap()
                .relay
                .unwrap()
                .id
        })
        .collect();

    assert_eq!(
        picks,
        ["relay-a", "relay-b", "relay-c", "relay-a", "relay-b", "relay-c"]
    );
}

#[test]
fn disabled_rotations_leave_plan_fields_empty() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();
    engine.set_user_settings(
        "u1",
        RotationSettings {
            proxy_rotation_enabled: false,
            carrier_optimization_enabled: false,
            adaptive_optimization_enabled: false,
            ..Default::default()
        },
    )
    .unwrap();

    let plan = engine.prepare_send("u1", "c1", &message("m1")).unwrap();
    assert!(plan.proxy.is_none());
    assert!(plan.relay.is_some());
    assert!(plan.carrier_hint.is_none());
    assert!(plan.timezone_hint.is_none());
    assert!(plan.allowed_rate_per_minute.is_none());
}

#[test]
fn campaign_override_beats_user_settings() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();
    engine.set_user_settings(
        "u1",
        RotationSettings {
            strategy: RotationStrategy::Random,
            ..Default::default()
        },
    )
    .unwrap();
    engine.set_campaign_override(
        "c1",
        RotationSettings {
            strategy: RotationStrategy::LeastUsed,
            ..Default::default()
        },
    )
    .unwrap();

    let resolved = engine.resolve_settings("u1", "c1");
    assert_eq!(resolved.strategy, RotationStrategy::LeastUsed);
    // Other campaigns still see the user settings.
    let other = engine.resolve_settings("u1", "c2");
    assert_eq!(other.strategy, RotationStrategy::Random);
}

#[test]
fn all_servers_inactive_is_no_server_available() {
    let mut config = engine_config();
    for relay in &mut config.relays {
        relay.active = false;
    }
    let engine = DeliveryOrchestrator::from_config(&config).unwrap();

    let err = engine.prepare_send("u1", "c1", &message("m1")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::NoServerAvailable {
            kind: ServerKind::Relay
        }
    ));
}

#[test]
fn unhealthy_servers_leave_rotation_and_return() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();
    let registry = engine.registry();

    // Demote relay-a via three failed probes.
    for _ in 0..3 {
        registry
            .mark_health_check_result("relay-a", false, None, Some("timeout".into()))
            .unwrap();
    }

    for i in 0..4 {
        let plan = engine
            .prepare_send("u1", "c1", &message(&format!("m{}", i)))
            .unwrap();
        assert_ne!(plan.relay.unwrap().id, "relay-a");
    }

    // One good probe brings it back.
    registry
        .mark_health_check_result("relay-a", true, Some(15), None)
        .unwrap();
    let picks: Vec<String> = (0..3)
        .map(|i| {
            engine
                .prepare_send("u1", "c1", &message(&format!("n{}", i)))
                .unwrap()
                .relay
                .unwrap()
                .id
        })
        .collect();
    assert!(picks.contains(&"relay-a".to_string()));
}

#[test]
fn successful_outcome_updates_counters() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();
    let plan = engine.prepare_send("u1", "c1", &message("m1")).unwrap();

    let disposition = engine
        .record_outcome(&SendOutcome {
            user_id: "u1".to_string(),
            campaign_id: "c1".to_string(),
            message_id: "m1".to_string(),
            proxy_id: plan.proxy.map(|s| s.id),
            relay_id: plan.relay.clone().map(|s| s.id),
            carrier: plan.carrier_hint,
            success: true,
            response_time_ms: 150,
            error_message: None,
        })
        .unwrap();

    assert!(matches!(disposition, OutcomeDisposition::Delivered));

    let relay_id = plan.relay.unwrap().id;
    let server = engine.registry().get_server(&relay_id).unwrap();
    assert_eq!(server.total_requests, 1);
    assert_eq!(server.successful_requests, 1);

    let usage = engine.campaign_usage("c1");
    assert!(usage.iter().any(|s| s.server_id == relay_id));
}

#[test]
fn failed_outcome_schedules_retry_then_exhausts() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    let outcome = |attempt: u32| SendOutcome {
        user_id: "u1".to_string(),
        campaign_id: "c1".to_string(),
        message_id: "m1".to_string(),
        proxy_id: None,
        relay_id: Some("relay-a".to_string()),
        carrier: Some("Verizon".to_string()),
        success: false,
        response_time_ms: 500 + attempt,
        error_message: Some("535 authentication failed".to_string()),
    };

    match engine.record_outcome(&outcome(1)).unwrap() {
        OutcomeDisposition::RetryScheduled {
            attempt_number,
            error_type,
            ..
        } => {
            assert_eq!(attempt_number, 1);
            assert_eq!(error_type, ErrorType::Auth);
        }
        other => panic!("expected RetryScheduled, got {:?}", other),
    }
    match engine.record_outcome(&outcome(2)).unwrap() {
        OutcomeDisposition::RetryScheduled { attempt_number, .. } => assert_eq!(attempt_number, 2),
        other => panic!("expected RetryScheduled, got {:?}", other),
    }
    // Auth budget is two; the third failure gives up.
    match engine.record_outcome(&outcome(3)).unwrap() {
        OutcomeDisposition::PermanentlyFailed {
            error_type,
            attempts_made,
        } => {
            assert_eq!(error_type, ErrorType::Auth);
            assert_eq!(attempts_made, 2);
        }
        other => panic!("expected PermanentlyFailed, got {:?}", other),
    }

    // Failures updated the relay counters but never its health flag.
    let server = engine.registry().get_server("relay-a").unwrap();
    assert_eq!(server.failed_requests, 3);
    assert!(server.is_healthy);
}

#[test]
fn paused_campaign_refuses_plans_and_cancels_retries() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    // Schedule a retry ~2s out.
    engine
        .record_outcome(&SendOutcome {
            user_id: "u1".to_string(),
            campaign_id: "c1".to_string(),
            message_id: "m1".to_string(),
            proxy_id: None,
            relay_id: Some("relay-a".to_string()),
            carrier: None,
            success: false,
            response_time_ms: 100,
            error_message: Some("connection timeout".to_string()),
        })
        .unwrap();
    assert_eq!(engine.retry_stats("c1").pending_retries, 1);

    let cancelled = engine.pause_campaign("c1");
    assert_eq!(cancelled, 1);
    assert!(engine.is_paused("c1"));
    assert_eq!(engine.retry_stats("c1").pending_retries, 0);

    let err = engine.prepare_send("u1", "c1", &message("m2")).unwrap_err();
    assert!(matches!(err, EngineError::CampaignPaused(_)));

    // Other campaigns are unaffected.
    engine.prepare_send("u1", "c2", &message("m3")).unwrap();

    engine.resume_campaign("c1");
    assert!(!engine.is_paused("c1"));
    engine.prepare_send("u1", "c1", &message("m4")).unwrap();
}

#[test]
fn late_failure_after_pause_is_cancelled_not_retried() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    // The send is already in flight when the campaign gets paused.
    let plan = engine.prepare_send("u1", "c1", &message("m1")).unwrap();
    engine.pause_campaign("c1");

    let disposition = engine
        .record_outcome(&SendOutcome {
            user_id: "u1".to_string(),
            campaign_id: "c1".to_string(),
            message_id: "m1".to_string(),
            proxy_id: plan.proxy.map(|s| s.id),
            relay_id: plan.relay.map(|s| s.id),
            carrier: None,
            success: false,
            response_time_ms: 100,
            error_message: Some("connection timeout".to_string()),
        })
        .unwrap();

    assert!(matches!(disposition, OutcomeDisposition::Cancelled));
    assert_eq!(engine.retry_stats("c1").pending_retries, 0);
}

#[test]
fn non_finite_user_settings_are_rejected() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();

    let err = engine
        .set_user_settings(
            "u1",
            RotationSettings {
                delay_min_seconds: f64::NAN,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    // The rejected settings never became active.
    engine.prepare_send("u1", "c1", &message("m1")).unwrap();
}

#[test]
fn rotation_stats_expose_cursors_and_pools() {
    let engine = DeliveryOrchestrator::from_config(&engine_config()).unwrap();
    for i in 0..4 {
        engine
            .prepare_send("u1", "c1", &message(&format!("m{}", i)))
            .unwrap();
    }

    let stats = engine.rotation_stats("u1");
    assert_eq!(stats.user_id, "u1");
    assert_eq!(stats.proxy_cursor, 4);
    assert_eq!(stats.relay_cursor, 4);
    assert_eq!(stats.proxies.len(), 2);
    assert_eq!(stats.relays.len(), 3);

    // A user who never sent has zeroed cursors.
    let fresh = engine.rotation_stats("u2");
    assert_eq!(fresh.proxy_cursor, 0);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = engine_config();
    config.rotation.delay_min_seconds = -1.0;

    let err = DeliveryOrchestrator::from_config(&config).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}
