use serde_json::json;
use uuid::Uuid;
use xpanel::models::{AllSetting, Inbound, InboundForm, Msg, Protocol, User};

// --- AllSetting Validation ---

fn valid_settings() -> AllSetting {
    AllSetting::default()
}

#[test]
fn test_default_settings_are_valid() {
    let mut settings = valid_settings();
    assert_eq!(settings.check_valid(), Ok(()));
    assert_eq!(settings, AllSetting::default());
}

#[test]
fn test_base_path_is_normalized() {
    let mut settings = AllSetting {
        web_base_path: "panel".to_string(),
        ..valid_settings()
    };
    settings.check_valid().unwrap();
    assert_eq!(settings.web_base_path, "/panel/");

    let mut settings = AllSetting {
        web_base_path: "/panel".to_string(),
        ..valid_settings()
    };
    settings.check_valid().unwrap();
    assert_eq!(settings.web_base_path, "/panel/");

    let mut settings = AllSetting {
        web_base_path: String::new(),
        ..valid_settings()
    };
    settings.check_valid().unwrap();
    assert_eq!(settings.web_base_path, "/");
}

#[test]
fn test_invalid_settings_are_rejected() {
    let cases = [
        AllSetting {
            web_listen: "localhost".to_string(),
            ..valid_settings()
        },
        AllSetting {
            web_port: 0,
            ..valid_settings()
        },
        AllSetting {
            web_cert_file: "/etc/xpanel/cert.pem".to_string(),
            ..valid_settings()
        },
        AllSetting {
            time_location: "  ".to_string(),
            ..valid_settings()
        },
    ];

    for mut settings in cases {
        assert!(settings.check_valid().is_err(), "{:?} was accepted", settings);
    }
}

#[test]
fn test_listen_accepts_ipv4_and_ipv6() {
    for listen in ["127.0.0.1", "::1", ""] {
        let mut settings = AllSetting {
            web_listen: listen.to_string(),
            ..valid_settings()
        };
        assert_eq!(settings.check_valid(), Ok(()), "{}", listen);
    }
}

// --- Msg Envelope ---

#[test]
fn test_msg_action_reports_outcome() {
    let ok = Msg::action("删除", Ok::<(), String>(()));
    assert_eq!(ok, Msg::ok("删除成功", None));

    let failed = Msg::action::<()>("删除", Err("入站不存在: 3".to_string()));
    assert!(!failed.success);
    assert_eq!(failed.msg, "删除失败: 入站不存在: 3");
    assert_eq!(failed.obj, None);

    let with_obj = Msg::action("添加", Ok::<_, String>(json!({ "id": 1 })));
    assert_eq!(with_obj.obj, Some(json!({ "id": 1 })));
}

#[test]
fn test_msg_serializes_to_panel_envelope() {
    let value = serde_json::to_value(Msg::fail("请输入密码")).unwrap();
    assert_eq!(
        value,
        json!({ "success": false, "msg": "请输入密码", "obj": null })
    );
}

// --- Serialization Shapes ---

#[test]
fn test_inbound_uses_camel_case_and_protocol_names() {
    let form = InboundForm {
        port: 443,
        protocol: Protocol::DokodemoDoor,
        expiry_time: 1700000000000,
        ..InboundForm::default()
    };
    let inbound = Inbound::from_form(Uuid::nil(), form);

    let value = serde_json::to_value(&inbound).unwrap();
    assert_eq!(value["protocol"], "dokodemo-door");
    assert_eq!(value["expiryTime"], 1700000000000i64);
    assert_eq!(value["tag"], "inbound-443");
    assert!(value.get("streamSettings").is_some());
    assert!(value.get("stream_settings").is_none());
}

#[test]
fn test_inbound_apply_keeps_identity_and_counters() {
    let mut inbound = Inbound {
        id: 7,
        user_id: Uuid::from_u128(9),
        up: 100,
        down: 200,
        ..Inbound::default()
    };

    inbound.apply(InboundForm {
        port: 8443,
        protocol: Protocol::Trojan,
        remark: "edited".to_string(),
        ..InboundForm::default()
    });

    assert_eq!(inbound.id, 7);
    assert_eq!(inbound.user_id, Uuid::from_u128(9));
    assert_eq!((inbound.up, inbound.down), (100, 200));
    assert_eq!(inbound.port, 8443);
    assert_eq!(inbound.tag, "inbound-8443");
    assert_eq!(inbound.remark, "edited");
}

#[test]
fn test_user_password_is_never_serialized() {
    let user = User {
        id: Uuid::nil(),
        username: "admin".to_string(),
        password: "secret".to_string(),
    };

    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["username"], "admin");
    assert!(value.get("password").is_none());
}
