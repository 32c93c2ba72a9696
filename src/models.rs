use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Panel Accounts ---

/// User
///
/// A panel account. The password is kept alongside the record so the in-memory
/// repository can verify logins; it is never serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

// --- Inbounds ---

/// Protocol
///
/// The proxy protocol an inbound listens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
    #[serde(rename = "dokodemo-door")]
    DokodemoDoor,
    Socks,
    Http,
}

/// Inbound
///
/// A listening endpoint owned by one panel user. `settings`, `stream_settings`
/// and `sniffing` are opaque JSON documents handed to the proxy core.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub id: i64,
    pub user_id: Uuid,
    // Traffic counters in bytes.
    pub up: i64,
    pub down: i64,
    // Traffic quota in bytes, 0 means unlimited.
    pub total: i64,
    pub remark: String,
    pub enable: bool,
    // Unix milliseconds, 0 means never.
    pub expiry_time: i64,
    pub listen: String,
    pub port: u16,
    pub protocol: Protocol,
    pub settings: String,
    pub stream_settings: String,
    pub tag: String,
    pub sniffing: String,
}

impl Inbound {
    /// Builds a new inbound owned by `user_id` from submitted form data.
    /// The id is assigned by the repository.
    pub fn from_form(user_id: Uuid, form: InboundForm) -> Self {
        Inbound {
            id: 0,
            user_id,
            up: 0,
            down: 0,
            total: form.total,
            remark: form.remark,
            enable: form.enable,
            expiry_time: form.expiry_time,
            listen: form.listen,
            port: form.port,
            protocol: form.protocol,
            settings: form.settings,
            stream_settings: form.stream_settings,
            tag: Inbound::tag_for(form.port),
            sniffing: form.sniffing,
        }
    }

    /// Overwrites the user-editable fields, keeping id, owner and counters.
    pub fn apply(&mut self, form: InboundForm) {
        self.total = form.total;
        self.remark = form.remark;
        self.enable = form.enable;
        self.expiry_time = form.expiry_time;
        self.listen = form.listen;
        self.port = form.port;
        self.protocol = form.protocol;
        self.settings = form.settings;
        self.stream_settings = form.stream_settings;
        self.tag = Inbound::tag_for(form.port);
        self.sniffing = form.sniffing;
    }

    pub fn tag_for(port: u16) -> String {
        format!("inbound-{}", port)
    }
}

/// InboundForm
///
/// Form payload for `/xpanel/inbound/add` and `/xpanel/inbound/update/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct InboundForm {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub expiry_time: i64,
    #[serde(default)]
    pub listen: String,
    pub port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub settings: String,
    #[serde(default)]
    pub stream_settings: String,
    #[serde(default)]
    pub sniffing: String,
}

// --- Panel Settings ---

/// AllSetting
///
/// The complete panel configuration as edited on the settings page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllSetting {
    #[serde(default)]
    pub web_listen: String,
    pub web_port: u16,
    #[serde(default)]
    pub web_cert_file: String,
    #[serde(default)]
    pub web_key_file: String,
    #[serde(default)]
    pub web_base_path: String,
    pub time_location: String,
}

impl Default for AllSetting {
    fn default() -> Self {
        AllSetting {
            web_listen: String::new(),
            web_port: 54321,
            web_cert_file: String::new(),
            web_key_file: String::new(),
            web_base_path: "/".to_string(),
            time_location: "Asia/Shanghai".to_string(),
        }
    }
}

impl AllSetting {
    /// Validates the settings and normalizes the base path so that it both
    /// starts and ends with `/`.
    pub fn check_valid(&mut self) -> Result<(), String> {
        if !self.web_listen.is_empty() && self.web_listen.parse::<IpAddr>().is_err() {
            return Err(format!("web listen is not a valid ip: {}", self.web_listen));
        }

        if self.web_port == 0 {
            return Err("web port is not a valid port: 0".to_string());
        }

        if self.web_cert_file.is_empty() != self.web_key_file.is_empty() {
            return Err("cert file and key file must be set together".to_string());
        }

        if !self.web_base_path.starts_with('/') {
            self.web_base_path.insert(0, '/');
        }
        if !self.web_base_path.ends_with('/') {
            self.web_base_path.push('/');
        }

        if self.time_location.trim().is_empty() {
            return Err("time location must not be empty".to_string());
        }

        Ok(())
    }
}

// --- Request Payloads ---

/// LoginForm
///
/// Form payload for `POST /login`.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// UpdateUserForm
///
/// Form payload for `POST /xpanel/setting/updateUser`.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserForm {
    #[serde(default)]
    pub old_username: String,
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_username: String,
    #[serde(default)]
    pub new_password: String,
}

// --- Response Envelope ---

/// Msg
///
/// The envelope every JSON endpoint of the panel answers with. The browser
/// scripts only look at `success` and show `msg` to the user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Msg {
    pub success: bool,
    pub msg: String,
    #[schema(value_type = Option<Object>)]
    pub obj: Option<Value>,
}

impl Msg {
    pub fn ok(msg: impl Into<String>, obj: Option<Value>) -> Self {
        Msg {
            success: true,
            msg: msg.into(),
            obj,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Msg {
            success: false,
            msg: msg.into(),
            obj: None,
        }
    }

    /// Wraps a bare object, the way listing endpoints report results.
    pub fn obj<T: Serialize>(obj: &T) -> Self {
        match serde_json::to_value(obj) {
            Ok(value) => Msg::ok("", Some(value)),
            Err(err) => Msg::fail(err.to_string()),
        }
    }

    /// Reports the outcome of `action` as `<action>成功` or
    /// `<action>失败: <reason>`, attaching the successful value as `obj`.
    pub fn action<T: Serialize>(action: &str, result: Result<T, String>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(Value::Null) => Msg::ok(format!("{}成功", action), None),
                Ok(value) => Msg::ok(format!("{}成功", action), Some(value)),
                Err(err) => Msg::fail(format!("{}失败: {}", action, err)),
            },
            Err(reason) => Msg::fail(format!("{}失败: {}", action, reason)),
        }
    }
}
