use crate::models::{AllSetting, Inbound, InboundForm, User};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// The data contract the panel's controllers rely on. Handlers only ever see
/// `Arc<dyn Repository>`, so tests can swap in a stub without touching the
/// route tree.
///
/// **Send + Sync + async_trait** are required so the trait object can cross
/// axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Returns the user only if both username and password match.
    async fn check_user(&self, username: &str, password: &str) -> Option<User>;
    async fn update_user(&self, id: Uuid, username: String, password: String) -> bool;

    // --- Inbounds ---
    // Ports are unique across all users. The port check and the write happen
    // under one lock; `Err` carries the reason shown to the user.
    async fn get_inbounds(&self, user_id: Uuid) -> Vec<Inbound>;
    // Assigns the id and returns the stored record.
    async fn add_inbound(&self, inbound: Inbound) -> Result<Inbound, String>;
    // Owner-Only: deletes only if `user_id` owns the inbound.
    async fn del_inbound(&self, id: i64, user_id: Uuid) -> bool;
    // Owner-Only: updates only if `user_id` owns the inbound. The inbound's
    // own port does not count as taken.
    async fn update_inbound(
        &self,
        id: i64,
        user_id: Uuid,
        form: InboundForm,
    ) -> Result<Inbound, String>;

    // --- Settings ---
    async fn get_settings(&self) -> AllSetting;
    async fn update_settings(&self, settings: AllSetting) -> AllSetting;
}

/// RepositoryState
///
/// The concrete type used to share the data layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

#[derive(Default)]
struct Store {
    users: Vec<User>,
    inbounds: Vec<Inbound>,
    next_inbound_id: i64,
    settings: AllSetting,
}

impl Store {
    fn port_taken(&self, port: u16, ignore_id: Option<i64>) -> bool {
        self.inbounds
            .iter()
            .any(|inbound| inbound.port == port && Some(inbound.id) != ignore_id)
    }
}

/// InMemoryRepository
///
/// Process-local implementation of `Repository`. Everything lives behind one
/// `RwLock`; data does not survive a restart.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding a single account, the way a fresh panel
    /// installation starts out.
    pub fn with_admin(username: &str, password: &str) -> Self {
        let store = Store {
            users: vec![User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password: password.to_string(),
            }],
            ..Store::default()
        };

        InMemoryRepository {
            store: RwLock::new(store),
        }
    }

    pub async fn insert_user(&self, user: User) -> User {
        self.store.write().await.users.push(user.clone());
        user
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        let store = self.store.read().await;
        store.users.iter().find(|user| user.id == id).cloned()
    }

    async fn check_user(&self, username: &str, password: &str) -> Option<User> {
        let store = self.store.read().await;
        store
            .users
            .iter()
            .find(|user| user.username == username && user.password == password)
            .cloned()
    }

    async fn update_user(&self, id: Uuid, username: String, password: String) -> bool {
        let mut store = self.store.write().await;
        match store.users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.username = username;
                user.password = password;
                true
            }
            None => false,
        }
    }

    async fn get_inbounds(&self, user_id: Uuid) -> Vec<Inbound> {
        let store = self.store.read().await;
        store
            .inbounds
            .iter()
            .filter(|inbound| inbound.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn add_inbound(&self, mut inbound: Inbound) -> Result<Inbound, String> {
        let mut store = self.store.write().await;
        if store.port_taken(inbound.port, None) {
            return Err(format!("端口已存在: {}", inbound.port));
        }

        store.next_inbound_id += 1;
        inbound.id = store.next_inbound_id;
        store.inbounds.push(inbound.clone());
        Ok(inbound)
    }

    async fn del_inbound(&self, id: i64, user_id: Uuid) -> bool {
        let mut store = self.store.write().await;
        let before = store.inbounds.len();
        store
            .inbounds
            .retain(|inbound| !(inbound.id == id && inbound.user_id == user_id));
        store.inbounds.len() != before
    }

    async fn update_inbound(
        &self,
        id: i64,
        user_id: Uuid,
        form: InboundForm,
    ) -> Result<Inbound, String> {
        let mut store = self.store.write().await;
        if store.port_taken(form.port, Some(id)) {
            return Err(format!("端口已存在: {}", form.port));
        }

        let inbound = store
            .inbounds
            .iter_mut()
            .find(|inbound| inbound.id == id && inbound.user_id == user_id)
            .ok_or_else(|| format!("入站不存在: {}", id))?;
        inbound.apply(form);
        Ok(inbound.clone())
    }

    async fn get_settings(&self) -> AllSetting {
        self.store.read().await.settings.clone()
    }

    async fn update_settings(&self, settings: AllSetting) -> AllSetting {
        let mut store = self.store.write().await;
        store.settings = settings.clone();
        settings
    }
}
