use crate::{
    AppState,
    error::RouteError,
    handlers,
    routes::{Controller, RouteGroup},
};

/// InboundController
///
/// JSON endpoints behind the inbound list page. Registered under whatever
/// scope it is given; the panel hands it the gated `/xpanel` group.
pub struct InboundController {
    prefix: String,
}

impl Controller<AppState> for InboundController {
    fn new(parent: &mut RouteGroup<AppState>) -> Result<Self, RouteError> {
        let mut group = parent.group("/inbound")?;

        group
            .post("/list", handlers::list_inbounds)?
            .post("/add", handlers::add_inbound)?
            .post("/del/{id}", handlers::del_inbound)?
            .post("/update/{id}", handlers::update_inbound)?;

        let prefix = group.prefix().to_string();
        parent.mount(group)?;

        Ok(InboundController { prefix })
    }
}

impl InboundController {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
