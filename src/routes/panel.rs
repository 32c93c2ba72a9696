use crate::{
    AppState,
    auth::CheckLogin,
    error::RouteError,
    handlers,
    routes::{Controller, InboundController, RouteGroup, SettingController},
};

pub const PANEL_PREFIX: &str = "/xpanel";

/// PanelController
///
/// Owns the `/xpanel` scope. Every route below it, including the ones the
/// child controllers add, sits behind the `CheckLogin` gate:
///
/// - `GET /xpanel/`         status overview
/// - `GET /xpanel/inbounds` inbound list
/// - `GET /xpanel/setting`  settings
/// - `/xpanel/inbound/*`    `InboundController`
/// - `/xpanel/setting/*`    `SettingController`
pub struct PanelController {
    inbound: InboundController,
    setting: SettingController,
}

impl Controller<AppState> for PanelController {
    fn new(parent: &mut RouteGroup<AppState>) -> Result<Self, RouteError> {
        let mut group = parent.group(PANEL_PREFIX)?;
        group.use_gate(CheckLogin);

        group
            .get("/", handlers::index)?
            .get("/inbounds", handlers::inbounds)?
            .get("/setting", handlers::setting)?;

        // Children only ever see the gated group.
        let inbound = InboundController::new(&mut group)?;
        let setting = SettingController::new(&mut group)?;

        parent.mount(group)?;

        Ok(PanelController { inbound, setting })
    }
}

impl PanelController {
    pub fn inbound(&self) -> &InboundController {
        &self.inbound
    }

    pub fn setting(&self) -> &SettingController {
        &self.setting
    }
}
