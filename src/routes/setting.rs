use crate::{
    AppState,
    error::RouteError,
    handlers,
    routes::{Controller, RouteGroup},
};

/// SettingController
///
/// JSON endpoints behind the settings page.
pub struct SettingController {
    prefix: String,
}

impl Controller<AppState> for SettingController {
    fn new(parent: &mut RouteGroup<AppState>) -> Result<Self, RouteError> {
        let mut group = parent.group("/setting")?;

        group
            .post("/all", handlers::get_all_settings)?
            .post("/update", handlers::update_settings)?
            .post("/updateUser", handlers::update_user)?;

        let prefix = group.prefix().to_string();
        parent.mount(group)?;

        Ok(SettingController { prefix })
    }
}

impl SettingController {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
