use crate::{
    AppState,
    error::RouteError,
    handlers,
    routes::{Controller, RouteGroup},
};

/// IndexController
///
/// The unauthenticated entry points of the panel. Registered directly on the
/// root scope, so no gate applies:
///
/// - `GET /`        login page
/// - `POST /login`  credential check, sets the session cookie
/// - `GET /logout`  clears the session cookie
/// - `GET /health`  liveness probe
/// - `GET /assets/css/panel.css` page stylesheet
pub struct IndexController;

impl Controller<AppState> for IndexController {
    fn new(group: &mut RouteGroup<AppState>) -> Result<Self, RouteError> {
        group
            .get("/", handlers::login_page)?
            .post("/login", handlers::login)?
            .get("/logout", handlers::logout)?
            .get("/health", || async { "ok" })?
            .get("/assets/css/panel.css", handlers::panel_css)?;

        Ok(IndexController)
    }
}
