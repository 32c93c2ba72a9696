use std::sync::Arc;

use axum::response::Html;
use tera::{Context, Tera};

use crate::error::RenderError;

/// Page
///
/// A page route's fixed template and display title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub template: &'static str,
    pub title: &'static str,
}

pub const LOGIN_PAGE: Page = Page {
    template: "login.html",
    title: "登录",
};

pub const STATUS_PAGE: Page = Page {
    template: "index.html",
    title: "系统状态",
};

pub const INBOUNDS_PAGE: Page = Page {
    template: "inbounds.html",
    title: "入站列表",
};

pub const SETTING_PAGE: Page = Page {
    template: "setting.html",
    title: "设置",
};

const BASE_PATH: &str = "/";

const EMBEDDED_TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../templates/html/base.html")),
    ("login.html", include_str!("../templates/html/login.html")),
    ("index.html", include_str!("../templates/html/index.html")),
    ("inbounds.html", include_str!("../templates/html/inbounds.html")),
    ("setting.html", include_str!("../templates/html/setting.html")),
];

/// Renderer
///
/// Maps a template name, a title and an optional data context to an HTML
/// body. Cheap to clone; the compiled templates are shared.
#[derive(Clone)]
pub struct Renderer {
    tera: Arc<Tera>,
}

impl Renderer {
    /// Templates compiled into the binary.
    pub fn embedded() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_TEMPLATES)?;

        Ok(Renderer {
            tera: Arc::new(tera),
        })
    }

    /// Templates loaded from `dir`, named relative to it.
    pub fn from_dir(dir: &str) -> Result<Self, tera::Error> {
        let tera = Tera::new(&format!("{}/**/*.html", dir.trim_end_matches('/')))?;

        Ok(Renderer {
            tera: Arc::new(tera),
        })
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    pub fn page(&self, page: Page) -> Result<Html<String>, RenderError> {
        self.html(page.template, page.title, None)
    }

    /// Renders `template` with `title`, the panel's common variables and,
    /// if given, `data` merged on top.
    pub fn html(
        &self,
        template: &str,
        title: &str,
        data: Option<&Context>,
    ) -> Result<Html<String>, RenderError> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("base_path", BASE_PATH);
        context.insert("cur_ver", env!("CARGO_PKG_VERSION"));

        if let Some(data) = data {
            context.extend(data.clone());
        }

        self.tera
            .render(template, &context)
            .map(Html)
            .map_err(|source| RenderError::Template {
                template: template.to_string(),
                source,
            })
    }
}
