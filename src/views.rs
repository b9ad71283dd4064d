use handlebars::Handlebars;
use serde_json::json;

use crate::error::Error;
use crate::types::Profile;

const HOME_TEMPLATE: &str = include_str!("../templates/home.hbs");
const USER_TEMPLATE: &str = include_str!("../templates/user.hbs");

/// HTML views, compiled once at startup.
///
/// Templates are embedded in the binary; values are HTML-escaped by Handlebars.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    /// Compile the embedded templates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if a template does not parse.
    pub fn new() -> Result<Self, Error> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_template_string("home", HOME_TEMPLATE)
            .map_err(|e| Error::Template(e.to_string()))?;
        registry
            .register_template_string("user", USER_TEMPLATE)
            .map_err(|e| Error::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    /// Landing page with the sign-in link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if rendering fails.
    pub fn render_home(&self) -> Result<String, Error> {
        self.registry
            .render("home", &json!({}))
            .map_err(|e| Error::Template(e.to_string()))
    }

    /// Profile page for a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if rendering fails.
    pub fn render_user(&self, profile: &Profile) -> Result<String, Error> {
        let claims = serde_json::to_string_pretty(profile)
            .map_err(|e| Error::Template(e.to_string()))?;
        let data = json!({
            "profile": profile,
            "display_name": profile.display_name(),
            "claims": claims,
        });
        self.registry
            .render("user", &data)
            .map_err(|e| Error::Template(e.to_string()))
    }
}
