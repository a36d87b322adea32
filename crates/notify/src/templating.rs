//! Minijinja template rendering for notification messages.
//!
//! Renders message templates against rule and booking fields. Templates are
//! arbitrary strings loaded from config (not pre-registered files), so a
//! fresh [`minijinja::Environment`] is created per render call.

use std::collections::HashMap;

use crate::traits::NotifyError;

/// Context data available to notification templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext {
    /// The rule that fired.
    pub rule: RuleInfo,
    /// The booking being notified about.
    pub booking: BookingInfo,
    /// Free-form parameters from the `send-notification` action.
    pub params: HashMap<String, String>,
    /// Run wall-clock time, `YYYY-MM-DD HH:MM`.
    pub now: String,
}

/// Rule fields exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleInfo {
    pub name: String,
}

/// Booking fields exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingInfo {
    pub business_id: String,
    pub booking_id: String,
    pub name: String,
    pub phone: String,
    /// Local reservation time, `YYYY-MM-DD HH:MM`, empty when unknown.
    pub reserve_at: String,
    pub status: String,
    pub option_tags: Vec<String>,
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_function("env", env_function);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template, only checks syntax. The loader
    /// runs this over every configured template before any booking is
    /// processed.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

/// Global function: read an environment variable by name.
///
/// Returns the variable value, or an empty string if not found
/// (with a warning logged via tracing).
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> TemplateContext {
        TemplateContext {
            rule: RuleInfo {
                name: "confirm-sms".to_string(),
            },
            booking: BookingInfo {
                business_id: "S1".to_string(),
                booking_id: "42".to_string(),
                name: "Kim".to_string(),
                phone: "010-1111-2222".to_string(),
                reserve_at: "2026-08-25 18:30".to_string(),
                status: "confirmed".to_string(),
                option_tags: vec!["window seat".to_string(), "stroller".to_string()],
            },
            params: HashMap::from([("shop_name".to_string(), "Studio One".to_string())]),
            now: "2026-08-25 09:00".to_string(),
        }
    }

    #[test]
    fn render_basic_template() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let template = "{{ booking.name }}, your booking at {{ params.shop_name }} on {{ booking.reserve_at }} is confirmed.";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(
            result,
            "Kim, your booking at Studio One on 2026-08-25 18:30 is confirmed."
        );
    }

    #[test]
    fn render_option_tags_iteration() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let template = "Options: {% for t in booking.option_tags %}{{ t }}{% if not loop.last %}, {% endif %}{% endfor %}";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(result, "Options: window seat, stroller");
    }

    #[test]
    fn render_rule_and_now() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let result = renderer.render("[{{ now }}] {{ rule.name }}", &ctx).unwrap();
        assert_eq!(result, "[2026-08-25 09:00] confirm-sms");
    }

    #[test]
    fn render_env_function() {
        std::env::set_var("BOOKPING_TPL_TEST_VAR", "hello");
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render("Env: {{ env('BOOKPING_TPL_TEST_VAR') }}", &sample_context())
            .unwrap();
        assert_eq!(result, "Env: hello");
        std::env::remove_var("BOOKPING_TPL_TEST_VAR");
    }

    #[test]
    fn render_env_missing_returns_empty() {
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render("[{{ env('DEFINITELY_NOT_SET_XYZ') }}]", &sample_context())
            .unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    fn invalid_template_produces_error() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("{{ unclosed", &sample_context());
        match result.unwrap_err() {
            NotifyError::Template(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Template error, got: {:?}", other),
        }
    }

    #[test]
    fn validate_checks_syntax_only() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("Hello {{ booking.name }}").is_ok());
        assert!(renderer.validate("{{ unclosed").is_err());
    }
}
