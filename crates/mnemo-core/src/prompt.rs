//! Prompt rendering with minijinja templates.

use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;

/// Renders a one-off template against `ctx`.
pub(crate) fn render<S: Serialize>(template: &str, ctx: S) -> Result<String> {
    let env = Environment::new();
    let tmpl = env.template_from_str(template)?;
    Ok(tmpl.render(ctx)?)
}
