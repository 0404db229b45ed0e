//! Template rendering
//!
//! Pages hand a template name, the course locale and the page context to a
//! `Renderer`. `TemplateRenderer` looks templates up under the configured
//! directory, preferring `<locale>/<name>` over `<name>`, and exposes the
//! unit and lesson title formatters to every template.

use minijinja::value::ViaDeserialize;
use minijinja::{path_loader, Environment, ErrorKind, State};
use std::path::PathBuf;

use crate::course::{
    display_lesson_title, display_short_unit_title, display_unit_title, Lesson, Unit,
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Rendering engine seam
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        template: &str,
        locale: &str,
        context: &serde_json::Value,
    ) -> Result<String, RenderError>;
}

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        let template_dir = template_dir.into();
        tracing::debug!(dir = %template_dir.display(), "template renderer ready");

        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir));
        register_formatters(&mut env);
        Self { env }
    }
}

impl Renderer for TemplateRenderer {
    fn render(
        &self,
        template: &str,
        locale: &str,
        context: &serde_json::Value,
    ) -> Result<String, RenderError> {
        let localized = format!("{locale}/{template}");
        let tmpl = match self.env.get_template(&localized) {
            Ok(tmpl) => tmpl,
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                match self.env.get_template(template) {
                    Ok(tmpl) => tmpl,
                    Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                        return Err(RenderError::NotFound(template.to_string()));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        Ok(tmpl.render(context)?)
    }
}

/// Whether the course being rendered hides unit indexes
fn titles_without_index(state: &State) -> bool {
    state
        .lookup("course_info")
        .and_then(|info| info.get_attr("course").ok())
        .and_then(|course| course.get_attr("display_unit_title_without_index").ok())
        .is_some_and(|flag| flag.is_true())
}

fn register_formatters(env: &mut Environment<'static>) {
    env.add_function(
        "display_unit_title",
        |state: &State, unit: ViaDeserialize<Unit>| {
            display_unit_title(&unit, titles_without_index(state))
        },
    );
    env.add_function(
        "display_short_unit_title",
        |state: &State, unit: ViaDeserialize<Unit>| {
            display_short_unit_title(&unit, titles_without_index(state))
        },
    );
    env.add_function(
        "display_lesson_title",
        |state: &State, unit: ViaDeserialize<Unit>, lesson: ViaDeserialize<Lesson>| {
            display_lesson_title(&unit, &lesson, titles_without_index(state))
        },
    );
}
