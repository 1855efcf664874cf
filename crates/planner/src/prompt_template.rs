// prompt_template.rs

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

use crate::errors::{AgentError, AgentResult};
use crate::plan::PLAN_ARTIFACT;

/// Instructions for the planning agent: role, plan sections and milestone checklist format
const PLANNING_TEMPLATE: &str = include_str!("prompts/planning.md");

#[derive(Serialize)]
struct PlanningContext<'a> {
    plan_artifact: &'a str,
}

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    // if the template_file doesn't exist, try to load it from the prompts directory
    let file_path = if !template_path.exists() {
        prompts_dir().join(template_path)
    } else {
        template_path
    };

    let template_content = fs::read_to_string(file_path)
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

/// The built-in planning instructions
pub fn planning_prompt() -> AgentResult<String> {
    load_prompt(PLANNING_TEMPLATE, &planning_context())
        .map_err(|e| AgentError::Template(e.to_string()))
}

/// Planning instructions read from a template file, rendered with the same variables
/// as the built-in prompt (`plan_artifact`)
pub fn planning_prompt_from_file(template_file: impl Into<PathBuf>) -> AgentResult<String> {
    load_prompt_file(template_file, &planning_context())
        .map_err(|e| AgentError::Template(e.to_string()))
}

fn planning_context() -> PlanningContext<'static> {
    PlanningContext {
        plan_artifact: PLAN_ARTIFACT,
    }
}
