//! Light command handlers.

use std::sync::Arc;

use dialoguer::Input;
use tabled::Tabled;

use lumen_core::{Controller, Light, LightKey};

use crate::cli::{GlobalOpts, LightTarget, LightsArgs, LightsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct LightRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Brightness")]
    brightness: i32,
}

impl LightRow {
    pub(crate) fn new(l: &Arc<Light>, color: bool) -> Self {
        Self {
            group: l.group_id.to_string(),
            light: l.light_id.to_string(),
            name: l.name.clone(),
            power: output::power_label(l.on, color),
            brightness: l.brightness,
        }
    }
}

fn detail(l: &Arc<Light>) -> String {
    [
        format!("Group:      {}", l.group_id),
        format!("Light:      {}", l.light_id),
        format!("Name:       {}", l.name),
        format!("Power:      {}", if l.on { "on" } else { "off" }),
        format!("Brightness: {}", l.brightness),
    ]
    .join("\n")
}

pub(crate) fn render_lights(lights: &[Arc<Light>], global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    output::render_list(
        &global.output,
        lights,
        |l| LightRow::new(l, color),
        |l| l.key().to_string(),
    )
}

/// Key for a typed target: the registry's own key when the light is
/// known, otherwise parsed from the arguments.
fn target_key(controller: &Controller, target: &LightTarget) -> LightKey {
    controller
        .find_light(&target.group, &target.light)
        .map_or_else(
            || LightKey::from_args(&target.group, &target.light),
            |l| l.key(),
        )
}

fn note(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: LightsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LightsCommand::List => {
            let snap = controller.lights_snapshot();
            output::print_output(&render_lights(&snap, global), global.quiet);
            Ok(())
        }

        LightsCommand::Get(target) => {
            let light = util::resolve_light(controller, &target)?;
            let out = output::render_single(&global.output, &light, detail, |l| {
                l.key().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LightsCommand::On(target) => {
            let key = target_key(controller, &target);
            controller.set_power(key.clone(), true).await?;
            note(global, &format!("Light {key} switched on"));
            Ok(())
        }

        LightsCommand::Off(target) => {
            let key = target_key(controller, &target);
            controller.set_power(key.clone(), false).await?;
            note(global, &format!("Light {key} switched off"));
            Ok(())
        }

        LightsCommand::Brightness { target, value } => {
            let key = target_key(controller, &target);
            controller.set_brightness(key.clone(), value).await?;
            note(global, &format!("Light {key} brightness set to {value}"));
            Ok(())
        }

        LightsCommand::Add { name } => {
            let name = match name {
                Some(name) => name,
                None => prompt_name()?,
            };
            if name.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "light name cannot be empty".into(),
                });
            }

            match controller.create_light(name.clone()).await? {
                Some(key) => {
                    note(global, &format!("Light '{name}' created as {key}"));
                    output::print_output(&key.to_string(), global.quiet);
                }
                None => note(global, &format!("Light '{name}' created")),
            }
            Ok(())
        }

        LightsCommand::Remove(target) => {
            let light = util::resolve_light(controller, &target)?;
            let key = light.key();
            let prompt = format!("Remove light {key} ('{}')?", light.name);
            if !util::confirm(&prompt, "lights remove", global.yes)? {
                return Ok(());
            }
            controller.delete_light(key.clone()).await?;
            note(global, &format!("Light {key} removed"));
            Ok(())
        }
    }
}

fn prompt_name() -> Result<String, CliError> {
    if !util::interactive() {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: "a name is required when not running interactively".into(),
        });
    }
    Input::<String>::new()
        .with_prompt("Light name")
        .interact_text()
        .map_err(util::prompt_err)
}
