//! The single-shot toggle flow: inspect, plan, confirm, transition,
//! poll, reconcile.
//!
//! `execute()` is the whole flow minus IO at the edges: the provider,
//! the confirmation decision, the sleep, and the ssh config text are
//! all injected, so the end-to-end scenarios run in-memory in tests.
//! `run()` wires in the real prompt, the real clock and the real files.

use anyhow::{Context as _, Result};
use std::fs;
use std::thread;
use std::time::Duration;

use crate::Context;
use crate::config::Settings;
use crate::poll::{self, PollOptions, PollOutcome};
use crate::provider::{AwsCliProvider, CloudProvider, InstanceState};
use crate::ssh_config;
use crate::transition;
use crate::ui;

/// Injected edges of the flow.
pub struct FlowHooks<'a> {
    pub confirm: &'a mut dyn FnMut(&InstanceState) -> Result<bool>,
    pub sleep: &'a mut dyn FnMut(Duration),
    pub poll: PollOptions,
}

/// What the flow did, and the reconciled ssh config text when the
/// final state warranted one.
pub enum FlowOutcome {
    /// Instance was mid-transition or gone; nothing to do.
    NoAction(InstanceState),
    /// Operator answered no.
    Declined,
    Done {
        poll: PollOutcome,
        ssh_config: Option<String>,
    },
}

pub fn run(ctx: &Context, yes: bool) -> Result<()> {
    let settings = Settings::load()?;
    let provider = AwsCliProvider::new(settings.region.clone());

    let ssh_config_path = settings.ssh_config_path()?;
    let existing = if ssh_config_path.exists() {
        fs::read_to_string(&ssh_config_path)
            .with_context(|| format!("Could not read {}", ssh_config_path.display()))?
    } else {
        String::new()
    };

    let mut confirm = |target: &InstanceState| {
        if yes {
            return Ok(true);
        }
        prompt_confirmation(target)
    };
    let mut sleep = thread::sleep;

    let outcome = execute(
        ctx,
        &provider,
        &settings,
        &existing,
        FlowHooks {
            confirm: &mut confirm,
            sleep: &mut sleep,
            poll: PollOptions::default(),
        },
    )?;

    match outcome {
        FlowOutcome::NoAction(_) | FlowOutcome::Declined => {}
        FlowOutcome::Done { poll, ssh_config } => {
            log::debug!("final observed state: {}", poll.instance().state);
            if let Some(new_text) = ssh_config {
                if let Some(parent) = ssh_config_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                // Whole-file replace, no locking: concurrent runs against
                // the same config file race (single-operator tool).
                fs::write(&ssh_config_path, new_text)
                    .with_context(|| format!("Could not write {}", ssh_config_path.display()))?;
                ui::success(&format!("Updated {}", ssh_config_path.display()));
                println!();
                println!("Run below command to connect vscode:");
                println!("code --remote ssh-remote+{}", settings.host);
            }
        }
    }

    Ok(())
}

/// The full flow against injected edges. Reconciliation happens only
/// when the final observed state is Running with a public address;
/// everything else is an intentional skip, not an error.
fn execute(
    ctx: &Context,
    provider: &dyn CloudProvider,
    settings: &Settings,
    ssh_config_text: &str,
    hooks: FlowHooks<'_>,
) -> Result<FlowOutcome> {
    let instance = provider.describe(&settings.instance_id)?;
    if !ctx.quiet {
        ui::kv("Instance ID", &instance.id);
        ui::kv("State", instance.state.name());
        if ctx.verbose > 0 {
            if let Some(ip) = &instance.public_ip {
                ui::kv("Public IP", ip);
            }
        }
    }

    let Some(planned) = transition::plan(&instance.state) else {
        if !ctx.quiet {
            ui::info(&format!(
                "Instance is \"{}\"; nothing to do",
                instance.state
            ));
        }
        return Ok(FlowOutcome::NoAction(instance.state));
    };

    if !(hooks.confirm)(&planned.to)? {
        return Ok(FlowOutcome::Declined);
    }

    if !ctx.quiet {
        println!("Changing the state to {}", planned.to);
    }
    let accepted = transition::apply(provider, &settings.instance_id, &planned)?;
    if !ctx.quiet {
        ui::success(&format!(
            "State change accepted (instance {} is now \"{accepted}\")",
            settings.instance_id
        ));
        println!("Waiting for {} state.", planned.to);
    }

    let outcome = poll::wait_for_state(
        provider,
        &settings.instance_id,
        &planned,
        &hooks.poll,
        hooks.sleep,
    )?;

    let observed = outcome.instance();
    if !ctx.quiet {
        ui::kv("Instance ID", &observed.id);
        ui::kv("State", observed.state.name());
    }
    if !outcome.converged() {
        ui::warn(&format!(
            "Instance did not reach \"{}\" in time; last observed state is \"{}\"",
            planned.to, observed.state
        ));
    }

    // Reachable only when running with an address
    let new_text = match (&observed.state, &observed.public_ip) {
        (InstanceState::Running, Some(ip)) => {
            Some(ssh_config::reconcile(ssh_config_text, &settings.host_block(ip)))
        }
        _ => {
            log::debug!("skipping ssh config reconciliation (instance not reachable)");
            None
        }
    };

    Ok(FlowOutcome::Done {
        poll: outcome,
        ssh_config: new_text,
    })
}

// ============================================================================
// Confirmation
// ============================================================================

/// Only an explicit no aborts; empty input or anything else proceeds.
fn answer_proceeds(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer != "n" && answer != "no"
}

fn prompt_confirmation(target: &InstanceState) -> Result<bool> {
    use dialoguer::Input;

    let answer: String = Input::new()
        .with_prompt(format!("Change the state to \"{target}\"? (Y/n)"))
        .allow_empty(true)
        .interact_text()
        .context("Failed to read confirmation")?;

    Ok(answer_proceeds(&answer))
}

// ============================================================================
// Tests
// ============================================================================
