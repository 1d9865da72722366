//! Read-only status check: describe and print, no mutation.

use anyhow::Result;

use crate::Context;
use crate::config::Settings;
use crate::provider::{AwsCliProvider, CloudProvider, InstanceState};
use crate::ui;

pub fn run(_ctx: &Context) -> Result<()> {
    let settings = Settings::load()?;
    let provider = AwsCliProvider::new(settings.region.clone());

    let instance = provider.describe(&settings.instance_id)?;

    ui::kv("Instance ID", &instance.id);
    ui::kv("State", instance.state.name());
    if let Some(ip) = &instance.public_ip {
        ui::kv("Public IP", ip);
    }

    if instance.state == InstanceState::Running {
        ui::dim(&format!("connect with: ssh {}", settings.host));
    }

    Ok(())
}
