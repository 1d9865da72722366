//! Cloud provider capability: describe/start/stop for a single instance.
//!
//! The core logic only sees the [`CloudProvider`] trait, so tests run
//! against an in-memory fake. The real implementation drives the `aws`
//! CLI and parses its JSON output.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::runner;

// ============================================================================
// Instance model
// ============================================================================

/// The two stable instance states, plus everything in between.
///
/// `Other` carries the raw provider state name (pending, stopping,
/// terminated, ...) for display; the planner treats all of them as
/// "nothing to do".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Running,
    Stopped,
    Other(String),
}

impl InstanceState {
    pub fn parse(name: &str) -> Self {
        match name {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fresh observation of the instance. Never cached across the run.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub state: InstanceState,
    /// Present only while the instance is running.
    pub public_ip: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Provider failures, split so callers can tell a failed query (fatal,
/// we no longer know the instance state) from a failed command (the
/// transition is abandoned before polling starts).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no instance found with ID {0}")]
    NotFound(String),

    #[error("failed to query instance {id}: {message}")]
    Query { id: String, message: String },

    #[error("{action} request for {id} failed: {message}")]
    Command {
        action: &'static str,
        id: String,
        message: String,
    },

    #[error("unexpected response from provider: {0}")]
    Malformed(String),
}

// ============================================================================
// Capability trait
// ============================================================================

pub trait CloudProvider {
    /// Look up the current state and address of one instance.
    fn describe(&self, id: &str) -> Result<Instance, ProviderError>;

    /// Ask the provider to start the instance; returns the accepted
    /// transitional state (typically "pending").
    fn start(&self, id: &str) -> Result<InstanceState, ProviderError>;

    /// Ask the provider to stop the instance; returns the accepted
    /// transitional state (typically "stopping").
    fn stop(&self, id: &str) -> Result<InstanceState, ProviderError>;
}

// ============================================================================
// AWS CLI implementation
// ============================================================================

/// Drives `aws ec2` subcommands with `--output json`.
///
/// Shelling out to the CLI keeps the tool synchronous and picks up the
/// operator's existing credential chain and profile configuration.
pub struct AwsCliProvider {
    region: Option<String>,
}

impl AwsCliProvider {
    pub fn new(region: Option<String>) -> Self {
        Self { region }
    }

    fn invoke(&self, subcommand: &str, id: &str) -> Result<String, String> {
        let mut args = vec!["ec2", subcommand, "--instance-ids", id];
        if let Some(region) = &self.region {
            args.push("--region");
            args.push(region);
        }
        args.push("--output");
        args.push("json");

        runner::run_capture("aws", &args).map_err(|err| format!("{err:#}"))
    }
}

impl CloudProvider for AwsCliProvider {
    fn describe(&self, id: &str) -> Result<Instance, ProviderError> {
        let json = self
            .invoke("describe-instances", id)
            .map_err(|message| ProviderError::Query {
                id: id.to_string(),
                message,
            })?;
        parse_describe(&json, id)
    }

    fn start(&self, id: &str) -> Result<InstanceState, ProviderError> {
        let json = self
            .invoke("start-instances", id)
            .map_err(|message| ProviderError::Command {
                action: "start",
                id: id.to_string(),
                message,
            })?;
        parse_state_change(&json, "StartingInstances")
    }

    fn stop(&self, id: &str) -> Result<InstanceState, ProviderError> {
        let json = self
            .invoke("stop-instances", id)
            .map_err(|message| ProviderError::Command {
                action: "stop",
                id: id.to_string(),
                message,
            })?;
        parse_state_change(&json, "StoppingInstances")
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Deserialize)]
struct DescribeResponse {
    #[serde(rename = "Reservations", default)]
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
struct Reservation {
    #[serde(rename = "Instances", default)]
    instances: Vec<ApiInstance>,
}

#[derive(Deserialize)]
struct ApiInstance {
    #[serde(rename = "InstanceId")]
    instance_id: String,
    #[serde(rename = "State")]
    state: ApiState,
    #[serde(rename = "PublicIpAddress")]
    public_ip_address: Option<String>,
}

#[derive(Deserialize)]
struct ApiState {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct StateChange {
    #[serde(rename = "CurrentState")]
    current_state: ApiState,
}

fn parse_describe(json: &str, id: &str) -> Result<Instance, ProviderError> {
    let response: DescribeResponse =
        serde_json::from_str(json).map_err(|err| ProviderError::Malformed(err.to_string()))?;

    let instance = response
        .reservations
        .into_iter()
        .next()
        .and_then(|r| r.instances.into_iter().next())
        .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

    Ok(Instance {
        id: instance.instance_id,
        state: InstanceState::parse(&instance.state.name),
        public_ip: instance.public_ip_address,
    })
}

fn parse_state_change(json: &str, key: &str) -> Result<InstanceState, ProviderError> {
    let mut response: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|err| ProviderError::Malformed(err.to_string()))?;

    let changes: Vec<StateChange> = response
        .remove(key)
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| ProviderError::Malformed(err.to_string()))?
        .unwrap_or_default();

    let change = changes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed(format!("empty {key} in response")))?;

    Ok(InstanceState::parse(&change.current_state.name))
}

// ============================================================================
// Tests
// ============================================================================
