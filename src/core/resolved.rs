//! The frozen result of a resolution run.
//!
//! [`ResolvedConfigurationBuilder`] collects facts as the pipeline runs.
//! [`ResolvedConfigurationBuilder::freeze`] turns it into a
//! [`ResolvedConfiguration`], which has no mutating API and is what the
//! config emitter consumes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::candidate::{CandidateKind, ToolchainCandidate};
use crate::core::host::HostDescriptor;
use crate::core::version::ToolVersion;

/// Value of a capability fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Int(i64),
}

impl FactValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(b) => Some(*b),
            FactValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactValue::Int(i) => Some(*i),
            FactValue::Bool(_) => None,
        }
    }
}

/// A named probe outcome, e.g. `little_endian = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFact {
    pub name: String,
    pub value: FactValue,
}

impl CapabilityFact {
    pub fn flag(name: impl Into<String>, value: bool) -> Self {
        CapabilityFact {
            name: name.into(),
            value: FactValue::Bool(value),
        }
    }

    pub fn int(name: impl Into<String>, value: i64) -> Self {
        CapabilityFact {
            name: name.into(),
            value: FactValue::Int(value),
        }
    }
}

/// Host build tools that passed their version gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub cc_version: ToolVersion,
    /// Parser generator, when one was found.
    pub parser: Option<PathBuf>,
    pub parser_version: Option<ToolVersion>,
}

/// Everything the config emitter needs, frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    host: HostDescriptor,
    tools: Option<ToolInfo>,
    toolkit: ToolchainCandidate,
    toolkit_enabled: bool,
    jit: bool,
    facts: BTreeMap<String, FactValue>,
}

impl ResolvedConfiguration {
    pub fn host(&self) -> &HostDescriptor {
        &self.host
    }

    pub fn tools(&self) -> Option<&ToolInfo> {
        self.tools.as_ref()
    }

    pub fn toolkit(&self) -> &ToolchainCandidate {
        &self.toolkit
    }

    pub fn toolkit_kind(&self) -> CandidateKind {
        self.toolkit.kind
    }

    /// Whether the toolkit is available to the build.
    ///
    /// When this is false the dependent flags are in their disabled state:
    /// no JIT and no API version.
    pub fn toolkit_enabled(&self) -> bool {
        self.toolkit_enabled
    }

    pub fn jit_enabled(&self) -> bool {
        self.jit
    }

    pub fn toolkit_api_version(&self) -> Option<u32> {
        if self.toolkit_enabled {
            self.toolkit.api_version
        } else {
            None
        }
    }

    pub fn fact(&self, name: &str) -> Option<FactValue> {
        self.facts.get(name).copied()
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.fact(name).and_then(|v| v.as_bool())
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.fact(name).and_then(|v| v.as_int())
    }

    pub fn facts(&self) -> impl Iterator<Item = (&str, FactValue)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Render as pretty JSON for the config emitter.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize resolved configuration")
    }
}

/// Accumulates facts while the pipeline runs.
#[derive(Debug, Default)]
pub struct ResolvedConfigurationBuilder {
    host: Option<HostDescriptor>,
    tools: Option<ToolInfo>,
    toolkit: Option<ToolchainCandidate>,
    facts: BTreeMap<String, FactValue>,
}

impl ResolvedConfigurationBuilder {
    pub fn new() -> Self {
        ResolvedConfigurationBuilder::default()
    }

    pub fn host(&mut self, host: HostDescriptor) -> &mut Self {
        self.host = Some(host);
        self
    }

    pub fn tools(&mut self, tools: ToolInfo) -> &mut Self {
        self.tools = Some(tools);
        self
    }

    pub fn toolkit(&mut self, toolkit: ToolchainCandidate) -> &mut Self {
        self.toolkit = Some(toolkit);
        self
    }

    /// Record a fact; a later fact with the same name replaces the earlier one.
    pub fn record(&mut self, fact: CapabilityFact) -> &mut Self {
        self.facts.insert(fact.name, fact.value);
        self
    }

    pub fn record_all(&mut self, facts: impl IntoIterator<Item = CapabilityFact>) -> &mut Self {
        for fact in facts {
            self.record(fact);
        }
        self
    }

    /// Freeze into the immutable aggregate.
    ///
    /// A missing toolkit is recorded as the disabled marker.
    pub fn freeze(self) -> Result<ResolvedConfiguration> {
        let host = self
            .host
            .context("resolved configuration is missing the host descriptor")?;
        let toolkit = self.toolkit.unwrap_or_else(ToolchainCandidate::none);
        let toolkit_enabled = toolkit.is_enabled();

        Ok(ResolvedConfiguration {
            host,
            tools: self.tools,
            toolkit,
            toolkit_enabled,
            jit: toolkit_enabled,
            facts: self.facts,
        })
    }
}
