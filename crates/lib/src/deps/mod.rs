//! Dependency resolution.
//!
//! Evaluates every declared dependency against the resolved options and the
//! host, producing the ordered list of dependencies the build needs:
//!
//! - A dependency whose condition is false is excluded outright and never probed.
//! - A recommended or optional dependency that is enabled by default but missing
//!   switches its option off (degraded mode) instead of failing. If the user
//!   asked for it explicitly, it is unsatisfied.
//! - Any other included dependency that is missing fails the resolution, naming
//!   every missing component.

pub mod graph;
pub mod probe;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formula::{DependencyDecl, DependencyKind, Formula, holds};
use crate::options::{ResolvedOptions, ValueOrigin};

pub use probe::{HostProbe, Probe};

/// A dependency that is part of this build and was found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
  pub name: String,
  pub kind: DependencyKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
  /// Where the probe found it.
  pub location: String,
}

/// Outcome of dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  /// Options after degraded-mode adjustments.
  pub options: ResolvedOptions,
  /// Included dependencies in build order.
  pub dependencies: Vec<ResolvedDependency>,
}

impl Resolution {
  pub fn degraded(&self) -> Vec<String> {
    self.options.degraded()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
  #[error("unsatisfied dependency: {}", .missing.join(", "))]
  Unsatisfied { missing: Vec<String> },

  #[error("dependency cycle involving '{0}'")]
  Cycle(String),
}

/// Resolves a formula's dependencies.
pub struct DependencyGraph<'a> {
  formula: &'a Formula,
}

impl<'a> DependencyGraph<'a> {
  pub fn new(formula: &'a Formula) -> Self {
    Self { formula }
  }

  /// Resolve dependencies for the given options.
  ///
  /// # Errors
  ///
  /// - [`DependencyError::Unsatisfied`] when an included dependency is missing
  /// - [`DependencyError::Cycle`] when `after` edges form a cycle
  pub fn resolve(&self, options: &ResolvedOptions, probe: &dyn Probe) -> Result<Resolution, DependencyError> {
    let mut options = options.clone();
    let mut located: HashMap<&str, Option<String>> = HashMap::new();

    // Degrading one option can switch off the condition of another, so repeat
    // until nothing changes. Options only ever go from on to off.
    loop {
      let mut changed = false;

      for dep in self.formula.dependencies.iter().filter(|d| d.kind.has_option()) {
        if !is_included(dep, &options) {
          continue;
        }
        let found = located
          .entry(dep.name.as_str())
          .or_insert_with(|| probe.locate(&dep.probe_spec()));
        if found.is_some() {
          continue;
        }

        // Explicit requests are judged in the final pass, once conditions have settled
        if options.origin(&dep.name) != Some(ValueOrigin::User) {
          warn!(dependency = %dep.name, "recommended dependency not found, building without it");
          options = options.degrade(&dep.name);
          changed = true;
        }
      }

      if !changed {
        break;
      }
    }

    let mut missing: Vec<String> = Vec::new();
    let mut included: Vec<&DependencyDecl> = Vec::new();
    for dep in &self.formula.dependencies {
      if !is_included(dep, &options) {
        debug!(dependency = %dep.name, "dependency excluded by its condition");
        continue;
      }
      let found = located
        .entry(dep.name.as_str())
        .or_insert_with(|| probe.locate(&dep.probe_spec()));
      if found.is_none() {
        push_unique(&mut missing, describe(dep, &options));
      }
      included.push(dep);
    }

    if !missing.is_empty() {
      return Err(DependencyError::Unsatisfied { missing });
    }

    let order = graph::order_dependencies(&included).map_err(DependencyError::Cycle)?;
    let dependencies = order
      .into_iter()
      .map(|i| {
        let dep = included[i];
        ResolvedDependency {
          name: dep.name.clone(),
          kind: dep.kind,
          variant: dep.active_variant(&options).map(str::to_string),
          location: located
            .get(dep.name.as_str())
            .cloned()
            .flatten()
            .unwrap_or_default(),
        }
      })
      .collect::<Vec<_>>();

    info!(count = dependencies.len(), "dependencies resolved");
    Ok(Resolution { options, dependencies })
  }
}

fn is_included(dep: &DependencyDecl, options: &ResolvedOptions) -> bool {
  (!dep.kind.has_option() || options.enabled(&dep.name)) && holds(dep.when.as_ref(), options)
}

fn describe(dep: &DependencyDecl, options: &ResolvedOptions) -> String {
  match dep.active_variant(options) {
    Some(variant) => format!("{} ({})", dep.name, variant),
    None => dep.name.clone(),
  }
}

fn push_unique(list: &mut Vec<String>, value: String) {
  if !list.contains(&value) {
    list.push(value);
  }
}
