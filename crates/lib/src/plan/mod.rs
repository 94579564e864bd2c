//! Build plan compilation.
//!
//! Turns a formula plus resolved options and dependencies into a concrete,
//! ordered list of [`BuildStep`]s. Compilation is a pure function of its
//! inputs: the same options and dependencies always produce the same plan.
//!
//! Step order:
//! 1. patches (checksum check, then `patch`), in declaration order
//! 2. configure (base args, then one arm of every switch)
//! 3. primary build
//! 4. docs steps, when the docs option is on
//! 5. one staging step per active install rule, in declaration order
//! 6. test fixtures and one run per active test runtime

pub mod types;

use thiserror::Error;
use tracing::debug;

use crate::deps::ResolvedDependency;
use crate::formula::{DocStepDecl, Formula, RunDecl, StageMode, holds};
use crate::options::ResolvedOptions;
use crate::placeholder::{self, DirKind, PlaceholderError, Resolver};

pub use types::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  #[error("failed to expand {context}: {source}")]
  Placeholder {
    context: String,
    #[source]
    source: PlaceholderError,
  },
}

/// Resolves placeholders against a layout and option values.
struct PlanResolver<'a> {
  layout: &'a BuildLayout,
  options: &'a ResolvedOptions,
}

impl Resolver for PlanResolver<'_> {
  fn resolve_dir(&self, kind: DirKind) -> Result<String, PlaceholderError> {
    Ok(self.layout.dir(kind).display().to_string())
  }

  fn resolve_option(&self, name: &str) -> Result<String, PlaceholderError> {
    self
      .options
      .value(name)
      .ok_or_else(|| PlaceholderError::UnresolvedOption(name.to_string()))
  }
}

/// Compiles build plans for one formula and layout.
pub struct PlanCompiler<'a> {
  formula: &'a Formula,
  layout: &'a BuildLayout,
}

impl<'a> PlanCompiler<'a> {
  pub fn new(formula: &'a Formula, layout: &'a BuildLayout) -> Self {
    Self { formula, layout }
  }

  /// Expand placeholders in free text, such as caveats.
  pub fn expand(&self, text: &str, options: &ResolvedOptions) -> Result<String, PlanError> {
    let resolver = PlanResolver {
      layout: self.layout,
      options,
    };
    placeholder::substitute(text, &resolver).map_err(|source| PlanError::Placeholder {
      context: "text".to_string(),
      source,
    })
  }

  /// Compile the plan for the given options and resolved dependencies.
  pub fn compile(
    &self,
    options: &ResolvedOptions,
    dependencies: &[ResolvedDependency],
  ) -> Result<BuildPlan, PlanError> {
    let resolver = PlanResolver {
      layout: self.layout,
      options,
    };
    let mut steps = Vec::new();

    self.patch_steps(options, &mut steps);
    steps.push(self.configure_step(options, &resolver)?);
    steps.push(self.run_step(Phase::Build, "build".to_string(), &self.formula.build, &resolver)?);
    self.docs_steps(options, &resolver, &mut steps)?;
    self.install_steps(options, &mut steps);
    self.test_steps(options, &resolver, &mut steps)?;

    debug!(formula = %self.formula.name, steps = steps.len(), "compiled build plan");

    Ok(BuildPlan {
      formula: self.formula.name.clone(),
      version: self.formula.version.clone(),
      layout: self.layout.clone(),
      dependencies: dependencies.to_vec(),
      steps,
    })
  }

  fn patch_steps(&self, options: &ResolvedOptions, steps: &mut Vec<BuildStep>) {
    let base = self.formula.dir.as_ref().unwrap_or(&self.layout.source_dir);
    for patch in &self.formula.patches {
      if !holds(patch.when.as_ref(), options) {
        debug!(file = %patch.file, "patch inactive");
        continue;
      }
      let file = base.join(&patch.file);
      if let Some(sha256) = &patch.sha256 {
        steps.push(BuildStep {
          phase: Phase::Patch,
          name: format!("verify {}", patch.file),
          action: StepAction::Verify {
            file: file.clone(),
            sha256: sha256.clone(),
          },
        });
      }
      steps.push(BuildStep {
        phase: Phase::Patch,
        name: format!("patch {}", patch.file),
        action: StepAction::Run(Invocation {
          program: "patch".to_string(),
          args: vec![
            format!("-p{}", patch.strip),
            "-i".to_string(),
            file.display().to_string(),
          ],
          cwd: self.layout.source_dir.clone(),
          env: Default::default(),
        }),
      });
    }
  }

  fn configure_step(&self, options: &ResolvedOptions, resolver: &PlanResolver<'_>) -> Result<BuildStep, PlanError> {
    let configure = &self.formula.configure;
    let mut args = configure.args.clone();
    for switch in &configure.switches {
      if switch.when.evaluate(options) {
        args.extend(switch.enabled.iter().cloned());
      } else {
        args.extend(switch.disabled.iter().cloned());
      }
    }

    let run = RunDecl {
      program: configure.program.clone(),
      args,
      env: configure.env.clone(),
    };
    self.run_step(Phase::Configure, "configure".to_string(), &run, resolver)
  }

  fn docs_steps(
    &self,
    options: &ResolvedOptions,
    resolver: &PlanResolver<'_>,
    steps: &mut Vec<BuildStep>,
  ) -> Result<(), PlanError> {
    let Some(docs) = &self.formula.docs else {
      return Ok(());
    };
    if !options.enabled(&docs.option) {
      return Ok(());
    }

    for step in &docs.steps {
      match step {
        DocStepDecl::Run { program, args, env } => {
          let run = RunDecl {
            program: program.clone(),
            args: args.clone(),
            env: env.clone(),
          };
          let name = format!("docs: {}", std::iter::once(program).chain(args).cloned().collect::<Vec<_>>().join(" "));
          steps.push(self.run_step(Phase::Docs, name, &run, resolver)?);
        }
        DocStepDecl::Edit { file, find, replace } => steps.push(BuildStep {
          phase: Phase::Docs,
          name: format!("docs: edit {file}"),
          action: StepAction::Edit {
            file: self.layout.source_dir.join(file),
            find: find.clone(),
            replace: replace.clone(),
          },
        }),
      }
    }
    Ok(())
  }

  fn install_steps(&self, options: &ResolvedOptions, steps: &mut Vec<BuildStep>) {
    for rule in &self.formula.install {
      if !holds(rule.when.as_ref(), options) {
        debug!(dest = %rule.dest, "install rule inactive");
        continue;
      }
      steps.push(BuildStep {
        phase: Phase::Install,
        name: format!("install {}", rule.dest),
        action: StepAction::Stage(StagingRule {
          base: self.layout.source_dir.clone(),
          patterns: rule.sources.clone(),
          dest: self.layout.prefix.join(&rule.dest),
          mode: rule.mode,
        }),
      });
    }
  }

  fn test_steps(
    &self,
    options: &ResolvedOptions,
    resolver: &PlanResolver<'_>,
    steps: &mut Vec<BuildStep>,
  ) -> Result<(), PlanError> {
    let Some(test) = &self.formula.test else {
      return Ok(());
    };
    if !holds(test.when.as_ref(), options) {
      return Ok(());
    }

    let runs: Vec<_> = test.runs.iter().filter(|run| holds(run.when.as_ref(), options)).collect();
    if runs.is_empty() {
      debug!("no test runtime active, skipping tests");
      return Ok(());
    }

    if !test.fixtures.is_empty() {
      steps.push(BuildStep {
        phase: Phase::Test,
        name: "test: fixtures".to_string(),
        action: StepAction::Stage(StagingRule {
          base: self.layout.prefix.clone(),
          patterns: test.fixtures.clone(),
          dest: self.layout.test_dir.clone(),
          mode: StageMode::Copy,
        }),
      });
    }

    for run in runs {
      let decl = RunDecl {
        program: run.program.clone(),
        args: run.args.clone(),
        env: run.env.clone(),
      };
      let mut step = self.run_step(Phase::Test, format!("test: {}", run.name), &decl, resolver)?;
      if let StepAction::Run(invocation) = &mut step.action {
        invocation.cwd = self.layout.test_dir.clone();
      }
      steps.push(step);
    }
    Ok(())
  }

  fn run_step(
    &self,
    phase: Phase,
    name: String,
    run: &RunDecl,
    resolver: &PlanResolver<'_>,
  ) -> Result<BuildStep, PlanError> {
    let expand = |value: &str| {
      placeholder::substitute(value, resolver).map_err(|source| PlanError::Placeholder {
        context: name.clone(),
        source,
      })
    };

    let program = expand(&run.program)?;
    let args = run.args.iter().map(|arg| expand(arg)).collect::<Result<Vec<_>, _>>()?;
    let env = run
      .env
      .iter()
      .map(|(key, value)| Ok((key.clone(), expand(value)?)))
      .collect::<Result<_, PlanError>>()?;

    Ok(BuildStep {
      phase,
      name,
      action: StepAction::Run(Invocation {
        program,
        args,
        cwd: self.layout.source_dir.clone(),
        env,
      }),
    })
  }
}
