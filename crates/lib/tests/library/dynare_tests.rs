//! Plans compiled from the shipped dynare formula.

use kiln_lib::deps::DependencyError;
use kiln_lib::install::{InstallError, Prepared, prepare};
use kiln_lib::plan::{BuildLayout, BuildPlan, BuildStep, Phase, PlanCompiler, StepAction};
use kiln_lib::util::hash::Hashable;

use super::common::{FakeProbe, dynare};

fn layout() -> BuildLayout {
  BuildLayout::new("/opt/cellar/dynare/4.4.2", "/tmp/dynare-4.4.2")
}

fn prepare_with(flags: &[&str], probe: &FakeProbe) -> Result<Prepared, InstallError> {
  prepare(&dynare(), flags, &layout(), probe)
}

fn plan(flags: &[&str]) -> BuildPlan {
  prepare_with(flags, &FakeProbe::everything()).unwrap().plan
}

fn configure_args(plan: &BuildPlan) -> &[String] {
  let (_, configure) = plan.steps_in(Phase::Configure).next().unwrap();
  match &configure.action {
    StepAction::Run(invocation) => &invocation.args,
    other => panic!("configure is not a run step: {:?}", other),
  }
}

fn step_names(plan: &BuildPlan, phase: Phase) -> Vec<&str> {
  plan.steps_in(phase).map(|(_, s)| s.name.as_str()).collect()
}

fn has_arg(plan: &BuildPlan, arg: &str) -> bool {
  configure_args(plan).iter().any(|a| a == arg)
}

fn dependency_names(plan: &BuildPlan) -> Vec<&str> {
  plan.dependencies.iter().map(|d| d.name.as_str()).collect()
}

mod defaults {
  use super::*;

  #[test]
  fn config_patch_is_verified_then_applied_first() {
    let plan = plan(&[]);
    let names: Vec<&str> = plan.steps.iter().take(3).map(|s| s.name.as_str()).collect();
    assert_eq!(
      names,
      vec![
        "verify patches/dynare-config-paths.patch",
        "patch patches/dynare-config-paths.patch",
        "configure"
      ]
    );

    match &plan.steps[1].action {
      StepAction::Run(invocation) => {
        let patch = std::path::Path::new(&invocation.args[2]);
        assert!(patch.is_file(), "patch {} should ship with the formula", patch.display());
        assert_eq!(invocation.cwd, layout().source_dir);
      }
      other => panic!("expected patch run, got {:?}", other),
    }
  }

  #[test]
  fn shipped_patch_matches_its_checksum() {
    let plan = plan(&[]);
    match &plan.steps[0].action {
      StepAction::Verify { file, sha256 } => {
        assert_eq!(&kiln_lib::util::hash::hash_file(file).unwrap().0, sha256);
      }
      other => panic!("expected verify step, got {:?}", other),
    }
  }

  #[test]
  fn configure_disables_matlab() {
    let plan = plan(&[]);
    assert!(has_arg(&plan, "--disable-matlab"));
    assert!(has_arg(&plan, "--prefix=/opt/cellar/dynare/4.4.2"));
    assert!(!has_arg(&plan, "--disable-octave"));
  }

  #[test]
  fn no_docs_steps() {
    assert!(step_names(&plan(&[]), Phase::Docs).is_empty());
  }

  #[test]
  fn octave_rule_active_matlab_rule_inactive() {
    let plan = plan(&[]);
    let installs = step_names(&plan, Phase::Install);
    assert!(installs.contains(&"install lib/dynare/mex/octave"));
    assert!(!installs.contains(&"install lib/dynare/mex/matlab"));
    assert!(!installs.contains(&"install doc/dynare"));
    assert_eq!(installs.first(), Some(&"install lib/dynare/matlab"));
  }

  #[test]
  fn octave_test_runs_in_sandbox() {
    let plan = plan(&[]);
    assert_eq!(step_names(&plan, Phase::Test), vec!["test: fixtures", "test: octave"]);

    let (_, run) = plan.steps_in(Phase::Test).last().unwrap();
    match &run.action {
      StepAction::Run(invocation) => {
        assert_eq!(invocation.program, "octave");
        assert_eq!(invocation.cwd, layout().test_dir);
        assert!(
          invocation
            .args
            .contains(&"/opt/cellar/dynare/4.4.2/share/dynare/matlab".to_string())
        );
      }
      other => panic!("expected run step, got {:?}", other),
    }
  }

  #[test]
  fn graphicsmagick_follows_octave() {
    let plan = plan(&[]);
    assert!(dependency_names(&plan).contains(&"graphicsmagick"));
    assert!(!dependency_names(&plan).contains(&"doxygen"));
  }
}

mod docs {
  use super::*;

  #[test]
  fn docs_between_build_and_staging() {
    let plan = plan(&["--with-doc"]);
    let phases: Vec<Phase> = plan.steps.iter().map(|s| s.phase).collect();

    let build = phases.iter().position(|p| *p == Phase::Build).unwrap();
    let first_docs = phases.iter().position(|p| *p == Phase::Docs).unwrap();
    let last_docs = phases.iter().rposition(|p| *p == Phase::Docs).unwrap();
    let first_install = phases.iter().position(|p| *p == Phase::Install).unwrap();

    assert!(build < first_docs);
    assert!(last_docs < first_install);
    assert_eq!(step_names(&plan, Phase::Docs), vec!["docs: edit doc/Makefile", "docs: make pdf"]);
  }

  #[test]
  fn makefile_edit_drops_output_flag() {
    let plan = plan(&["--with-doc"]);
    let (_, edit) = plan.steps_in(Phase::Docs).next().unwrap();
    match &edit.action {
      StepAction::Edit { file, find, replace } => {
        assert_eq!(file, &layout().source_dir.join("doc/Makefile"));
        assert!(find.contains("-o $@ "));
        assert!(!replace.contains("-o $@"));
      }
      other => panic!("expected edit step, got {:?}", other),
    }
  }

  #[test]
  fn doc_dependencies_and_rule() {
    let plan = plan(&["--with-doc"]);
    let deps = dependency_names(&plan);
    assert!(deps.contains(&"tex"));
    assert!(deps.contains(&"doxygen"));
    assert!(step_names(&plan, Phase::Install).contains(&"install doc/dynare"));
  }

  #[test]
  fn manuals_land_in_package_doc_dir() {
    let plan = plan(&["--with-doc"]);
    let rule = plan
      .steps_in(Phase::Install)
      .find_map(|(_, s)| match &s.action {
        StepAction::Stage(rule) if s.name == "install doc/dynare" => Some(rule),
        _ => None,
      })
      .unwrap();
    assert_eq!(rule.dest, layout().prefix.join("doc/dynare"));
    assert!(rule.patterns.iter().any(|p| p == "doc/dynare.pdf"));
  }
}

mod matlab {
  use super::*;

  const APP: &str = "--with-matlab=/Applications/MATLAB_R2014a.app";

  #[test]
  fn exactly_one_switch_arm() {
    for flags in [vec![], vec![APP], vec![APP, "--with-matlab-version=8.3"]] {
      let plan = plan(&flags);
      let enabled = has_arg(&plan, "--with-matlab=/Applications/MATLAB_R2014a.app");
      let disabled = has_arg(&plan, "--disable-matlab");
      assert!(enabled != disabled, "flags {:?} selected both or neither arm", flags);
    }
  }

  #[test]
  fn path_without_version_stays_disabled() {
    let plan = plan(&[APP]);
    assert!(has_arg(&plan, "--disable-matlab"));
    assert!(!step_names(&plan, Phase::Install).contains(&"install lib/dynare/mex/matlab"));
  }

  #[test]
  fn path_and_version_enable_matlab() {
    let plan = plan(&[APP, "--with-matlab-version=8.3"]);
    assert!(has_arg(&plan, "MATLAB_VERSION=8.3"));
    assert!(step_names(&plan, Phase::Install).contains(&"install lib/dynare/mex/matlab"));
    assert_eq!(step_names(&plan, Phase::Test), vec!["test: fixtures", "test: octave", "test: matlab"]);

    let (_, run) = plan.steps_in(Phase::Test).last().unwrap();
    match &run.action {
      StepAction::Run(invocation) => assert_eq!(invocation.program, "/Applications/MATLAB_R2014a.app/bin/matlab"),
      other => panic!("expected run step, got {:?}", other),
    }
  }

  #[test]
  fn slicot_needs_integer_8_variant() {
    let plain = plan(&[]);
    let slicot = plain.dependencies.iter().find(|d| d.name == "slicot").unwrap();
    assert_eq!(slicot.variant, None);

    let with_matlab = plan(&[APP]);
    let slicot = with_matlab.dependencies.iter().find(|d| d.name == "slicot").unwrap();
    assert_eq!(slicot.variant.as_deref(), Some("with-default-integer-8"));
  }

  #[test]
  fn slicot_ordered_after_fortran() {
    let plan = plan(&[]);
    let deps = dependency_names(&plan);
    let fortran = deps.iter().position(|d| *d == "fortran").unwrap();
    let slicot = deps.iter().position(|d| *d == "slicot").unwrap();
    assert!(fortran < slicot);
  }
}

mod octave {
  use super::*;

  #[test]
  fn without_octave_excludes_present_dependencies() {
    let plan = plan(&["--without-octave"]);
    assert!(has_arg(&plan, "--disable-octave"));
    assert!(!dependency_names(&plan).contains(&"octave"));
    assert!(!dependency_names(&plan).contains(&"graphicsmagick"));
  }

  #[test]
  fn no_runtime_means_no_tests() {
    let plan = plan(&["--without-octave"]);
    assert!(step_names(&plan, Phase::Test).is_empty());
  }

  #[test]
  fn missing_octave_degrades() {
    let prepared = prepare_with(&[], &FakeProbe::everything().without("octave")).unwrap();
    assert_eq!(prepared.resolution.degraded(), vec!["octave".to_string()]);
    assert!(has_arg(&prepared.plan, "--disable-octave"));
    assert!(!step_names(&prepared.plan, Phase::Install).contains(&"install lib/dynare/mex/octave"));
  }

  #[test]
  fn requested_octave_must_be_present() {
    let err = prepare_with(&["--with-octave"], &FakeProbe::everything().without("octave")).unwrap_err();
    assert!(matches!(
      &err,
      InstallError::Dependency(DependencyError::Unsatisfied { missing }) if missing == &vec!["octave".to_string()]
    ));
    assert_eq!(err.exit_code(), 2);
  }
}

mod checks {
  use super::*;

  #[test]
  fn without_check_skips_tests() {
    assert!(step_names(&plan(&["--without-check"]), Phase::Test).is_empty());
  }

  #[test]
  fn unknown_flag_is_invalid() {
    let err = prepare_with(&["--with-bogus"], &FakeProbe::everything()).unwrap_err();
    assert!(matches!(err, InstallError::Option(_)));
    assert_eq!(err.exit_code(), 1);
  }

  #[test]
  fn missing_required_dependencies_are_all_named() {
    let probe = FakeProbe::everything().without("gsl-config").without("fftw3");
    let err = prepare_with(&[], &probe).unwrap_err();
    assert_eq!(err.to_string(), "unsatisfied dependency: fftw, gsl");
  }

  #[test]
  fn compilation_is_deterministic() {
    let flags = ["--with-doc", "--with-matlab=/m", "--with-matlab-version=8.2"];
    let first = plan(&flags);
    let second = plan(&flags);
    assert_eq!(first, second);
    assert_eq!(first.compute_hash().unwrap(), second.compute_hash().unwrap());
  }

  #[test]
  fn every_step_is_named() {
    let plan = plan(&["--with-doc"]);
    assert!(plan.steps.iter().all(|s: &BuildStep| !s.name.is_empty()));
  }

  #[test]
  fn caveats_expand_share_dir() {
    let formula = dynare();
    let layout = layout();
    let options = formula.option_set().resolve::<&str>(&[]).unwrap();
    let text = PlanCompiler::new(&formula, &layout)
      .expand(formula.caveats.as_deref().unwrap(), &options)
      .unwrap();
    assert!(text.contains("addpath /opt/cellar/dynare/4.4.2/share/dynare/matlab"));
  }
}
