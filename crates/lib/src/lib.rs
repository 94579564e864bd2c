//! kiln-lib: declarative package builds
//!
//! A formula describes how to configure, build, document, install and test one
//! package. This crate turns a formula plus user flags into an executed build:
//! - `options`: parse `--with-*`/`--without-*` flags into resolved values
//! - `deps`: resolve conditional dependencies against the host
//! - `plan`: compile an ordered, fully expanded build plan
//! - `execute`: run the plan step by step, staging outputs into the prefix
//! - `receipt`: record what was installed

pub mod consts;
pub mod deps;
pub mod execute;
pub mod formula;
pub mod install;
pub mod options;
pub mod placeholder;
pub mod plan;
pub mod platform;
pub mod receipt;
pub mod source;
pub mod stage;
pub mod util;
