mod common;
mod dynare_tests;
mod pipeline_tests;
