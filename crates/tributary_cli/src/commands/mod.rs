pub mod check;
pub mod plan;
pub mod run;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::path::Path;
use tributary_plan::PipelineConfig;

/// Read a pipeline file, with the path in the error report
fn load_pipeline(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::from_path(path)
        .wrap_err_with(|| format!("Failed to read pipeline: {}", path.display()))
}
