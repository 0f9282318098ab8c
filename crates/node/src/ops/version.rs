use clap::Args;

use common::version::build_info;

#[derive(Args, Debug, Clone)]
pub struct Version {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("failed to encode build info: {0}")]
    Json(#[from] serde_json::Error),
}

impl Version {
    pub fn execute(&self) -> Result<String, VersionError> {
        let build = build_info();
        if self.json {
            return Ok(serde_json::to_string_pretty(&build)?);
        }
        Ok(build.to_string())
    }
}
