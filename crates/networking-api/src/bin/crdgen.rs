//! Prints the networking.k8s.io/v1alpha1 CRDs
//!
//! Usage: `crdgen [OUTPUT_DIR]`
//!
//! Without an argument the CRDs are written to stdout as one YAML stream.
//! With a directory, each CRD is written to `<plural>.<group>.yaml` inside it.

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    let Some(dir) = std::env::args_os().nth(1).map(PathBuf::from) else {
        print!("{}", networking_api::crd::to_yaml()?);
        return Ok(());
    };

    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    for crd in networking_api::crd::all() {
        let name = crd.metadata.name.clone().context("generated CRD has no name")?;
        let path = dir.join(format!("{name}.yaml"));
        let yaml = serde_yaml::to_string(&crd)?;
        std::fs::write(&path, yaml).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}
