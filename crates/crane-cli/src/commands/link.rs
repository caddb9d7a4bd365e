use crane_core::link::{link_projects_and_save, ShrinkwrapFile, SHRINKWRAP_FILENAME};
use crane_core::RepoConfig;
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use tracing::{debug, info};

pub fn run(cwd: &Path, json: bool) -> Result<()> {
    let config = RepoConfig::load(cwd).into_diagnostic()?;
    debug!(
        projects = config.projects().len(),
        mode = ?config.install_mode,
        "loaded repo configuration"
    );

    let shrinkwrap_path = config.common_temp_folder().join(SHRINKWRAP_FILENAME);
    let lockfile = match ShrinkwrapFile::read_from(&shrinkwrap_path) {
        Ok(lockfile) => lockfile,
        Err(e) => {
            emit_failure(json, e.code(), e.message());
            std::process::exit(1);
        }
    };

    match link_projects_and_save(&config, &lockfile) {
        Ok(registry) => {
            if json {
                let output = serde_json::json!({
                    "status": "ok",
                    "projects": config.projects().len(),
                    "linkedProjects": registry.projects().count(),
                    "localLinks": registry.len(),
                });
                println!("{output}");
            } else {
                info!(
                    "Linked {} projects, {} of which have local dependencies",
                    config.projects().len(),
                    registry.projects().count()
                );
                for project in registry.projects() {
                    if let Some(links) = registry.links_for(project) {
                        println!("{project} -> {}", links.join(", "));
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            emit_failure(json, e.code(), e.message());
            std::process::exit(1);
        }
    }
}

fn emit_failure(json: bool, code: &str, message: &str) {
    if json {
        let output = serde_json::json!({
            "status": "error",
            "code": code,
            "message": message,
        });
        println!("{output}");
    } else {
        eprintln!("error[{code}]: {message}");
    }
}
