use super::{json_pretty, EXIT_SUCCESS};
use podbuild_core::{
    generate, load_config, load_podspec, reexport_aliases, scaffold, write_build_file,
    BuildOptions, UserOption,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Command-line inputs of `podbuild generate`.
#[derive(Debug, Default)]
pub struct GenerateRequest {
    pub podspec: PathBuf,
    pub path: Option<String>,
    pub user_options: Vec<String>,
    pub copts: Vec<String>,
    pub enable_modules: bool,
    pub stage_headers: bool,
    pub stdout: bool,
    pub reexport_to: Option<PathBuf>,
}

/// `podbuild.toml` from `config_dir` first, then the flags on top. List
/// values from the command line are appended after the file's.
pub fn build_options(request: &GenerateRequest, config_dir: &Path) -> Result<BuildOptions, String> {
    let mut options = match load_config(config_dir).map_err(|e| e.to_string())? {
        Some(config) => BuildOptions::from_config(&config).map_err(|e| e.to_string())?,
        None => BuildOptions::default(),
    };
    if let Some(path) = &request.path {
        options.path.clone_from(path);
    }
    for raw in &request.user_options {
        let option: UserOption = raw.parse().map_err(|e| format!("{e}"))?;
        options.user_options.push(option);
    }
    options.global_copts.extend(request.copts.iter().cloned());
    options.enable_modules |= request.enable_modules;
    options.stage_headers |= request.stage_headers;
    Ok(options)
}

pub fn run(request: &GenerateRequest, json: bool) -> Result<u8, String> {
    let cwd = std::env::current_dir().map_err(|e| format!("failed to read working directory: {e}"))?;
    let options = build_options(request, &cwd)?;
    debug!("build options: {options:?}");

    let spec = load_podspec(&request.podspec).map_err(|e| e.to_string())?;
    let build = generate(&spec, &options).map_err(|e| e.to_string())?;
    let targets: Vec<&str> = build.targets.iter().map(|t| t.name().as_str()).collect();

    if request.stdout {
        if json {
            let payload = serde_json::json!({
                "pod": build.pod_name,
                "version": build.pod_version,
                "targets": targets,
                "content": build.render(),
            });
            println!("{}", json_pretty(&payload)?);
        } else {
            print!("{}", build.render());
        }
        return Ok(EXIT_SUCCESS);
    }

    let pod_dir = match request.podspec.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    // BUILD.bazel references pod_support/, so it is only written once that exists.
    let report = scaffold(&pod_dir, &build).map_err(|e| e.to_string())?;
    let written = write_build_file(&pod_dir, &build).map_err(|e| e.to_string())?;

    let reexported = match &request.reexport_to {
        Some(dir) => {
            let aliases = reexport_aliases(&build, &options.path);
            Some(write_build_file(dir, &aliases).map_err(|e| e.to_string())?)
        }
        None => None,
    };

    if json {
        let payload = serde_json::json!({
            "pod": build.pod_name,
            "version": build.pod_version,
            "build_file": written,
            "targets": targets,
            "linked_headers": report.linked_headers,
            "prefix_headers": report.prefix_headers,
            "reexport": reexported,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "wrote {} ({} targets)",
            written.display(),
            build.targets.len()
        );
        if report.linked_headers > 0 {
            println!("staged {} public headers", report.linked_headers);
        }
        for pch in &report.prefix_headers {
            println!("wrote {}", pch.display());
        }
        if let Some(path) = reexported {
            println!("wrote {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
