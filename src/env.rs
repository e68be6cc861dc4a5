use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const ENV_SELECTOR: &str = "RELATED_EVENTS_ENV";

/// Load `.env` files before clap parses, so `env = ...` args can see them.
pub fn bootstrap_from_args(args: &[OsString]) -> Result<()> {
    let explicit_env_file = extract_env_file_arg(args);
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let selector = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());
    let env_files = resolve_env_files(&cwd, explicit_env_file.as_ref(), &selector);

    for (key, value) in collect_env(&env_files, explicit_env_file.is_some())? {
        std::env::set_var(key, value);
    }
    Ok(())
}

/// Later files override earlier ones; variables already in the process win.
fn collect_env(env_files: &[PathBuf], explicit: bool) -> Result<Vec<(String, String)>> {
    let mut loaded = HashMap::new();

    for env_file in env_files {
        if !env_file.exists() && !explicit {
            continue;
        }

        let parsed = dotenvy::from_path_iter(env_file)
            .with_context(|| format!("failed to read env file {}", env_file.display()))?;
        for item in parsed {
            let (key, value) =
                item.with_context(|| format!("failed to parse env file {}", env_file.display()))?;
            if std::env::var_os(&key).is_some() {
                continue;
            }
            loaded.insert(key, value);
        }
    }

    let mut envs: Vec<(String, String)> = loaded.into_iter().collect();
    envs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(envs)
}

fn extract_env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut explicit = None;
    let mut iter = args.iter().skip(1).filter_map(|arg| arg.to_str());
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            explicit = iter.next().map(PathBuf::from);
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            explicit = Some(PathBuf::from(value));
        }
    }
    explicit
}

fn resolve_env_files(cwd: &Path, explicit_env_file: Option<&PathBuf>, selector: &str) -> Vec<PathBuf> {
    if let Some(path) = explicit_env_file {
        return vec![cwd.join(path)];
    }

    let mut files = vec![cwd.join(".env"), cwd.join(format!(".env.{selector}"))];
    if selector != "test" {
        files.push(cwd.join(".env.local"));
    }
    files.push(cwd.join(format!(".env.{selector}.local")));
    files
}
