use anyhow::Result;
use serde_json::{Map, Value};

use crate::args::BaseArgs;

use super::Config;

pub fn run(base: &BaseArgs, global: bool, local: bool, by_source: bool) -> Result<()> {
    let output = if by_source {
        format_verbose(&collect_sources(global, local), base.json)?
    } else {
        let config = if global {
            super::load_global()?
        } else if local {
            super::local_path()
                .map(|p| super::load_file(&p))
                .unwrap_or_default()
        } else {
            super::load()?
        };
        format_resolved(&config, base.json)?
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn collect_sources(global: bool, local: bool) -> Vec<(String, Config)> {
    let mut sources = Vec::new();
    if !local {
        if let Ok(path) = super::global_path() {
            sources.push((path.display().to_string(), super::load_file(&path)));
        }
    }
    if !global {
        if let Some(path) = super::local_path() {
            let display_path = std::env::current_dir()
                .ok()
                .and_then(|cwd| pathdiff::diff_paths(&path, &cwd))
                .unwrap_or_else(|| path.clone())
                .display()
                .to_string();
            sources.push((display_path, super::load_file(&path)));
        }
    }
    sources
}

fn fields_to_map(fields: &[(&str, &str)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

fn format_resolved(config: &Config, json: bool) -> Result<String> {
    let fields = config.non_empty_fields();
    if json {
        return Ok(serde_json::to_string(&fields_to_map(&fields))?);
    }
    Ok(fields
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn format_verbose(sources: &[(String, Config)], json: bool) -> Result<String> {
    let non_empty = sources
        .iter()
        .map(|(path, cfg)| (path, cfg.non_empty_fields()))
        .filter(|(_, fields)| !fields.is_empty());

    if json {
        let map: Map<String, Value> = non_empty
            .map(|(path, fields)| (path.clone(), Value::Object(fields_to_map(&fields))))
            .collect();
        return Ok(serde_json::to_string(&map)?);
    }

    Ok(non_empty
        .map(|(path, fields)| {
            let mut group = path.clone();
            for (key, value) in fields {
                group.push_str(&format!("\n  {key}: {value}"));
            }
            group
        })
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(org: &str, location: &str) -> Config {
        Config {
            org: Some(org.into()),
            location: Some(location.into()),
            ..Default::default()
        }
    }

    #[test]
    fn resolved_text_lists_set_keys_in_order() {
        let config = config_with("acme", "/organizations/acme/issues/");
        let out = format_resolved(&config, false).unwrap();
        assert_eq!(out, "org: acme\nlocation: /organizations/acme/issues/");
    }

    #[test]
    fn resolved_empty_config() {
        assert_eq!(format_resolved(&Config::default(), false).unwrap(), "");
        assert_eq!(format_resolved(&Config::default(), true).unwrap(), "{}");
    }

    #[test]
    fn resolved_json_flat_object() {
        let config = config_with("acme", "/organizations/acme/discover/");
        let parsed: Value =
            serde_json::from_str(&format_resolved(&config, true).unwrap()).unwrap();
        assert_eq!(parsed["org"], "acme");
        assert_eq!(parsed["location"], "/organizations/acme/discover/");
    }

    #[test]
    fn verbose_groups_by_source_and_skips_empty() {
        let sources = vec![
            (
                "~/.config/related-events/config.json".to_string(),
                Config {
                    org: Some("global-org".into()),
                    ..Default::default()
                },
            ),
            ("empty.json".to_string(), Config::default()),
            (
                ".related-events/config.json".to_string(),
                Config {
                    api_url: Some("https://sentry.example.com".into()),
                    ..Default::default()
                },
            ),
        ];
        let out = format_verbose(&sources, false).unwrap();
        assert_eq!(
            out,
            "~/.config/related-events/config.json\n  org: global-org\n\n.related-events/config.json\n  api_url: https://sentry.example.com"
        );

        let parsed: Value = serde_json::from_str(&format_verbose(&sources, true).unwrap()).unwrap();
        assert_eq!(parsed["~/.config/related-events/config.json"]["org"], "global-org");
        assert!(parsed.get("empty.json").is_none());
    }
}
