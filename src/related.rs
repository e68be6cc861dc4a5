use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use serde_json::json;

use crate::api;
use crate::args::BaseArgs;
use crate::config::{self, Settings};
use crate::http::ApiClient;
use crate::links::absolute_url;
use crate::location::{location_path, resolve_location, LocationContext};
use crate::model::{Event, Organization};
use crate::panel::{Panel, PanelState};
use crate::render::{render_json, render_text};
use crate::source::{load_event_file, DiscoverSource, FileSource};
use crate::ui::{print_command_status, print_with_pager, with_spinner, CommandStatus};

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Args)]
pub struct EventInputArgs {
    /// Event id to look up through the API
    #[arg(long, conflicts_with = "event_file")]
    event: Option<String>,

    /// Read the event from a JSON file instead of the API
    #[arg(long)]
    event_file: Option<PathBuf>,

    /// Enable an organization feature (repeatable, e.g. global-views)
    #[arg(long = "feature", value_name = "NAME")]
    features: Vec<String>,

    /// Path or URL the listing is viewed from (decides where rows link to)
    #[arg(long)]
    location: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    input: EventInputArgs,

    /// Read result rows from a JSON file instead of the events API
    #[arg(long)]
    rows_file: Option<PathBuf>,

    /// Maximum number of rows to fetch
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Open the Discover results view in a browser
    #[arg(long)]
    web: bool,

    /// Do not offer the Open in Discover action
    #[arg(long)]
    hide_action: bool,

    /// Print each events API request before it is sent
    #[arg(long)]
    print_queries: bool,
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    input: EventInputArgs,
}

struct Inputs {
    settings: Settings,
    client: Option<ApiClient>,
    event: Event,
    organization: Organization,
    context: LocationContext,
}

impl Inputs {
    fn client(&self, what: &str) -> Result<&ApiClient> {
        match &self.client {
            Some(client) => Ok(client),
            None => bail!("--auth-token required to fetch {what} (or set SENTRY_AUTH_TOKEN)"),
        }
    }
}

async fn resolve_inputs(base: &BaseArgs, input: &EventInputArgs) -> Result<Inputs> {
    let settings = Settings::resolve(base, &config::load()?);
    let org_slug = settings.require_org()?.to_string();
    let client = base
        .auth_token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
        .map(|token| ApiClient::new(&settings.api_url, token))
        .transpose()?;

    let event = match (&input.event_file, &input.event) {
        (Some(path), _) => load_event_file(path)?,
        (None, Some(event_id)) => {
            let Some(client) = &client else {
                bail!("--auth-token required to look up event {event_id} (or use --event-file)");
            };
            with_spinner("Loading event...", api::get_event(client, &org_slug, event_id))
                .await
                .with_context(|| format!("failed to look up event {event_id}"))?
        }
        (None, None) => bail!("--event or --event-file required"),
    };

    let mut organization = match &client {
        Some(client) => with_spinner(
            "Loading organization...",
            api::get_organization(client, &org_slug),
        )
        .await
        .with_context(|| format!("failed to load organization {org_slug}"))?,
        None => Organization::new(org_slug.as_str(), Vec::<String>::new()),
    };
    organization.slug = org_slug;
    organization.features.extend(input.features.iter().cloned());

    let location = input
        .location
        .clone()
        .or_else(|| settings.location.clone())
        .map(|raw| location_path(&raw))
        .unwrap_or_default();
    let context = resolve_location(&location);

    Ok(Inputs {
        settings,
        client,
        event,
        organization,
        context,
    })
}

pub async fn run_list(base: BaseArgs, args: ListArgs) -> Result<()> {
    if args.limit == 0 {
        bail!("--limit must be greater than 0");
    }

    let inputs = resolve_inputs(&base, &args.input).await?;
    let mut panel = Panel::for_event(&inputs.event, &inputs.organization, inputs.context);
    if args.hide_action {
        panel = panel.hide_action();
    }

    let state = match &args.rows_file {
        Some(path) => panel.load(&FileSource::new(path), args.limit).await?,
        None if panel.query().is_none() => PanelState::Loading.settle(Vec::new()),
        None => {
            let source = DiscoverSource::new(inputs.client("related events")?, args.print_queries);
            with_spinner("Loading related events...", panel.load(&source, args.limit)).await?
        }
    };

    if args.web {
        open_discover(&panel, &inputs.settings.app_url)?;
        return Ok(());
    }

    if base.json {
        let payload = render_json(&panel, &state, &inputs.settings.app_url);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let output = render_text(&panel, &state, &inputs.settings.app_url, Utc::now())?;
        print_with_pager(&output)?;
    }
    Ok(())
}

fn open_discover(panel: &Panel, app_url: &str) -> Result<()> {
    let route = match panel.discover_action() {
        Ok(route) => route,
        Err(reason) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("Open in Discover is not available: {reason}"),
            );
            return Ok(());
        }
    };
    let url = absolute_url(app_url, &route);
    open::that(&url).with_context(|| format!("failed to open {url}"))?;
    print_command_status(CommandStatus::Success, &format!("Opened {url} in browser"));
    Ok(())
}

pub async fn run_query(base: BaseArgs, args: QueryArgs) -> Result<()> {
    let inputs = resolve_inputs(&base, &args.input).await?;
    let panel = Panel::for_event(&inputs.event, &inputs.organization, inputs.context);
    let org_slug = panel.org_slug();
    let app_url = &inputs.settings.app_url;

    let Some(query) = panel.query() else {
        let reason = match panel.query_error() {
            Some(err) => err.to_string(),
            None => format!("event {} has no trace id", inputs.event.id),
        };
        if base.json {
            let payload = json!({ "event_id": inputs.event.id, "query": null, "reason": reason });
            println!("{payload}");
        } else {
            print_command_status(
                CommandStatus::Warning,
                &format!("{reason}; nothing to query"),
            );
        }
        return Ok(());
    };

    let request = format!(
        "{}{}",
        inputs.settings.api_url,
        api::events_path(org_slug, query, DEFAULT_LIMIT)
    );
    let discover_action = panel
        .discover_action()
        .ok()
        .map(|route| absolute_url(app_url, &route));

    if base.json {
        let payload = json!({
            "event_id": inputs.event.id,
            "location": panel.context(),
            "query": query,
            "request": request,
            "discover_action": discover_action,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("name:     {}", query.name);
    println!("query:    {}", query.filter);
    println!("fields:   {}", query.fields.join(", "));
    println!("sort:     {}", query.sort);
    println!(
        "projects: {}",
        query
            .project_scope
            .ids()
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("range:    {}", query.range);
    println!("version:  {}", query.version);
    println!("request:  {request}");
    if let Some(url) = discover_action {
        println!("discover: {url}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn list_args_defaults() {
        let cli = TestCli::parse_from(["test", "--event-file", "event.json"]);
        assert_eq!(cli.args.limit, DEFAULT_LIMIT);
        assert!(!cli.args.web);
        assert_eq!(cli.args.input.event_file, Some(PathBuf::from("event.json")));
        assert!(cli.args.input.features.is_empty());
    }

    #[test]
    fn features_repeat() {
        let cli = TestCli::parse_from([
            "test",
            "--event",
            "e1",
            "--feature",
            "global-views",
            "--feature",
            "discover-basic",
        ]);
        assert_eq!(
            cli.args.input.features,
            vec!["global-views".to_string(), "discover-basic".to_string()]
        );
    }

    #[test]
    fn event_and_event_file_conflict() {
        let result = TestCli::try_parse_from(["test", "--event", "e1", "--event-file", "e.json"]);
        assert!(result.is_err());
    }
}
