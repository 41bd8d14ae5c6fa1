//! `points`: scan the store and print the registry.

use serde::Serialize;
use tabled::Tabled;

use opensesame_core::{Point, Registry, load_registry};

use crate::cli::{GlobalOpts, PointsArgs};
use crate::error::CliError;
use crate::output;

/// One registry entry as printed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PointListing {
    web_id: String,
    external_id: String,
    name: String,
    #[serde(rename = "type")]
    value_type: Option<String>,
    role: Option<String>,
    watched: bool,
}

impl PointListing {
    fn new(point: &Point, registry: &Registry) -> Self {
        Self {
            web_id: point.web_id.to_string(),
            external_id: point.external_id.clone(),
            name: point.display_name(&point.meta),
            value_type: point.meta.value_type.clone(),
            role: point.meta.role.clone(),
            watched: registry.is_watched(&point.external_id),
        }
    }
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Web ID")]
    web_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Type")]
    value_type: String,
    #[tabled(rename = "Watched")]
    watched: &'static str,
}

fn to_row(p: &PointListing) -> PointRow {
    PointRow {
        web_id: p.web_id.clone(),
        name: p.name.clone(),
        role: p.role.clone().unwrap_or_else(|| "-".into()),
        value_type: p.value_type.clone().unwrap_or_else(|| "-".into()),
        watched: if p.watched { "yes" } else { "" },
    }
}

pub async fn handle(args: &PointsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load(global)?;
    let store = cfg.build_store()?;
    let registry = load_registry(&cfg.bridge_config(), &store).await?;

    let listings: Vec<PointListing> = if args.all {
        registry
            .catalog()
            .map(|p| PointListing::new(p, &registry))
            .collect()
    } else {
        registry
            .watched()
            .map(|p| PointListing::new(p, &registry))
            .collect()
    };
    tracing::debug!(count = listings.len(), all = args.all, "listing points");

    let rendered = output::render_list(global.output, &listings, to_row, |p| p.web_id.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
