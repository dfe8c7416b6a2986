use antlers::err;
use antlers::error::Result;
use antlers::value::{Format, Json, Value};
use antlers::view::{View, ViewRendered};

use crate::site::SiteDir;

mod flags;
mod site;

pub const TEMPLATE_DIR: &str = "templates";
pub const ASSETS_DIR: &str = "assets";
pub const CONFIG_FILE: &str = "config.toml";

pub fn main() {
    let flags = flags::Quill::from_env_or_exit();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(flags) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(flags: flags::Quill) -> Result<String> {
    let site = SiteDir::open(&flags.site)?;
    if flags.list {
        let listing = site.assets()
            .filter_map(|asset| asset.id())
            .map(|id| format!("{id}\n"))
            .collect();

        return Ok(listing);
    }

    let mut view = View::make(flags.view);
    if let Some(layout) = flags.layout {
        view = view.layout(layout);
    }

    for pair in &flags.set {
        let Some((key, value)) = pair.split_once('=') else {
            return err!("variables are set as `key=value`", "found" => pair);
        };

        view = view.with_value(key.trim(), parse_value(value));
    }

    if let Some(id) = &flags.asset {
        view = view.cascade_content(site.asset(id)?);
    }

    let env = site.environment().with_observer(|event: &ViewRendered<'_>| {
        tracing::info!(
            template = event.view.template_name(),
            bytes = event.output.len(),
            "view rendered"
        );
    });

    view.render(&env)
}

fn parse_value(raw: &str) -> Value {
    Json::read::<Value>(raw).unwrap_or_else(|_| Value::from(raw))
}
