//! Desktop viewer.
//!
//! ```text
//! ar_viewer model.glb
//! ar_viewer https://example.com/models/helmet.glb
//! ar_viewer "http://localhost:5000/preview.html?model=<fileId>"
//! ```
//!
//! Viewer links are resolved against `ARVIEW_ASSET_BASE`
//! (default `http://localhost:5000/3d/`).

use arview::app::App;
use arview::assets::{AssetLocator, AssetResolver, AssetRoot, ViewerLink};
use arview::viewer::ModelSource;

const DEFAULT_ASSET_BASE: &str = "http://localhost:5000/3d/";

fn model_source(arg: &str) -> anyhow::Result<ModelSource> {
    if let Ok(id) = ViewerLink::parse(arg) {
        let base = std::env::var("ARVIEW_ASSET_BASE").unwrap_or_else(|_| DEFAULT_ASSET_BASE.into());
        let resolver = AssetResolver::new(AssetRoot::parse(&base)?);
        let locator = resolver.resolve(&id.to_string(), None)?;
        log::info!("Viewer link for {id} resolved to {locator}");
        return Ok(ModelSource::Locator(locator));
    }
    Ok(ModelSource::Locator(AssetLocator::parse(arg)?))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new().with_title("arview");
    match std::env::args().nth(1) {
        Some(arg) => app = app.with_model(model_source(&arg)?),
        None => log::warn!("No model given; starting with an empty scene"),
    }

    app.run()?;
    Ok(())
}
