use std::env;

use anyhow::bail;
use app::App;
use cmd::Cmd;
use config::Config;
use export::Exporter;
use session::Session;

mod app;
mod background;
mod brush;
mod cmd;
mod config;
mod export;
mod input;
mod math;
mod raster;
mod session;
mod stroke;
mod surface;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let config = match &*env::args_os().skip(1).collect::<Vec<_>>() {
        [] => Config::default(),
        [path] => Config::load(path)?,
        _ => {
            bail!("usage: {} [config.toml]", env!("CARGO_PKG_NAME"));
        }
    };

    let event_loop = winit::event_loop::EventLoop::with_user_event().build()?;
    let proxy = event_loop.create_proxy();

    let output_dir = config.output_dir();
    log::info!("saving drawings to '{}'", output_dir.display());
    let exporter = Exporter::spawn(output_dir, move |outcome| {
        drop(proxy.send_event(Cmd::ExportFinished(outcome)))
    });

    let session = Session::new(&config, exporter);
    let mut app = App::new(&config, session);
    Ok(event_loop.run_app(&mut app)?)
}
