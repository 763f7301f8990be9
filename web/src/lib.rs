use bottlematch_core::HostEnvironment;
use clap::Parser;
use wasm_bindgen::prelude::*;

mod game;
mod host;
mod scorecard;
mod upload;
mod utils;
mod wallet;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(flatten)]
    game: game::GameProps,
}

#[wasm_bindgen(start)]
pub fn run_app() {
    use gloo::utils::{document, window};

    #[cfg(feature = "console_error_panic_hook")]
    {
        console_error_panic_hook::set_once();
    }

    let location_hash = window()
        .location()
        .hash()
        .unwrap_or_else(|_| "".to_string());

    let (mut args, parse_error) = match Args::try_parse_from(location_hash.split(['#', '&'])) {
        Ok(args) => (args, None),
        Err(err) => (Args::parse_from([""]), Some(err)),
    };
    if let Some(log_level) = args.verbose.log_level() {
        console_log::init_with_level(log_level).expect("Error initializing logger");
    }
    if let Some(err) = parse_error {
        log::warn!("ignoring invalid hash arguments: {}", err);
    }

    let host = args
        .game
        .host
        .unwrap_or_else(|| host::detect(&args.game.sdk_global));
    args.game.host = Some(host);
    log::debug!("host environment: {:?}", host);
    if host == HostEnvironment::EmbeddedHost {
        host::signal_ready(&args.game.sdk_global);
    }

    let root = document()
        .get_element_by_id("game")
        .expect("Could not find id=\"game\" element");

    log::debug!("App started");
    yew::Renderer::<game::GameView>::with_root_and_props(root, args.game).render();
}
