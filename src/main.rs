#![allow(non_snake_case)]

use dioxus::prelude::*;
use tracing::Level;

mod app;
mod theme;
mod viewport;
mod web;

fn main() {
    console_error_panic_hook::set_once();

    dioxus_logger::init(Level::INFO).expect("logger failed to init");

    launch(app::App);
}
