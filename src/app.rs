#![allow(non_snake_case)]

use dioxus::prelude::*;

use crate::theme::{SUN_ICON_CLASS, TOGGLE_ID};
use crate::viewport::SCROLL_CONTAINER_CLASS;

#[component]
pub fn App() -> Element {
    // the listeners need the rendered toggle, icon and container, so wait for mount
    use_effect(|| {
        if let Err(e) = crate::web::install() {
            tracing::error!("failed to install page chrome: {e:?}");
        }
    });

    rsx! {
        button { id: TOGGLE_ID, r#type: "button",
            span { class: SUN_ICON_CLASS }
        }
        div { class: SCROLL_CONTAINER_CLASS }
    }
}
