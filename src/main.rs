mod app;
mod context_menu;
mod embed_core;

use app::*;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(|| {
        view! { <App/> }
    })
}
