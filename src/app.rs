use leptos::task::spawn_local;

use leptos::prelude::*;
use pulldown_cmark::{Options, Parser};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::MouseEvent;

use crate::context_menu;
use crate::embed_core::{self, PendingImageClick, VaultFile};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["window", "__TAURI__", "core"])]
    async fn invoke(cmd: &str, args: JsValue) -> JsValue;
}

#[derive(Serialize)]
struct ReadFileArgs<'a> { path: &'a str }
#[derive(Serialize)]
struct WriteFileArgs<'a> { path: &'a str, content: &'a str }
#[derive(Serialize)]
struct VaultPathArgs<'a> { vault_path: &'a str }

#[derive(Serialize, Deserialize, Clone, Debug)]
struct AppSettings {
    font_size: u32,
    accent_color: String,
    notice_timeout_ms: u32,
}
impl Default for AppSettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            accent_color: "#6366f1".to_string(),
            notice_timeout_ms: 2500,
        }
    }
}

fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(text, options);
    let mut html = String::with_capacity(text.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

#[derive(Clone)]
struct MenuEntry {
    icon: &'static str,
    title: &'static str,
    action: Callback<()>,
}

#[derive(Clone)]
struct MenuState {
    x: i32,
    y: i32,
    entries: Vec<MenuEntry>,
}

#[component]
pub fn App() -> impl IntoView {
    let (vault_path, set_vault_path) = signal(String::new());
    let (files, set_files) = signal(Vec::<VaultFile>::new());
    let (current_file, set_current_file) = signal(String::new());
    let (content, set_content) = signal(String::new());
    let (reading_mode, set_reading_mode) = signal(false);
    let (menu, set_menu) = signal(Option::<MenuState>::None);
    let (notice, set_notice) = signal(Option::<String>::None);
    let (settings, set_settings) = signal(AppSettings::default());

    // The one piece of state the extension owns: the most recent right-click
    // that landed on an image. Overwritten on every right-click.
    let (pending, set_pending) = signal(Option::<PendingImageClick>::None);

    Effect::new(move |_| {
        spawn_local(async move {
            let path_val = invoke("init_vault", JsValue::NULL).await;
            if let Some(path_str) = path_val.as_string() {
                set_vault_path.set(path_str.clone());
                let args =
                    serde_wasm_bindgen::to_value(&VaultPathArgs { vault_path: &path_str }).unwrap();
                let list_val = invoke("list_vault_files", args.clone()).await;
                if let Ok(paths) = serde_wasm_bindgen::from_value::<Vec<String>>(list_val) {
                    set_files.set(paths.into_iter().map(VaultFile::new).collect());
                }
                let s_val = invoke("load_settings", args).await;
                if let Some(s_str) = s_val.as_string() {
                    if let Ok(s) = serde_json::from_str::<AppSettings>(&s_str) {
                        set_settings.set(s);
                    }
                }
            }
        });
    });

    let refresh_files = move || {
        let v_path = vault_path.get_untracked();
        if v_path.is_empty() {
            return;
        }
        spawn_local(async move {
            let args =
                serde_wasm_bindgen::to_value(&VaultPathArgs { vault_path: &v_path }).unwrap();
            let list_val = invoke("list_vault_files", args).await;
            if let Ok(paths) = serde_wasm_bindgen::from_value::<Vec<String>>(list_val) {
                set_files.set(paths.into_iter().map(VaultFile::new).collect());
            }
        });
    };

    let select_file = move |rel_path: String| {
        spawn_local(async move {
            let file_path = format!("{}/{}", vault_path.get_untracked(), rel_path);
            let args = serde_wasm_bindgen::to_value(&ReadFileArgs { path: &file_path }).unwrap();
            let text_val = invoke("read_file", args).await;
            if let Some(text) = text_val.as_string() {
                set_content.set(text);
                set_current_file.set(rel_path);
            }
        });
    };

    let update_content = move |ev| {
        let new_text = event_target_value(&ev);
        set_content.set(new_text.clone());

        let filename = current_file.get_untracked();
        if !filename.is_empty() {
            let file_path = format!("{}/{}", vault_path.get_untracked(), filename);
            spawn_local(async move {
                let args = serde_wasm_bindgen::to_value(&WriteFileArgs {
                    path: &file_path,
                    content: &new_text,
                })
                .unwrap();
                invoke("write_file", args).await;
            });
        }
    };

    let create_new_note = move || {
        let v_path = vault_path.get_untracked();
        if v_path.is_empty() {
            return;
        }
        if let Ok(Some(raw)) = window().prompt_with_message("New note name") {
            let name = raw.trim();
            if name.is_empty() {
                return;
            }
            let mut filename = name.to_string();
            if !filename.ends_with(".md") {
                filename.push_str(".md");
            }
            let file_path = format!("{v_path}/{filename}");
            let filename_clone = filename.clone();
            spawn_local(async move {
                let initial = "# New Note\n\n".to_string();
                let args = serde_wasm_bindgen::to_value(&WriteFileArgs {
                    path: &file_path,
                    content: &initial,
                })
                .unwrap();
                invoke("write_file", args).await;
                set_current_file.set(filename_clone);
                set_content.set(initial);
                refresh_files();
            });
        }
    };

    let show_notice = move |message: String| {
        set_notice.set(Some(message));
        let timeout = settings.get_untracked().notice_timeout_ms as i32;
        context_menu::defer_ms(move || set_notice.set(None), timeout);
    };

    // Consumes a captured click: generate the snippet, write it to the
    // clipboard and confirm, or report that no embed code could be derived.
    let copy_embed_code = move |click: PendingImageClick| {
        match embed_core::embed_code_for(&click, &files.get_untracked()) {
            Some(code) => {
                spawn_local(async move {
                    let promise = window().navigator().clipboard().write_text(&code);
                    match JsFuture::from(promise).await {
                        Ok(_) => show_notice(format!("Copied embed code: {code}")),
                        Err(err) => {
                            web_sys::console::warn_1(&err);
                            show_notice("Could not write to the clipboard".to_string());
                        }
                    }
                });
            }
            None => show_notice("Could not determine image path".to_string()),
        }
    };

    // Capture-phase interceptor: sees every right-click before any popup
    // handling, updates the slot, and schedules the popup-injection fallback.
    let interceptor = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
        let captured = context_menu::find_image_source(&ev).map(PendingImageClick::capture);
        let landed_on_image = captured.is_some();
        set_pending.set(captured);
        if landed_on_image {
            context_menu::defer(move || {
                let Some(click) = pending.get_untracked() else {
                    return;
                };
                if click.offered_in_menu {
                    return;
                }
                context_menu::inject_copy_item(&document(), move || {
                    copy_embed_code(click.clone())
                });
            });
        }
    });
    let _ = document().add_event_listener_with_callback_and_bool(
        "contextmenu",
        interceptor.as_ref().unchecked_ref(),
        true,
    );
    interceptor.forget();

    // Any plain click dismisses whichever menu is open.
    let dismiss = Closure::<dyn FnMut()>::new(move || {
        set_menu.set(None);
        context_menu::close_host_popups(&document());
    });
    let _ = document().add_event_listener_with_callback("click", dismiss.as_ref().unchecked_ref());
    dismiss.forget();

    on_cleanup(move || set_pending.set(None));

    // Structured delivery path: the editing view builds its menu through this
    // model, and the extension appends its entry while the slot is occupied.
    let on_edit_contextmenu = move |ev: MouseEvent| {
        ev.prevent_default();
        context_menu::close_host_popups(&document());
        let mut entries = vec![
            MenuEntry {
                icon: "+",
                title: "New note",
                action: Callback::new(move |_| create_new_note()),
            },
            MenuEntry {
                icon: "👁",
                title: "Reading view",
                action: Callback::new(move |_| set_reading_mode.set(true)),
            },
        ];
        if pending.get_untracked().is_some() {
            set_pending.update(|slot| {
                if let Some(click) = slot {
                    click.offered_in_menu = true;
                }
            });
            entries.push(MenuEntry {
                icon: context_menu::COPY_ITEM_ICON,
                title: context_menu::COPY_ITEM_TITLE,
                action: Callback::new(move |_| {
                    if let Some(click) = pending.get_untracked() {
                        copy_embed_code(click);
                    }
                }),
            });
        }
        set_menu.set(Some(MenuState {
            x: ev.client_x(),
            y: ev.client_y(),
            entries,
        }));
    };

    // Reading view popup: rendered outside the menu model, so the copy entry
    // only ever reaches it through the deferred DOM injection.
    let on_reading_contextmenu = move |ev: MouseEvent| {
        ev.prevent_default();
        set_menu.set(None);
        context_menu::open_host_popup(&document(), ev.client_x(), ev.client_y(), move || {
            set_reading_mode.set(false)
        });
    };

    let preview_html = move || {
        let expanded =
            embed_core::expand_wiki_embeds(&content.get(), &vault_path.get(), &files.get());
        markdown_to_html(&expanded)
    };

    let dynamic_style = move || {
        let s = settings.get();
        format!(
            "--editor-font-size: {}px; --accent-color: {};",
            s.font_size, s.accent_color
        )
    };

    view! {
        <main class="app-layout" style=move || format!("display: flex; height: 100vh; width: 100vw; background: var(--bg-primary); color: var(--text-primary); {}", dynamic_style())>
            <nav class="sidebar" style="width: var(--sidebar-width); border-right: 1px solid var(--border-color); display: flex; flex-direction: column; background: var(--bg-secondary);">
                <div class="sidebar-header" style="height: var(--topbar-height); display: flex; align-items: center; justify-content: space-between; padding: 0 1rem; border-bottom: 1px solid var(--border-color); font-weight: 600; color: var(--accent-color);">
                    <span>"Quarry"</span>
                    <div style="display: flex; gap: 0.5rem; align-items: center;">
                        <button
                            on:click=move |_| create_new_note()
                            style="background: transparent; border: none; font-size: 1.2rem; cursor: pointer; color: var(--text-muted);"
                            title="New note"
                        >
                            "+"
                        </button>
                        <button
                            on:click=move |_| set_reading_mode.update(|m| *m = !*m)
                            style="background: transparent; border: none; font-size: 1.1rem; cursor: pointer; color: var(--text-muted);"
                            title="Toggle reading view"
                        >
                            {move || if reading_mode.get() { "✏" } else { "👁" }}
                        </button>
                    </div>
                </div>
                <div class="file-list" style="flex: 1; overflow-y: auto; padding: 0.75rem 0.5rem;">
                    {move || files.get().into_iter().filter(|f| f.path.ends_with(".md")).map(|f| {
                        let rel_path = f.path.clone();
                        let path_clone = f.path.clone();
                        let is_active = move || current_file.get() == path_clone;

                        view! {
                            <div
                                class="file-item"
                                style=move || format!("padding: 0.5rem 0.75rem; cursor: pointer; border-radius: var(--radius-md); margin-bottom: 4px; font-size: 0.9rem; transition: background 0.2s, color 0.2s; {}", if is_active() { "background: var(--accent-color); color: white;" } else { "color: var(--text-secondary);" })
                                on:click=move |_| select_file(rel_path.clone())
                            >
                                {f.path}
                            </div>
                        }
                    }).collect::<Vec<_>>()}
                </div>
            </nav>
            <section class="editor-pane" style="flex: 1; display: flex; flex-direction: column; background: var(--bg-primary); min-width: 0;">
                {move || if current_file.get().is_empty() {
                    view! {
                        <div style="flex: 1; display: flex; align-items: center; justify-content: center; color: var(--text-muted);">
                            "Select a note from the sidebar to start editing."
                        </div>
                    }.into_any()
                } else if reading_mode.get() {
                    view! {
                        <header class="topbar" style="height: var(--topbar-height); border-bottom: 1px solid var(--border-color); display: flex; align-items: center; gap: 0.75rem; padding: 0 1.5rem; color: var(--text-muted); font-size: 0.9rem;">
                            <span>{move || current_file.get()}</span>
                            <span style="font-size: 0.75rem; border: 1px solid var(--border-color); border-radius: 999px; padding: 0.1rem 0.5rem;">"Reading"</span>
                        </header>
                        <div
                            class="preview"
                            style="flex: 1; overflow-y: auto; padding: 2rem 3rem; font-size: var(--editor-font-size); line-height: 1.6;"
                            on:contextmenu=on_reading_contextmenu
                            inner_html=preview_html
                        ></div>
                    }.into_any()
                } else {
                    view! {
                        <header class="topbar" style="height: var(--topbar-height); border-bottom: 1px solid var(--border-color); display: flex; align-items: center; gap: 0.75rem; padding: 0 1.5rem; color: var(--text-muted); font-size: 0.9rem;">
                            <span>{move || current_file.get()}</span>
                            <span style="font-size: 0.75rem; border: 1px solid var(--border-color); border-radius: 999px; padding: 0.1rem 0.5rem;">"Editing"</span>
                        </header>
                        <div class="edit-split" style="flex: 1; display: flex; overflow: hidden;" on:contextmenu=on_edit_contextmenu>
                            <textarea
                                class="raw-editor"
                                style="flex: 1; padding: 1.5rem 2rem; font-family: var(--font-editor); font-size: var(--editor-font-size); line-height: 1.6; color: var(--text-primary); background: transparent; outline: none; border: none; resize: none; overflow-y: auto;"
                                prop:value=move || content.get()
                                on:input=update_content
                                placeholder="Start writing markdown..."
                                spellcheck="false"
                            ></textarea>
                            <div
                                class="preview"
                                style="flex: 1; overflow-y: auto; padding: 1.5rem 2rem; border-left: 1px solid var(--border-color); font-size: var(--editor-font-size); line-height: 1.6;"
                                inner_html=preview_html
                            ></div>
                        </div>
                    }.into_any()
                }}
            </section>
            {move || menu.get().map(|state| view! {
                <div class=context_menu::POPUP_CLASS style=format!("{} left: {}px; top: {}px;", context_menu::POPUP_STYLE, state.x, state.y)>
                    {state.entries.into_iter().map(|entry| {
                        let action = entry.action;
                        view! {
                            <div
                                class="ctx-menu-item"
                                style=context_menu::ITEM_STYLE
                                on:click=move |_| {
                                    action.run(());
                                    set_menu.set(None);
                                }
                            >
                                <span style="width: 1.2em; text-align: center;">{entry.icon}</span>
                                <span>{entry.title}</span>
                            </div>
                        }
                    }).collect::<Vec<_>>()}
                </div>
            })}
            {move || notice.get().map(|message| view! {
                <div class="notice" style="position: fixed; bottom: 1.5rem; right: 1.5rem; z-index: 1100; max-width: 60vw; overflow-wrap: anywhere; background: var(--accent-color); color: white; padding: 0.6rem 1rem; border-radius: var(--radius-md); box-shadow: 0 4px 14px rgba(0, 0, 0, 0.25); font-size: 0.9rem;">
                    {message}
                </div>
            })}
        </main>
    }
}
