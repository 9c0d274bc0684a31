use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct DefaultSettings {
    font_size: u32,
    accent_color: &'static str,
    notice_timeout_ms: u32,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            accent_color: "#6366f1",
            notice_timeout_ms: 2500,
        }
    }
}

fn collect_vault_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), String> {
    let read_dir = fs::read_dir(dir).map_err(|e| e.to_string())?;
    for entry in read_dir {
        let entry = entry.map_err(|e| e.to_string())?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_vault_files(root, &path, out)?;
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .map_err(|e| e.to_string())?
            .to_string_lossy()
            .replace('\\', "/");
        out.push(rel);
    }
    Ok(())
}

// Notes and attachments alike: this is the index the embed resolver searches.
// Sorted so same-named files resolve the same way on every enumeration.
#[tauri::command]
fn list_vault_files(vault_path: &str) -> Result<Vec<String>, String> {
    let root = Path::new(vault_path);
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    collect_vault_files(root, root, &mut entries)?;
    entries.sort();
    Ok(entries)
}

#[tauri::command]
fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| e.to_string())
}

#[tauri::command]
fn write_file(path: &str, content: &str) -> Result<(), String> {
    fs::write(path, content).map_err(|e| e.to_string())
}

#[tauri::command]
fn init_vault(app_handle: tauri::AppHandle) -> Result<String, String> {
    use tauri::Manager;
    let docs = app_handle
        .path()
        .document_dir()
        .map_err(|e| e.to_string())?;
    let vault_path = docs.join("QuarryVault");

    if !vault_path.exists() {
        fs::create_dir_all(&vault_path).map_err(|e| e.to_string())?;
        let welcome_path = vault_path.join("Welcome.md");
        fs::write(&welcome_path, "# Welcome to Quarry\n\nQuarry is a fast markdown vault.\n\n- Right-click any image in a note to copy its embed code.\n- Local attachments embed as `![[name.png]]`, web images as `![](url)`.\n\n![[sample.png]]\n").map_err(|e| e.to_string())?;
    }

    // Attachments live next to the notes and show up in the same index.
    let attachments_path = vault_path.join("Attachments");
    if !attachments_path.exists() {
        fs::create_dir_all(&attachments_path).map_err(|e| e.to_string())?;
    }

    let settings_path = vault_path.join("settings.json");
    if !settings_path.exists() {
        let defaults = serde_json::to_string_pretty(&DefaultSettings::default())
            .map_err(|e| e.to_string())?;
        fs::write(&settings_path, defaults).map_err(|e| e.to_string())?;
    }

    Ok(vault_path.to_string_lossy().into_owned())
}

#[tauri::command]
fn load_settings(vault_path: &str) -> Result<String, String> {
    let settings_path = format!("{}/settings.json", vault_path);
    fs::read_to_string(settings_path).or_else(|_| Ok("{}".to_string()))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            list_vault_files,
            read_file,
            write_file,
            init_vault,
            load_settings
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
