use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bz_localizer_core::{
    parse_manual_input, BatchEvent, BatchOptions, BatchRequest, BatchRunner, DiscoveredUnit,
    GoogleTranslator, InstallPreset, LocalizationEntry, LocalizerConfig, OdfScanner,
    PresetResolution,
};
use log::{warn, LevelFilter};
use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_dialog::DialogExt;

const BATCH_EVENT: &str = "localizer://batch";

struct Shared {
    runner: Arc<BatchRunner>,
    config: Mutex<LocalizerConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEventPayload {
    batch_id: String,
    event: BatchEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    table_path: String,
    default_preset: InstallPreset,
    call_delay_ms: u64,
}

fn config_snapshot(state: &State<'_, Shared>) -> Result<LocalizerConfig, String> {
    state
        .config
        .lock()
        .map(|config| config.clone())
        .map_err(|_| "config lock poisoned".to_string())
}

#[tauri::command]
fn get_settings(state: State<'_, Shared>) -> Result<Settings, String> {
    let config = config_snapshot(&state)?;
    Ok(Settings {
        table_path: config.resolved_table_path().to_string_lossy().to_string(),
        default_preset: config.default_preset,
        call_delay_ms: config.call_delay_ms,
    })
}

#[tauri::command]
fn preset_table_path(preset: InstallPreset) -> PresetResolution {
    preset.resolve()
}

#[tauri::command]
fn check_table_path(path: String) -> bool {
    PathBuf::from(path).is_file()
}

#[tauri::command]
fn preview_manual_input(
    state: State<'_, Shared>,
    text: String,
) -> Result<Vec<LocalizationEntry>, String> {
    let config = config_snapshot(&state)?;
    Ok(parse_manual_input(&text, &config.mission_marker))
}

#[tauri::command]
fn scan_odf_folder(state: State<'_, Shared>, folder: String) -> Result<Vec<DiscoveredUnit>, String> {
    let config = config_snapshot(&state)?;
    OdfScanner::new(config.scan_config())
        .scan(&PathBuf::from(folder))
        .map_err(|e| e.to_string())
}

#[tauri::command]
async fn browse_table_file(app: AppHandle) -> Option<String> {
    app.dialog()
        .file()
        .add_filter("CSV Files", &["csv"])
        .add_filter("All Files", &["*"])
        .blocking_pick_file()
        .map(|path| path.to_string())
}

#[tauri::command]
async fn browse_scan_folder(app: AppHandle) -> Option<String> {
    app.dialog()
        .file()
        .blocking_pick_folder()
        .map(|path| path.to_string())
}

#[tauri::command]
fn open_table_folder(path: String) -> Result<(), String> {
    bz_localizer_core::open_table_folder(&PathBuf::from(path))
}

#[tauri::command]
fn is_batch_running(state: State<'_, Shared>) -> bool {
    state.runner.is_running()
}

#[tauri::command]
async fn start_manual_batch(
    app: AppHandle,
    state: State<'_, Shared>,
    table_path: String,
    text: String,
) -> Result<String, String> {
    let config = config_snapshot(&state)?;
    let entries = parse_manual_input(&text, &config.mission_marker);
    start_batch(app, &state, config, table_path, entries)
}

#[tauri::command]
async fn start_scan_batch(
    app: AppHandle,
    state: State<'_, Shared>,
    table_path: String,
    folder: String,
) -> Result<String, String> {
    let config = config_snapshot(&state)?;
    let units = OdfScanner::new(config.scan_config())
        .scan(&PathBuf::from(folder))
        .map_err(|e| e.to_string())?;
    let entries = units.iter().map(DiscoveredUnit::to_entry).collect();
    start_batch(app, &state, config, table_path, entries)
}

fn start_batch(
    app: AppHandle,
    state: &State<'_, Shared>,
    mut config: LocalizerConfig,
    table_path: String,
    entries: Vec<LocalizationEntry>,
) -> Result<String, String> {
    let table_path = PathBuf::from(table_path.trim());
    let translator = GoogleTranslator::new(
        &config.translate_endpoint,
        &config.source_language,
        config.request_timeout(),
    )
    .map_err(|e| e.to_string())?;

    let handle = state
        .runner
        .start(
            Arc::new(translator),
            BatchRequest {
                entries,
                table_path: table_path.clone(),
                options: BatchOptions {
                    call_delay: config.call_delay(),
                },
            },
        )
        .map_err(|e| e.to_string())?;

    config.table_path = Some(table_path);
    remember_config(state, config);

    let batch_id = handle.batch_id.to_string();
    let forward_id = batch_id.clone();
    let mut events = handle.events;
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events.recv().await {
            let payload = BatchEventPayload {
                batch_id: forward_id.clone(),
                event,
            };
            if let Err(error) = app.emit(BATCH_EVENT, payload) {
                warn!("failed to emit batch event: {}", error);
            }
        }
    });

    Ok(batch_id)
}

fn remember_config(state: &State<'_, Shared>, config: LocalizerConfig) {
    let saved = LocalizerConfig::default_path().and_then(|path| config.save_to(path));
    if let Err(error) = saved {
        warn!("failed to save settings: {}", error);
    }
    if let Ok(mut guard) = state.config.lock() {
        *guard = config;
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_log::Builder::default()
                .level(LevelFilter::Info)
                .build(),
        )
        .setup(|app| {
            let config = LocalizerConfig::load().unwrap_or_else(|error| {
                warn!("using default settings: {}", error);
                LocalizerConfig::default()
            });
            app.manage(Shared {
                runner: BatchRunner::new(),
                config: Mutex::new(config),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_settings,
            preset_table_path,
            check_table_path,
            preview_manual_input,
            scan_odf_folder,
            browse_table_file,
            browse_scan_folder,
            open_table_folder,
            is_batch_running,
            start_manual_batch,
            start_scan_batch
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
