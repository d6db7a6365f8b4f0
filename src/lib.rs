mod clipboard;
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
mod dib;
mod dispatch;
mod gallery;
mod logging;
mod platform;
mod settings;
mod types;
mod viewer;
mod zoom;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{error, info};
use tauri::{
    ipc::Response,
    menu::{Menu, MenuItem, PredefinedMenuItem, Submenu},
    AppHandle, Emitter, LogicalSize, Manager, PhysicalPosition, PhysicalSize, State,
    WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent,
};

use clipboard::{ClipboardSource, ClipboardWatcher};
use dispatch::Dispatcher;
use gallery::{EntryId, Gallery, GalleryError};
use platform::SystemClipboard;
use settings::{BoundsTracker, SettingsStore, WindowSettings};
use types::{GalleryView, ViewerSize};
use viewer::FullSizeViewer;

const MAIN_WINDOW: &str = "main";
const VIEWER_WINDOW: &str = "viewer";

const GALLERY_CHANGED: &str = "gallery-changed";
const VIEWER_CHANGED: &str = "viewer-changed";
const ABOUT_EVENT: &str = "about";

const ABOUT_TEXT: &str = "ClipShelf, a clipboard image viewer

Every image copied to the clipboard shows up here, newest first.

Double-click left to open an image full-sized.
Double-click right to hide an image.";

struct AppState {
    gallery: Mutex<Gallery>,
    watcher: Mutex<ClipboardWatcher>,
    clipboard: Mutex<SystemClipboard>,
    viewer: Mutex<Option<FullSizeViewer>>,
    bounds: Mutex<BoundsTracker>,
    settings: SettingsStore,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let menu_events = menu_dispatcher();

    tauri::Builder::default()
        .plugin(logging::get_builder().build())
        .setup(|app| {
            let settings = SettingsStore::in_dir(app.path().app_config_dir()?);
            let stored = settings.load();
            info!("Loaded settings from {}", settings.path().display());

            let mut gallery = Gallery::new();
            if let Some(zoom) = stored.zoom_level() {
                gallery.set_zoom(zoom);
            }

            let mut clipboard = SystemClipboard::new();
            let watcher = ClipboardWatcher::new(clipboard.sequence());

            app.manage(AppState {
                gallery: Mutex::new(gallery),
                watcher: Mutex::new(watcher),
                clipboard: Mutex::new(clipboard),
                viewer: Mutex::new(None),
                bounds: Mutex::new(BoundsTracker::from_settings(&stored)),
                settings,
            });

            let window = app
                .get_webview_window(MAIN_WINDOW)
                .ok_or_else(|| anyhow::anyhow!("main window missing"))?;
            let menu = build_menu(app.handle())?;
            #[cfg(target_os = "macos")]
            app.set_menu(menu)?;
            #[cfg(not(target_os = "macos"))]
            window.set_menu(menu)?;
            restore_window(&window, &stored);

            let handle = app.handle().clone();
            platform::spawn_listener(move || {
                let app = handle.clone();
                if let Err(e) = handle.run_on_main_thread(move || on_clipboard_update(&app)) {
                    error!("Failed to forward clipboard notification: {}", e);
                }
            })?;

            Ok(())
        })
        .on_menu_event(move |app, event| {
            menu_events.dispatch(event.id().as_ref(), app);
        })
        .on_window_event(|window, event| {
            // Geometry events can arrive before setup has registered the state.
            let Some(state) = window.try_state::<AppState>() else {
                return;
            };
            match (window.label(), event) {
                (MAIN_WINDOW, WindowEvent::Moved(position)) => {
                    lock(&state.bounds).moved(position.x, position.y, is_normal(window));
                }
                (MAIN_WINDOW, WindowEvent::Resized(size)) => {
                    lock(&state.bounds).resized(size.width, size.height, is_normal(window));
                }
                (MAIN_WINDOW, WindowEvent::CloseRequested { .. }) => {
                    shutdown(window.app_handle());
                }
                (VIEWER_WINDOW, WindowEvent::Destroyed) => {
                    *lock(&state.viewer) = None;
                }
                _ => {}
            }
        })
        .invoke_handler(tauri::generate_handler![
            get_gallery,
            get_thumbnail,
            set_zoom,
            zoom_step,
            set_viewport_width,
            set_visible,
            set_hover,
            open_viewer,
            get_viewer_image,
            viewer_wheel
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

fn menu_dispatcher() -> Dispatcher<AppHandle> {
    Dispatcher::new()
        .on("show_all", |app: &AppHandle| {
            update_gallery(app, |g| g.set_all_visible(true))
        })
        .on("hide_all", |app: &AppHandle| {
            update_gallery(app, |g| g.set_all_visible(false))
        })
        .on("remove_all", |app: &AppHandle| update_gallery(app, Gallery::remove_all))
        .on("exit", shutdown)
        .on("about", |app: &AppHandle| {
            if let Err(e) = app.emit_to(MAIN_WINDOW, ABOUT_EVENT, ABOUT_TEXT) {
                error!("Failed to emit about event: {}", e);
            }
        })
}

fn build_menu(app: &AppHandle) -> tauri::Result<Menu<tauri::Wry>> {
    let show = MenuItem::with_id(app, "show_all", "Show All", true, None::<&str>)?;
    let hide = MenuItem::with_id(app, "hide_all", "Hide All", true, None::<&str>)?;
    let remove = MenuItem::with_id(app, "remove_all", "Remove All", true, None::<&str>)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let exit = MenuItem::with_id(app, "exit", "Exit", true, None::<&str>)?;
    let view = Submenu::with_items(app, "View", true, &[&show, &hide, &remove, &separator, &exit])?;

    let about = MenuItem::with_id(app, "about", "About", true, None::<&str>)?;
    let help = Submenu::with_items(app, "Help", true, &[&about])?;

    Menu::with_items(app, &[&view, &help])
}

fn on_clipboard_update(app: &AppHandle) {
    let state = app.state::<AppState>();
    let image = {
        let mut clipboard = lock(&state.clipboard);
        lock(&state.watcher).on_clipboard_update(&mut *clipboard, Instant::now())
    };

    if let Some(image) = image {
        let mut gallery = lock(&state.gallery);
        let id = gallery.insert(image);
        info!("Added thumbnail {} ({} in gallery)", id, gallery.len());
        drop(gallery);
        notify_gallery_changed(app);
    }
}

fn update_gallery(app: &AppHandle, f: impl FnOnce(&mut Gallery)) {
    let state = app.state::<AppState>();
    f(&mut *lock(&state.gallery));
    notify_gallery_changed(app);
}

fn notify_gallery_changed(app: &AppHandle) {
    if let Err(e) = app.emit_to(MAIN_WINDOW, GALLERY_CHANGED, ()) {
        error!("Failed to emit {} event: {}", GALLERY_CHANGED, e);
    }
}

fn is_normal(window: &tauri::Window) -> bool {
    !window.is_maximized().unwrap_or(false) && !window.is_minimized().unwrap_or(false)
}

fn restore_window(window: &WebviewWindow, settings: &WindowSettings) {
    if let Some(position) = settings.position {
        if let Err(e) = window.set_position(PhysicalPosition::new(position.x, position.y)) {
            error!("Failed to restore window position: {}", e);
        }
    }
    if let Some(size) = settings.restore_size() {
        if let Err(e) = window.set_size(PhysicalSize::new(size.width, size.height)) {
            error!("Failed to restore window size: {}", e);
        }
    }

    let restored = if settings.maximized {
        window.maximize()
    } else if settings.minimized {
        window.minimize()
    } else {
        Ok(())
    };
    if let Err(e) = restored {
        error!("Failed to restore window state: {}", e);
    }
}

fn save_settings(app: &AppHandle) {
    let Some(window) = app.get_webview_window(MAIN_WINDOW) else {
        return;
    };
    let state = app.state::<AppState>();

    let maximized = window.is_maximized().unwrap_or(false);
    let minimized = window.is_minimized().unwrap_or(false);
    let mut bounds = lock(&state.bounds);
    if !maximized && !minimized {
        if let Ok(position) = window.outer_position() {
            bounds.moved(position.x, position.y, true);
        }
        if let Ok(size) = window.inner_size() {
            bounds.resized(size.width, size.height, true);
        }
    }

    let zoom = lock(&state.gallery).zoom();
    let settings = bounds.snapshot(maximized, minimized, zoom);
    match state.settings.save(&settings) {
        Ok(()) => info!("Settings saved to {}", state.settings.path().display()),
        Err(e) => error!("Failed to save settings: {}", e),
    }
}

fn shutdown(app: &AppHandle) {
    save_settings(app);
    app.exit(0);
}

#[tauri::command]
fn get_gallery(state: State<'_, AppState>) -> GalleryView {
    GalleryView::from(&*lock(&state.gallery))
}

#[tauri::command]
fn get_thumbnail(id: EntryId, state: State<'_, AppState>) -> Result<Response, String> {
    let gallery = lock(&state.gallery);
    let entry = gallery
        .get(id)
        .ok_or_else(|| GalleryError::UnknownEntry(id).to_string())?;
    entry.to_png().map(Response::new).map_err(|e| e.to_string())
}

#[tauri::command]
fn set_zoom(index: usize, state: State<'_, AppState>) -> Result<GalleryView, String> {
    let mut gallery = lock(&state.gallery);
    gallery.set_zoom_index(index).map_err(|e| e.to_string())?;
    Ok(GalleryView::from(&*gallery))
}

#[tauri::command]
fn zoom_step(delta: i32, state: State<'_, AppState>) -> GalleryView {
    let mut gallery = lock(&state.gallery);
    let zoom = gallery.zoom().stepped(delta);
    gallery.set_zoom(zoom);
    GalleryView::from(&*gallery)
}

#[tauri::command]
fn set_viewport_width(width: u32, state: State<'_, AppState>) -> GalleryView {
    let mut gallery = lock(&state.gallery);
    gallery.resize(width);
    GalleryView::from(&*gallery)
}

#[tauri::command]
fn set_visible(
    id: EntryId,
    visible: bool,
    state: State<'_, AppState>,
) -> Result<GalleryView, String> {
    let mut gallery = lock(&state.gallery);
    gallery.set_visible(id, visible).map_err(|e| e.to_string())?;
    Ok(GalleryView::from(&*gallery))
}

#[tauri::command]
fn set_hover(id: EntryId, hovered: bool, state: State<'_, AppState>) -> Result<(), String> {
    lock(&state.gallery)
        .set_hover(id, hovered)
        .map_err(|e| e.to_string())
}

// Window creation from a synchronous command deadlocks on Windows.
#[tauri::command]
async fn open_viewer(
    id: EntryId,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let (width, height) = {
        let gallery = lock(&state.gallery);
        let entry = gallery
            .get(id)
            .ok_or_else(|| GalleryError::UnknownEntry(id).to_string())?;
        (entry.width(), entry.height())
    };
    *lock(&state.viewer) = Some(FullSizeViewer::new(id, width, height));

    let size = LogicalSize::new(f64::from(width), f64::from(height));
    match app.get_webview_window(VIEWER_WINDOW) {
        Some(window) => {
            window.set_size(size).map_err(|e| e.to_string())?;
            app.emit_to(VIEWER_WINDOW, VIEWER_CHANGED, ())
                .map_err(|e| e.to_string())?;
            window.show().map_err(|e| e.to_string())?;
            window.set_focus().map_err(|e| e.to_string())?;
        }
        None => {
            WebviewWindowBuilder::new(&app, VIEWER_WINDOW, WebviewUrl::App("viewer.html".into()))
                .title("ClipShelf")
                .inner_size(size.width, size.height)
                .resizable(true)
                .build()
                .map_err(|e| format!("Failed to create viewer window: {}", e))?;
        }
    }

    info!("Opened viewer for thumbnail {}", id);
    Ok(())
}

#[tauri::command]
fn get_viewer_image(state: State<'_, AppState>) -> Result<Response, String> {
    let id = lock(&state.viewer)
        .as_ref()
        .map(FullSizeViewer::entry)
        .ok_or("No image in viewer")?;
    get_thumbnail(id, state)
}

#[tauri::command]
fn viewer_wheel(delta: i32, app: AppHandle, state: State<'_, AppState>) -> Result<ViewerSize, String> {
    let size = lock(&state.viewer)
        .as_mut()
        .map(|viewer| viewer.wheel(delta))
        .ok_or("No image in viewer")?;

    if let Some(window) = app.get_webview_window(VIEWER_WINDOW) {
        window
            .set_size(LogicalSize::new(f64::from(size.width), f64::from(size.height)))
            .map_err(|e| e.to_string())?;
    }
    Ok(size)
}
