//! System clipboard access and change notifications.

pub use imp::{spawn_listener, SystemClipboard};

#[cfg(target_os = "windows")]
mod imp {
    use std::sync::OnceLock;

    use image::RgbaImage;
    use log::{error, info};
    use windows::core::w;
    use windows::Win32::Foundation::{HGLOBAL, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::DataExchange::{
        AddClipboardFormatListener, CloseClipboard, GetClipboardData, GetClipboardSequenceNumber,
        IsClipboardFormatAvailable, OpenClipboard,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, RegisterClassW,
        TranslateMessage, HWND_MESSAGE, MSG, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLIPBOARDUPDATE,
        WNDCLASSW,
    };

    use crate::clipboard::{ClipboardError, ClipboardSource};
    use crate::dib::decode_dib;

    const CF_DIB: u32 = 8;

    static ON_UPDATE: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

    #[derive(Debug, Default)]
    pub struct SystemClipboard;

    impl SystemClipboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl ClipboardSource for SystemClipboard {
        fn has_image(&mut self) -> bool {
            unsafe { IsClipboardFormatAvailable(CF_DIB).is_ok() }
        }

        fn sequence(&mut self) -> u64 {
            u64::from(unsafe { GetClipboardSequenceNumber() })
        }

        fn get_image(&mut self) -> Result<RgbaImage, ClipboardError> {
            unsafe {
                OpenClipboard(None).map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
                let result = read_dib();
                let _ = CloseClipboard();
                result
            }
        }
    }

    unsafe fn read_dib() -> Result<RgbaImage, ClipboardError> {
        let handle = GetClipboardData(CF_DIB)
            .map_err(|e| ClipboardError::FormatUnknown(e.to_string()))?;
        let global = HGLOBAL(handle.0);

        let ptr = GlobalLock(global) as *const u8;
        if ptr.is_null() {
            return Err(ClipboardError::FormatUnknown(
                "failed to lock clipboard data".into(),
            ));
        }
        let data = std::slice::from_raw_parts(ptr, GlobalSize(global));
        let result = decode_dib(data);
        let _ = GlobalUnlock(global);
        result
    }

    /// Registers a message-only window for `WM_CLIPBOARDUPDATE` on its own
    /// thread and calls `on_update` for each notification.
    pub fn spawn_listener<F>(on_update: F) -> anyhow::Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if ON_UPDATE.set(Box::new(on_update)).is_err() {
            anyhow::bail!("clipboard listener already running");
        }

        std::thread::Builder::new()
            .name("clipboard-listener".into())
            .spawn(|| {
                if let Err(e) = unsafe { message_loop() } {
                    error!("Clipboard listener stopped: {}", e);
                }
            })?;
        Ok(())
    }

    unsafe fn message_loop() -> windows::core::Result<()> {
        let instance = GetModuleHandleW(None)?;
        let class_name = w!("ClipShelfClipboardListener");

        let wc = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: instance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(windows::core::Error::from_win32());
        }

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class_name,
            w!("ClipShelf clipboard listener"),
            WINDOW_STYLE::default(),
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(instance.into()),
            None,
        )?;
        AddClipboardFormatListener(hwnd)?;
        info!("Clipboard listener registered");

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        info!("Clipboard listener loop stopped");
        Ok(())
    }

    extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if msg == WM_CLIPBOARDUPDATE {
            if let Some(on_update) = ON_UPDATE.get() {
                on_update();
            }
            return LRESULT(0);
        }
        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    }
}

#[cfg(not(target_os = "windows"))]
mod imp {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use arboard::Clipboard;
    use image::RgbaImage;
    use log::{debug, error, info};
    use sha2::{Digest, Sha256};

    use crate::clipboard::{ClipboardError, ClipboardSource};

    const POLL_INTERVAL: Duration = Duration::from_millis(200);

    /// Stand-in for the platform change counter, bumped by the poller.
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    #[derive(Debug, Default)]
    pub struct SystemClipboard;

    impl SystemClipboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl ClipboardSource for SystemClipboard {
        fn has_image(&mut self) -> bool {
            Clipboard::new()
                .and_then(|mut clipboard| clipboard.get_image())
                .is_ok()
        }

        fn sequence(&mut self) -> u64 {
            SEQUENCE.load(Ordering::SeqCst)
        }

        fn get_image(&mut self) -> Result<RgbaImage, ClipboardError> {
            let mut clipboard =
                Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            let data = clipboard.get_image().map_err(|e| match e {
                arboard::Error::ContentNotAvailable => ClipboardError::Empty,
                arboard::Error::ConversionFailure => ClipboardError::FormatUnknown(e.to_string()),
                other => ClipboardError::Unavailable(other.to_string()),
            })?;

            let (width, height) = (data.width as u32, data.height as u32);
            RgbaImage::from_raw(width, height, data.bytes.into_owned())
                .ok_or(ClipboardError::InvalidDimensions { width, height })
        }
    }

    fn image_digest() -> Option<String> {
        let image = Clipboard::new().ok()?.get_image().ok()?;

        let mut hasher = Sha256::new();
        hasher.update((image.width as u64).to_le_bytes());
        hasher.update((image.height as u64).to_le_bytes());
        hasher.update(&image.bytes);
        Some(hex::encode(hasher.finalize()))
    }

    /// Last image digest seen by the poller. The first observation is the
    /// baseline and never counts as a change.
    #[derive(Debug, Default)]
    struct DigestTracker {
        last: Option<Option<String>>,
    }

    impl DigestTracker {
        /// Records `digest` and returns whether a new image appeared.
        fn observe(&mut self, digest: Option<String>) -> bool {
            let Some(previous) = self.last.replace(digest.clone()) else {
                return false;
            };
            if digest.is_some() && digest != previous {
                debug!("Clipboard image changed ({:?})", digest);
                return true;
            }
            false
        }
    }

    /// Polls the clipboard and calls `on_update` whenever the image on it
    /// changes. Whatever is there at startup is the baseline.
    pub fn spawn_listener<F>(on_update: F) -> anyhow::Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        tauri::async_runtime::spawn(async move {
            info!("Clipboard poller started");

            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            let mut tracker = DigestTracker::default();

            loop {
                ticker.tick().await;

                let digest = match tokio::task::spawn_blocking(image_digest).await {
                    Ok(digest) => digest,
                    Err(e) => {
                        error!("Clipboard poll failed: {}", e);
                        continue;
                    }
                };

                if tracker.observe(digest) {
                    SEQUENCE.fetch_add(1, Ordering::SeqCst);
                    on_update();
                }
            }
        });
        Ok(())
    }

}
