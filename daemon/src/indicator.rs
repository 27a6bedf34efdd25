//! Always-on-top indicator lights.
//!
//! Each [`Signal`] owns a small borderless square near the top centre of the
//! primary screen. On Windows the squares are layered `WS_POPUP` windows; on
//! other platforms they are headless and only log their transitions.

use tracing::{info, warn};

use crate::config::IndicatorConfig;
use crate::latch::{Latch, Transition};

/// Horizontal distance between neighbouring indicators, in pixels.
const SLOT_SPACING: i32 = 8;
/// Offset of the first slot from the screen centre, in pixels.
const FIRST_SLOT_OFFSET: i32 = -15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    ScreenCapture,
    CameraCapture,
    RemoteDesktop,
    LowNetworkTraffic,
}

impl Signal {
    /// Left-to-right order on screen.
    pub const ALL: [Signal; 4] = [
        Signal::LowNetworkTraffic,
        Signal::RemoteDesktop,
        Signal::CameraCapture,
        Signal::ScreenCapture,
    ];

    pub fn slot(self) -> i32 {
        match self {
            Signal::LowNetworkTraffic => 0,
            Signal::RemoteDesktop => 1,
            Signal::CameraCapture => 2,
            Signal::ScreenCapture => 3,
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Signal::LowNetworkTraffic => Rgb(0x00, 0xFF, 0x00),
            Signal::RemoteDesktop => Rgb(0x00, 0x00, 0xFF),
            Signal::CameraCapture => Rgb(0xFF, 0x00, 0x00),
            Signal::ScreenCapture => Rgb(0xFF, 0x93, 0x00),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::ScreenCapture => "screen capture",
            Signal::CameraCapture => "camera capture",
            Signal::RemoteDesktop => "remote desktop",
            Signal::LowNetworkTraffic => "low network traffic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Screen rectangle of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Places `signal` in its slot, centred horizontally on a screen `screen_width` pixels wide.
pub fn layout(signal: Signal, screen_width: i32, config: &IndicatorConfig) -> Geometry {
    Geometry {
        x: screen_width / 2 + FIRST_SLOT_OFFSET + SLOT_SPACING * signal.slot(),
        y: config.top,
        width: config.size,
        height: config.size,
    }
}

/// A visual marker that can be shown or hidden.
///
/// Both calls must be idempotent: showing a visible window or hiding a hidden
/// one is harmless.
pub trait IndicatorWindow {
    fn show(&mut self);
    fn hide(&mut self);
}

/// One indicator: a window plus the latch holding what it currently displays.
pub struct Indicator {
    signal: Signal,
    latch: Latch,
    window: Box<dyn IndicatorWindow>,
}

impl Indicator {
    pub fn new(signal: Signal, window: Box<dyn IndicatorWindow>) -> Self {
        Self {
            signal,
            latch: Latch::new(),
            window,
        }
    }

    pub fn is_on(&self) -> bool {
        self.latch.is_on()
    }

    /// Shows or hides the window only when `raw` differs from what is displayed.
    pub fn apply(&mut self, raw: bool) -> Option<Transition> {
        let transition = self.latch.update(raw)?;
        match transition {
            Transition::On => self.window.show(),
            Transition::Off => self.window.hide(),
        }
        info!(indicator = self.signal.label(), on = raw, "indicator changed");
        Some(transition)
    }

    /// Hides the window regardless of the latch. Used on shutdown.
    pub fn release(&mut self) {
        self.window.hide();
    }
}

/// Width of the primary screen in pixels.
pub fn screen_width() -> i32 {
    #[cfg(windows)]
    {
        imp::screen_width()
    }
    #[cfg(not(windows))]
    {
        1920
    }
}

/// Creates the platform window for `signal`. A window that cannot be created
/// degrades to a headless one so the monitor keeps running.
pub fn create_window(signal: Signal, config: &IndicatorConfig) -> Box<dyn IndicatorWindow> {
    let geometry = layout(signal, screen_width(), config);

    #[cfg(windows)]
    {
        match imp::Win32Window::create(signal, geometry, config.effective_opacity()) {
            Ok(window) => return Box::new(window),
            Err(e) => warn!(indicator = signal.label(), "failed to create window: {e}"),
        }
    }
    #[cfg(not(windows))]
    {
        warn!(
            indicator = signal.label(),
            "indicator windows are only drawn on Windows; logging transitions instead"
        );
    }

    Box::new(HeadlessWindow { signal, geometry })
}

/// Stand-in used where no window can be drawn.
struct HeadlessWindow {
    signal: Signal,
    geometry: Geometry,
}

impl IndicatorWindow for HeadlessWindow {
    fn show(&mut self) {
        tracing::debug!(indicator = self.signal.label(), x = self.geometry.x, "show (headless)");
    }

    fn hide(&mut self) {
        tracing::debug!(indicator = self.signal.label(), x = self.geometry.x, "hide (headless)");
    }
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use anyhow::{bail, Context, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::CreateSolidBrush;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetSystemMetrics,
        PeekMessageW, RegisterClassW, SetLayeredWindowAttributes, ShowWindow, TranslateMessage,
        LWA_ALPHA, MSG, PM_REMOVE, SM_CXSCREEN, SW_HIDE, SW_SHOWNOACTIVATE, WNDCLASSW,
        WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
    };

    use super::{Geometry, IndicatorWindow, Signal};

    pub fn screen_width() -> i32 {
        unsafe { GetSystemMetrics(SM_CXSCREEN) }
    }

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        DefWindowProcW(hwnd, msg, w_param, l_param)
    }

    /// Converts a Rust `&str` to a null-terminated UTF-16 `Vec<u16>`.
    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Drains pending messages so show/hide take effect without a long-running pump.
    fn pump_messages() {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    pub struct Win32Window {
        hwnd: HWND,
    }

    impl Win32Window {
        /// Registers a per-signal window class whose background brush is the
        /// signal's colour, then creates the hidden popup.
        pub fn create(signal: Signal, geometry: Geometry, opacity: f32) -> Result<Self> {
            let class_name = to_wide(&format!("StatusPrompterLight{}", signal.slot()));
            let super::Rgb(r, g, b) = signal.color();

            unsafe {
                let module = GetModuleHandleW(PCWSTR::null()).context("GetModuleHandleW failed")?;
                let hinstance: HINSTANCE = module.into();

                let class = WNDCLASSW {
                    lpfnWndProc: Some(wnd_proc),
                    hInstance: hinstance,
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    hbrBackground: CreateSolidBrush(COLORREF(
                        r as u32 | (g as u32) << 8 | (b as u32) << 16,
                    )),
                    ..Default::default()
                };
                if RegisterClassW(&class) == 0 {
                    bail!("RegisterClassW failed for {}", signal.label());
                }

                let hwnd = CreateWindowExW(
                    WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR::null(),
                    WS_POPUP,
                    geometry.x,
                    geometry.y,
                    geometry.width as i32,
                    geometry.height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                );
                if hwnd.0 == 0 {
                    bail!("CreateWindowExW failed for {}", signal.label());
                }

                let alpha = (opacity * 255.0).round() as u8;
                SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha, LWA_ALPHA)
                    .context("SetLayeredWindowAttributes failed")?;

                Ok(Self { hwnd })
            }
        }
    }

    impl IndicatorWindow for Win32Window {
        fn show(&mut self) {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
            }
            pump_messages();
        }

        fn hide(&mut self) {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_HIDE);
            }
            pump_messages();
        }
    }

    impl Drop for Win32Window {
        fn drop(&mut self) {
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeWindow;

    fn indicator(window: &FakeWindow) -> Indicator {
        Indicator::new(Signal::CameraCapture, Box::new(window.clone()))
    }

    // ── layout ────────────────────────────────────────────────────────────────

    #[test]
    fn layout_is_centred_with_distinct_offsets() {
        let config = IndicatorConfig::default();
        let xs: Vec<i32> = Signal::ALL
            .iter()
            .map(|s| layout(*s, 1920, &config).x)
            .collect();
        assert_eq!(xs, vec![945, 953, 961, 969]);
    }

    #[test]
    fn layout_uses_configured_size_and_top() {
        let config = IndicatorConfig {
            size: 40,
            opacity: 0.8,
            top: 3,
        };
        let g = layout(Signal::ScreenCapture, 1366, &config);
        assert_eq!(g, Geometry { x: 692, y: 3, width: 40, height: 40 });
    }

    #[test]
    fn every_signal_has_its_own_colour() {
        for (i, a) in Signal::ALL.iter().enumerate() {
            for b in &Signal::ALL[i + 1..] {
                assert_ne!(a.color(), b.color(), "{a:?} and {b:?} share a colour");
            }
        }
        assert_eq!(Signal::ScreenCapture.color(), Rgb(0xFF, 0x93, 0x00));
    }

    // ── apply ─────────────────────────────────────────────────────────────────

    #[test]
    fn visibility_follows_latest_reading() {
        let window = FakeWindow::new();
        let mut ind = indicator(&window);

        for raw in [true, false, true, true, false] {
            ind.apply(raw);
            assert_eq!(window.visible(), raw);
            assert_eq!(ind.is_on(), raw);
        }
    }

    #[test]
    fn repeated_reading_fires_one_side_effect() {
        let window = FakeWindow::new();
        let mut ind = indicator(&window);

        assert_eq!(ind.apply(true), Some(Transition::On));
        for _ in 0..10 {
            assert_eq!(ind.apply(true), None);
        }
        assert_eq!(window.log().shows, 1);
        assert_eq!(window.log().hides, 0);
    }

    #[test]
    fn initial_off_reading_does_not_touch_window() {
        let window = FakeWindow::new();
        let mut ind = indicator(&window);

        assert_eq!(ind.apply(false), None);
        assert_eq!(window.log().hides, 0);
    }

    #[test]
    fn release_hides_window() {
        let window = FakeWindow::new();
        let mut ind = indicator(&window);
        ind.apply(true);
        ind.release();
        assert!(!window.visible());
    }
}
