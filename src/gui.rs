//! A simple, high-level GUI for displaying the annotated camera feed.
//!
//! The windowing event loop has to own the main thread on most platforms, so
//! [`run`] spawns the recognition loop on a second thread and keeps winit on
//! the main one. Images are handed over with [`show_image`]; a window is
//! created per image key on first use. Closing a window terminates the
//! process.

mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    sync::Mutex,
};

use once_cell::sync::OnceCell;
use raw_window_handle::{HasRawDisplayHandle, RawDisplayHandle};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopClosed, EventLoopProxy},
    window::WindowId,
};

use crate::{
    image::Image,
    resolution::Resolution,
    termination::Termination,
};

use self::renderer::{Renderer, Window};

struct Gui {
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
}

impl Gui {
    fn new() -> Self {
        Self {
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
        }
    }

    fn get_renderer_mut(&mut self, win: WindowId) -> &mut Renderer {
        let key = &self.win_id_to_key[&win];
        self.windows.get_mut(key).unwrap()
    }

    fn run(mut self, event_loop: EventLoop<Msg>) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(msg) => match msg {
                    Msg::Image { key, res, data } => {
                        let renderer = self.windows.entry(key.clone()).or_insert_with(|| {
                            log::debug!("creating window for image '{key}' at {res}");

                            let win = Window::open(target, &key, res).unwrap();
                            let win_id = win.id();
                            let renderer = Renderer::new(win).unwrap();

                            self.win_id_to_key.insert(win_id, key.clone());

                            renderer
                        });

                        renderer.update_texture(res, &data);
                        renderer.window().request_redraw();
                    }
                },
                Event::RedrawRequested(window) => {
                    let renderer = self.get_renderer_mut(window);
                    renderer.redraw();
                }
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => {
                    // The recognition loop has no shutdown channel; closing the window is the
                    // intended way to end the process.
                    process::exit(0);
                }
                _ => {}
            }
        });
    }
}

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
}

struct UnsafeSendSync<T>(T);
unsafe impl<T> Sync for UnsafeSendSync<T> {}
unsafe impl<T> Send for UnsafeSendSync<T> {}

/// A connection to the native display server.
pub struct Display {
    raw: UnsafeSendSync<RawDisplayHandle>,
    proxy: Mutex<EventLoopProxy<Msg>>,
}

impl Display {
    pub fn get() -> &'static Display {
        DISPLAY.get().expect("display not initialized")
    }
}

unsafe impl HasRawDisplayHandle for Display {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        self.raw.0
    }
}

static DISPLAY: OnceCell<Display> = OnceCell::new();

fn send(msg: Msg) {
    Display::get()
        .proxy
        .lock()
        .unwrap()
        .send_event(msg)
        .map_err(|_closed| EventLoopClosed(()))
        .unwrap();
}

/// Initializes the GUI and invokes `cb` on a second thread.
///
/// This never returns; when `cb` does, the process exits with a status
/// reflecting the returned [`Termination`] value.
pub fn run<F, R>(cb: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: Termination + Send,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();
    let display = Display {
        raw: UnsafeSendSync(event_loop.raw_display_handle()),
        proxy: Mutex::new(proxy),
    };
    DISPLAY
        .set(display)
        .ok()
        .expect("display already initialized");

    // Library is now initialized; spawn another thread to run the application code.
    std::thread::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(cb));
        match result {
            Ok(r) => {
                if r.is_success() {
                    process::exit(0);
                } else {
                    r.report(); // may print the error message
                    process::exit(1);
                }
            }
            Err(_payload) => {
                // Panic handler has printed the panic message and backtrace already, exit with 101
                // to mimick libstd behavior.
                process::exit(101);
            }
        }
    });

    let gui = Gui::new();
    gui.run(event_loop);
}

/// Displays an image in a window.
pub fn show_image(key: impl Into<String>, image: &Image) {
    // Image data is RGBA8 internally so that no conversion before GPU upload is needed.
    let data = image.data().to_vec();

    send(Msg::Image {
        key: key.into(),
        res: Resolution::new(image.width(), image.height()),
        data,
    });
}
