// =============================================================================
// VULKAN TEST - triangle / textured quad with resilient frame pacing
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (App)                                         │
// │    └── FrameScheduler (slot ring, rebuild protocol)             │
// │          └── Renderer (FrameBackend)                            │
// │                └── Vulkan Device + Swapchain + per-image state  │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Wait for this slot's fence (bounds frames in flight)
// 2. Acquire swapchain image (stale -> rebuild, skip frame)
// 3. Update the image's uniform buffer (quad only)
// 4. Reset fence, submit pre-recorded commands
// 5. Present; rebuild if suboptimal, stale or resized
// 6. Advance to the next slot
//
// =============================================================================

mod backend;
mod config;
mod frame;
mod renderer;
mod scene;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, RenderVariant, DEFAULT_CONFIG_PATH};
use frame::{FrameScheduler, FrameStatus, ResizeFlag};
use renderer::Renderer;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

#[derive(Parser, Debug)]
#[command(about = "Draws a triangle or a spinning textured quad with Vulkan")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the scene selected in the configuration file
    #[arg(long, value_enum)]
    variant: Option<RenderVariant>,
}

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    // The logger is configured from the file, so loading reports back
    // instead of logging
    let (mut config, source) = match Config::load_from_path(&args.config) {
        Ok((config, source)) => (config, Ok(source)),
        Err(e) => (Config::default(), Err(e)),
    };
    if let Some(variant) = args.variant {
        config.graphics.variant = variant;
    }

    init_logging(&config);
    match source {
        Ok(source) => source.log(&config),
        Err(e) => log::warn!("{:#}. Using defaults.", e),
    }

    log::info!("Starting Vulkan renderer ({:?})", config.graphics.variant);
    log::info!("Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.fullscreen { "fullscreen" } else { "windowed" }
    );
    log::info!("Present mode: {}, frames in flight: {}",
        config.graphics.present_mode,
        config.graphics.max_frames_in_flight
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Initialize logging. `RUST_LOG` overrides the configured level; with
/// `log_to_file` everything goes to the log file instead of stderr.
fn init_logging(config: &Config) {
    use env_logger::{Builder, Target};

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_default_env();

    if config.debug.log_to_file {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "=== Vulkan Test Log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                let _ = writeln!(file);
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", config.debug.log_file, e),
        }
    }

    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    resize: ResizeFlag,

    // Renderer and scheduler go first so they are dropped before the window
    renderer: Option<Renderer>,
    scheduler: Option<FrameScheduler>,
    window: Option<Arc<Window>>,
    is_fullscreen: bool,

    /// No drawable area; stop requesting redraws until the next resize
    suspended: bool,
    /// First unrecoverable error, returned from main
    fatal: Option<anyhow::Error>,

    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let is_fullscreen = config.window.fullscreen;
        let now = Instant::now();
        Self {
            config,
            resize: ResizeFlag::new(),
            renderer: None,
            scheduler: None,
            window: None,
            is_fullscreen,
            suspended: false,
            fatal: None,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_resizable(self.config.window.resizable)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        if self.config.window.fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let renderer = Renderer::new(Arc::clone(&window), &self.config)?;
        let mut scheduler = FrameScheduler::new(
            self.config.graphics.max_frames_in_flight,
            self.resize.clone(),
        )?;
        if !renderer.has_swapchain() {
            scheduler.defer_rebuild();
        }
        log::info!("Renderer ready, {} frame slots", scheduler.frames_in_flight());

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.scheduler = Some(scheduler);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
        event_loop.exit();
    }

    // =========================================================================
    // RENDER LOOP
    // =========================================================================

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(renderer), Some(scheduler)) = (self.renderer.as_mut(), self.scheduler.as_mut()) else {
            return;
        };

        match scheduler.draw_frame(renderer) {
            Ok(FrameStatus::Presented) => self.update_fps(),
            Ok(FrameStatus::Rebuilt) => {}
            Ok(FrameStatus::Suspended) => {
                log::debug!(
                    "Window has no drawable area, waiting for resize (slot {}, rebuild pending: {})",
                    scheduler.current_slot(),
                    scheduler.rebuild_pending()
                );
                self.suspended = true;
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Err(e) => self.fail(event_loop, e.context("Frame failed")),
        }
    }

    // =========================================================================
    // FULLSCREEN TOGGLE
    // =========================================================================

    fn toggle_fullscreen(&mut self) {
        if let Some(ref window) = self.window {
            self.is_fullscreen = !self.is_fullscreen;

            if self.is_fullscreen {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                log::info!("Entered fullscreen mode");
            } else {
                window.set_fullscreen(None);
                log::info!("Exited fullscreen mode");
            }

            self.resize.raise();
        }
    }

    // =========================================================================
    // FPS TRACKING
    // =========================================================================

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;

            if let Some(ref window) = self.window {
                let mode = if self.is_fullscreen { "fullscreen" } else { "windowed" };
                window.set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms) [{}]",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0,
                    mode
                ));
            }

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            self.suspended = false;
            return;
        }

        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e.context("Failed to initialize"));
        }
    }

    fn suspended(&mut self, event_loop: &ActiveEventLoop) {
        self.suspended = true;
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if !self.resize.is_raised() {
                    log::debug!("Window resized to {}x{}", size.width, size.height);
                }
                self.resize.raise();

                if size.width > 0 && size.height > 0 {
                    self.suspended = false;
                    if let Some(ref window) = self.window {
                        window.request_redraw();
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        match key {
                            KeyCode::Escape => {
                                log::info!("ESC pressed, exiting...");
                                event_loop.exit();
                            }
                            KeyCode::F11 => self.toggle_fullscreen(),
                            _ => {}
                        }
                    }
                }
            }

            _ => {}
        }
    }

    /// Keep drawing as fast as the present mode allows, unless suspended
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.suspended {
            return;
        }
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scheduler) = self.scheduler.take() {
            log::info!("Exiting after {} swapchain rebuilds", scheduler.rebuilds());
        }
        // Waits for the GPU, then destroys everything before the window goes
        self.renderer = None;
    }
}
