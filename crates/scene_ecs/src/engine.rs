//! Core engine implementation

use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{Config, ConfigError, EngineConfig};
use crate::ecs::systems::{ViewportHandle, ViewportSystem};
use crate::ecs::{EcsError, EntityId, Manager};
use crate::events::{names, Event, EventArg, EventBus, PointerEvent};
use crate::foundation::time::{Clock, FrameLoop, StopHandle, SystemClock};
use crate::scene::{HeadlessRenderer, SceneRenderer};

/// Main engine struct
///
/// Owns the event bus, the ECS manager and the frame loop. The viewport
/// system is registered on `init()` with the configured renderer.
pub struct Engine {
    bus: Rc<EventBus>,
    manager: Manager,
    config: EngineConfig,
    frame_loop: FrameLoop,
    renderer: Option<Box<dyn SceneRenderer>>,
    viewport: Option<ViewportHandle>,
}

impl Engine {
    /// Create an engine timed by the system clock
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Create an engine timed by `clock`
    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        let bus = Rc::new(EventBus::new());
        Self {
            manager: Manager::new(Rc::clone(&bus)),
            bus,
            config,
            frame_loop: FrameLoop::new(clock),
            renderer: None,
            viewport: None,
        }
    }

    /// Create an engine from a `.toml` or `.ron` config file
    pub fn from_config_file(path: &str) -> Result<Self, EngineError> {
        let config = EngineConfig::load_from_file(path)?;
        Ok(Self::new(config))
    }

    /// Draw with `renderer` instead of the headless one
    ///
    /// Only takes effect before `init()`.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn SceneRenderer>) -> Self {
        if self.viewport.is_some() {
            log::warn!("Engine already initialised, renderer ignored");
        } else {
            self.renderer = Some(renderer);
        }
        self
    }

    /// Register the viewport system and initialise the manager
    pub fn init(&mut self) -> Result<(), EngineError> {
        if self.viewport.is_some() {
            return Ok(());
        }
        log::info!("Initializing engine...");

        let renderer: Box<dyn SceneRenderer> = match self.renderer.take() {
            Some(renderer) => renderer,
            None => Box::new(HeadlessRenderer::default()),
        };
        let system = ViewportSystem::new(&self.manager, renderer, self.config.viewport.clone());
        let viewport = system.handle();
        self.manager.add_system(system)?;
        self.viewport = Some(viewport);
        self.manager.init();

        self.bus.emit(&Event::new(names::ENGINE_INITED));
        Ok(())
    }

    /// Initialise if needed, then start the frame loop
    ///
    /// Starting a running loop is ignored.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.init()?;
        if !self.frame_loop.start() {
            log::warn!("Engine already running");
            return Ok(());
        }
        self.manager.start();

        log::info!("Engine started");
        self.bus.emit(&Event::new(names::ENGINE_STARTED));
        Ok(())
    }

    /// Stop the frame loop; ticks are ignored until the next `start()`
    pub fn stop(&mut self) {
        log::info!("Engine shutdown requested");
        self.frame_loop.stop();
    }

    /// Whether the frame loop is running
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Handle that stops the loop from inside a listener
    pub fn stop_handle(&self) -> StopHandle {
        self.frame_loop.stop_handle()
    }

    /// Process one frame; returns the delta in seconds, or `None` when stopped
    pub fn tick(&mut self) -> Option<f32> {
        let delta = self.frame_loop.tick()?;
        self.manager.update(delta);
        self.bus.emit(
            &Event::new(names::ENGINE_UPDATE)
                .with_arg(names::ARG_DELTA, EventArg::Seconds(delta))
                .with_arg(names::ARG_ELAPSED, EventArg::Seconds(self.frame_loop.total_time())),
        );
        Some(delta)
    }

    /// Run frames paced to the target frame rate until stopped
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.start()?;
        log::info!("Starting main loop...");

        let budget = (self.config.target_fps > 0)
            .then(|| Duration::from_secs_f64(1.0 / f64::from(self.config.target_fps)));
        while self.is_running() {
            let frame_start = Instant::now();
            self.tick();
            if let Some(budget) = budget {
                let spent = frame_start.elapsed();
                if spent < budget {
                    std::thread::sleep(budget - spent);
                }
            }
        }

        log::info!("Engine shutdown complete");
        Ok(())
    }

    /// Run at most `frames` unpaced frames; returns the number processed
    pub fn run_frames(&mut self, frames: u64) -> Result<u64, EngineError> {
        self.start()?;
        let mut processed = 0;
        while processed < frames && self.tick().is_some() {
            processed += 1;
        }
        Ok(processed)
    }

    /// Feed a pointer sample to the viewport
    pub fn dispatch_pointer(&self, pointer: &PointerEvent) -> Option<EntityId> {
        self.viewport.as_ref()?.handle_pointer(pointer)
    }

    /// Global event bus
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// ECS manager
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Viewport handle, available after `init()`
    pub fn viewport(&self) -> Option<&ViewportHandle> {
        self.viewport.as_ref()
    }

    /// Frames processed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_loop.frame_count()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("manager", &self.manager)
            .field("frame_loop", &self.frame_loop)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// ECS error
    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),
}
