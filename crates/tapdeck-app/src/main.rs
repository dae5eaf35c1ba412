mod app;
mod config;
mod input;
mod pipeline;
mod playback;
mod surface;

use std::process::ExitCode;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Fullscreen, WindowAttributes, WindowId};

use app::App;
use config::{LaunchPlan, Options};
use pipeline::bus::Bus;
use pipeline::sim::SimPipeline;
use pipeline::{Pipeline, PipelineState};
use playback::ShutdownSignal;

/// Event-loop wakeup pinged by pipeline and keyboard threads.
#[derive(Debug)]
struct Wake;

struct Driver {
    options: Options,
    plan: LaunchPlan,
    pipeline: Arc<dyn Pipeline>,
    bus: Arc<Bus>,
    proxy: EventLoopProxy<Wake>,
    shutdown: ShutdownSignal,
    app: Option<App>,
    exit_code: u8,
}

impl Driver {
    fn check_shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(code) = self.shutdown.requested() {
            self.exit_code = code as u8;
            event_loop.exit();
        }
    }
}

impl ApplicationHandler<Wake> for Driver {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        let mut attrs = WindowAttributes::default().with_title("tapdeck");
        if self.options.no_fullscreen {
            attrs = attrs.with_inner_size(winit::dpi::PhysicalSize::new(640, 480));
        } else {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                self.exit_code = 1;
                event_loop.exit();
                return;
            }
        };

        let proxy = self.proxy.clone();
        let built = App::new(
            window,
            self.pipeline.clone(),
            &self.bus,
            &self.plan,
            &self.options,
            self.shutdown.clone(),
            move || {
                let _ = proxy.send_event(Wake);
            },
        );
        match built {
            Ok(mut app) => {
                app.start();
                self.app = Some(app);
            }
            Err(e) => {
                log::error!("failed to initialize: {e}");
                self.exit_code = 1;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                // Graceful exit path: release the engine, code stays 0.
                app.release();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested | WindowEvent::Resized(_) => app.on_redraw(),
            other => {
                app.handle_window_event(&other);
                self.check_shutdown(event_loop);
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: Wake) {
        if let Some(app) = self.app.as_mut() {
            app.drain();
        }
        self.check_shutdown(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(app) = self.app.as_mut() {
            app.drain();
        }
        self.check_shutdown(event_loop);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let options = Options::from_cli();
    let plan = match LaunchPlan::resolve(&options) {
        Ok(plan) => plan,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(1);
        }
    };
    log::info!("launching pipeline: {}", plan.description);

    let event_loop = match EventLoop::<Wake>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {e}");
            return ExitCode::from(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);
    let proxy = event_loop.create_proxy();

    let bus = Bus::new();
    let waker_proxy = proxy.clone();
    bus.set_waker(move || {
        let _ = waker_proxy.send_event(Wake);
    });

    let pipeline: Arc<dyn Pipeline> = match SimPipeline::launch(&plan.description, bus.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("failed to launch pipeline: {e}");
            return ExitCode::from(1);
        }
    };

    let mut driver = Driver {
        options,
        plan,
        pipeline,
        bus,
        proxy,
        shutdown: ShutdownSignal::new(),
        app: None,
        exit_code: 0,
    };

    if let Err(e) = event_loop.run_app(&mut driver) {
        log::error!("event loop error: {e}");
        return ExitCode::from(1);
    }

    // Terminal state before leaving, whatever the exit path was.
    driver.pipeline.set_state(PipelineState::Null);
    ExitCode::from(driver.exit_code)
}
