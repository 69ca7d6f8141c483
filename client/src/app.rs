//! Client application: one task owns the controller and runs every command.

use crate::console::{self, Command};
use dispatch_core::{
    ClientConfig, ConfigInput, LayoutConfig, LifecycleController, MapLayoutEngine,
};
use dispatch_env::{DispatchContext, SimulationBackend};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// What the front end should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Show this text and keep going
    Continue(String),
    Quit,
}

pub struct App<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    controller: LifecycleController<Ctx, B>,
    input: ConfigInput,
    engine: MapLayoutEngine,
    fallback_points: u32,
}

impl<Ctx, B> App<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    pub fn new(controller: LifecycleController<Ctx, B>, input: ConfigInput, config: &ClientConfig) -> Self {
        let engine = MapLayoutEngine::new(LayoutConfig {
            max_nodes: config.max_nodes,
            ..LayoutConfig::default()
        });
        Self {
            controller,
            input,
            engine,
            fallback_points: config.fallback_points,
        }
    }

    pub fn controller(&self) -> &LifecycleController<Ctx, B> {
        &self.controller
    }

    fn last_log(&self) -> String {
        self.controller.session().log().latest().unwrap_or_default()
    }

    /// Runs one command to completion.
    ///
    /// Lifecycle outcomes are reported through the session log, so the
    /// returned text for start/stop/restart is simply its latest message.
    pub async fn execute(&mut self, command: Command) -> Outcome {
        let text = match command {
            Command::Set(field, value) => {
                self.input.set(field, value);
                console::render_config(&self.input)
            }
            Command::Config => console::render_config(&self.input),
            Command::Start => {
                if let Err(err) = self.controller.start(&self.input).await {
                    debug!(error = %err, "start not applied");
                }
                self.last_log()
            }
            Command::Stop => {
                if let Err(err) = self.controller.stop().await {
                    debug!(error = %err, "stop not applied");
                }
                self.last_log()
            }
            Command::Restart => {
                if let Err(err) = self.controller.restart(&self.input).await {
                    debug!(error = %err, "restart not applied");
                }
                self.last_log()
            }
            Command::Status => {
                let snapshot = self.controller.snapshot();
                let log = self.controller.session().log().latest();
                console::render_status(self.controller.phase(), log.as_deref(), snapshot.as_deref())
            }
            Command::Map => {
                let snapshot = self.controller.snapshot().unwrap_or_default();
                let points = self.controller.map_points(self.fallback_points) as usize;
                console::render_map(&self.engine.map(&snapshot, points))
            }
            Command::Summary => match self.controller.fetch_summary().await {
                Ok(summary) => console::render_summary(&summary),
                Err(_) => self.last_log(),
            },
            Command::Help => console::HELP.to_string(),
            Command::Quit => {
                self.shutdown();
                return Outcome::Quit;
            }
        };
        Outcome::Continue(text)
    }

    /// Stops local polling. The backend simulation is left as it is.
    pub fn shutdown(&mut self) {
        self.controller.teardown();
    }

    #[cfg(feature = "dashboard")]
    pub fn frame(&self) -> dispatch_core::dashboard::DashboardFrame {
        dispatch_core::dashboard::DashboardFrame {
            phase: self.controller.phase(),
            log: self.controller.session().log().latest(),
            snapshot: self.controller.snapshot(),
            map_points: self.controller.map_points(self.fallback_points),
            config_line: console::render_config(&self.input),
        }
    }

    #[cfg(feature = "dashboard")]
    pub fn engine(&self) -> &MapLayoutEngine {
        &self.engine
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run_console<Ctx, B>(mut app: App<Ctx, B>) -> anyhow::Result<()>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"Ambulance dispatch monitor. Type 'help' for commands.\n").await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match console::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };

        match app.execute(command).await {
            Outcome::Continue(text) => stdout.write_all(format!("{text}\n").as_bytes()).await?,
            Outcome::Quit => return Ok(()),
        }
    }

    app.shutdown();
    Ok(())
}

/// Runs the terminal dashboard on its own thread, driving the controller
/// from this task.
#[cfg(feature = "dashboard")]
pub async fn run_dashboard<Ctx, B>(mut app: App<Ctx, B>) -> anyhow::Result<()>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    use dispatch_core::dashboard::{DashboardCommand, StatusDashboard};
    use std::time::Duration;

    let (frame_tx, frame_rx) = crossbeam::channel::unbounded();
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let engine = app.engine().clone();
    let ui = std::thread::spawn(move || StatusDashboard::new(frame_rx, command_tx, engine).run());

    let mut refresh = tokio::time::interval(Duration::from_millis(100));
    'outer: loop {
        refresh.tick().await;

        while let Ok(command) = command_rx.try_recv() {
            let command = match command {
                DashboardCommand::Start => Command::Start,
                DashboardCommand::Stop => Command::Stop,
                DashboardCommand::Restart => Command::Restart,
                DashboardCommand::Quit => Command::Quit,
            };
            if app.execute(command).await == Outcome::Quit {
                break 'outer;
            }
        }

        // Fails once the UI thread has exited
        if frame_tx.send(app.frame()).is_err() {
            break;
        }
    }

    app.shutdown();
    drop(frame_tx);
    match ui.join() {
        Ok(result) => Ok(result?),
        Err(_) => anyhow::bail!("dashboard thread panicked"),
    }
}
