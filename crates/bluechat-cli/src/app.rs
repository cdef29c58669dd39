//! Terminal front end for a chat session
//!
//! [`BluechatApp`] owns a running session and turns its app events into
//! printed lines. It is the UI collaborator: it submits text and connect
//! intents and never touches the radio directly.

use std::time::Duration;

use bluechat_ble::BleRadioTask;
use bluechat_core::{AppEvent, Command, Device, DeviceId, Message, Provenance, SessionRole};
use bluechat_runtime::{AppEventReceiver, RadioTask, RuntimeBuilder, RuntimeHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::config::{AppConfig, CliConfig};
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Input Parsing
// ----------------------------------------------------------------------------

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    Peers,
    /// Device id, or 1-based index into the last printed device list
    Connect(String),
    Disconnect,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "peers" | "devices" => ChatInput::Peers,
        "connect" if !arg.is_empty() => ChatInput::Connect(arg.to_string()),
        "disconnect" => ChatInput::Disconnect,
        "help" | "?" => ChatInput::Help,
        "quit" | "exit" => ChatInput::Quit,
        _ => ChatInput::Unknown(line.to_string()),
    }
}

/// Resolve a `/connect` argument against the known devices
pub fn resolve_target(arg: &str, devices: &[Device]) -> Option<DeviceId> {
    if let Ok(index) = arg.parse::<usize>() {
        if let Some(device) = index.checked_sub(1).and_then(|i| devices.get(i)) {
            return Some(device.id.clone());
        }
    }
    devices
        .iter()
        .find(|d| d.id.as_str() == arg || d.name == arg)
        .map(|d| d.id.clone())
}

pub const HELP: &str = "\
Type a line and press enter to send it.
  /peers             list nearby devices
  /connect <n|id>    connect only to this device
  /disconnect        drop the current link
  /quit              leave";

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

pub fn render_message(message: &Message) -> String {
    match message.provenance() {
        Provenance::Local => format!("me> {}", message.text()),
        Provenance::Remote => format!("peer> {}", message.text()),
    }
}

pub fn render_devices(devices: &[Device]) -> String {
    if devices.is_empty() {
        return "no devices found yet".to_string();
    }
    devices
        .iter()
        .enumerate()
        .map(|(i, d)| format!("  {}. {} [{}]", i + 1, d.name, d.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line to print for an app event, if any
pub fn render_event(event: &AppEvent, cli: &CliConfig) -> Option<String> {
    match event {
        AppEvent::MessagePublished(message) => Some(render_message(message)),
        AppEvent::DeviceListChanged(devices) if cli.show_devices => {
            Some(format!("devices:\n{}", render_devices(devices)))
        }
        AppEvent::RoleChanged { to, .. } if cli.show_roles => Some(format!("* {}", describe_role(*to))),
        AppEvent::SendFailed { text, reason } => Some(match text {
            Some(text) => format!("! not sent {:?}: {}", text, reason),
            None => format!("! send failed: {}", reason),
        }),
        _ => None,
    }
}

fn describe_role(role: SessionRole) -> &'static str {
    match role {
        SessionRole::Idle => "stopped",
        SessionRole::Scanning => "looking for peers",
        SessionRole::Advertising => "waiting for a peer to connect",
        SessionRole::ConnectedAsCentral => "connected (central)",
        SessionRole::ConnectedAsPeripheral => "connected (peripheral)",
    }
}

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

pub struct BluechatApp {
    config: AppConfig,
    runtime: RuntimeHandle,
    events: AppEventReceiver,
    devices: Vec<Device>,
    role: SessionRole,
}

impl BluechatApp {
    /// Start a session on the BLE radio
    pub async fn start_ble(config: AppConfig) -> Result<Self> {
        let radio = BleRadioTask::new(config.ble.clone());
        Self::start(config, Box::new(radio)).await
    }

    /// Start a session on any radio
    pub async fn start(config: AppConfig, radio: Box<dyn RadioTask>) -> Result<Self> {
        config.validate()?;
        let mut runtime = RuntimeBuilder::new(config.session.clone())
            .with_runtime_config(config.runtime.clone())
            .with_radio(radio)
            .start_immediately(true)
            .build_and_start()
            .await?;
        let events = runtime
            .take_app_event_receiver()
            .ok_or(CliError::RuntimeStopped)?;

        Ok(Self {
            config,
            runtime,
            events,
            devices: Vec::new(),
            role: SessionRole::Idle,
        })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.runtime
            .send_command(Command::Submit { text: text.into() })
            .await?;
        Ok(())
    }

    pub async fn connect_to(&self, device: DeviceId) -> Result<()> {
        self.runtime.send_command(Command::ConnectTo { device }).await?;
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.runtime.send_command(Command::Disconnect).await?;
        Ok(())
    }

    /// Next app event, with the cached device list and role kept current
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        let event = self.events.recv().await?;
        match &event {
            AppEvent::DeviceListChanged(devices) => self.devices = devices.clone(),
            AppEvent::RoleChanged { to, .. } => self.role = *to,
            _ => {}
        }
        Some(event)
    }

    /// Wait until `matches` accepts an event
    pub async fn wait_for<F>(&mut self, timeout: Duration, mut matches: F) -> Result<AppEvent>
    where
        F: FnMut(&AppEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let event = tokio::time::timeout_at(deadline, self.next_event())
                .await
                .map_err(|_| CliError::Timeout(format!("nothing after {:?}", timeout)))?
                .ok_or(CliError::RuntimeStopped)?;
            debug!("App event: {:?}", event);
            if matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Submit `text` and wait for the local echo that marks it written.
    ///
    /// The echo is optimistic, so a radio failure reported within the
    /// configured grace period still fails the send.
    pub async fn send_once(&mut self, text: &str, timeout: Duration) -> Result<Message> {
        self.submit(text).await?;
        let event = self
            .wait_for(timeout, |event| match event {
                AppEvent::MessagePublished(m) => m.provenance() == Provenance::Local,
                AppEvent::SendFailed { .. } => true,
                _ => false,
            })
            .await?;
        let message = match event {
            AppEvent::MessagePublished(message) => message,
            AppEvent::SendFailed { reason, .. } => return Err(CliError::SendFailed(reason)),
            other => return Err(CliError::SendFailed(format!("unexpected event {:?}", other))),
        };

        let grace = Duration::from_millis(self.config.cli.delivery_grace_ms);
        match self
            .wait_for(grace, |event| matches!(event, AppEvent::SendFailed { .. }))
            .await
        {
            Ok(AppEvent::SendFailed { reason, .. }) => Err(CliError::SendFailed(reason)),
            Ok(_) | Err(CliError::Timeout(_)) => Ok(message),
            Err(e) => Err(e),
        }
    }

    /// Scan for `duration` and return every device seen
    pub async fn scan_for(&mut self, duration: Duration) -> Result<Vec<Device>> {
        let deadline = tokio::time::Instant::now() + duration;
        while let Ok(event) = tokio::time::timeout_at(deadline, self.next_event()).await {
            if event.is_none() {
                return Err(CliError::RuntimeStopped);
            }
        }
        Ok(self.devices.clone())
    }

    /// Interactive loop over stdin until `/quit` or end of input
    pub async fn chat(&mut self) -> Result<()> {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed");
                        return Ok(());
                    };
                    if !self.handle_input(parse_input(&line)).await? {
                        return Ok(());
                    }
                }
                event = self.next_event() => {
                    let Some(event) = event else {
                        return Err(CliError::RuntimeStopped);
                    };
                    if let Some(line) = render_event(&event, &self.config.cli) {
                        println!("{}", line);
                    }
                }
            }
        }
    }

    /// Returns false when the user asked to leave
    async fn handle_input(&mut self, input: ChatInput) -> Result<bool> {
        match input {
            ChatInput::Message(text) => self.submit(text).await?,
            ChatInput::Peers => println!("{}", render_devices(&self.devices)),
            ChatInput::Connect(arg) => match resolve_target(&arg, &self.devices) {
                Some(device) => {
                    println!("* will connect to {}", device);
                    self.connect_to(device).await?;
                }
                None => println!("! no such device: {}", arg),
            },
            ChatInput::Disconnect => self.disconnect().await?,
            ChatInput::Help => println!("{}", HELP),
            ChatInput::Quit => return Ok(false),
            ChatInput::Unknown(line) => println!("! unknown command {} (try /help)", line),
            ChatInput::Empty => {}
        }
        Ok(true)
    }

    /// Stop the session and release the radio
    pub async fn shutdown(mut self) -> Result<()> {
        self.runtime.shutdown().await?;
        Ok(())
    }
}
