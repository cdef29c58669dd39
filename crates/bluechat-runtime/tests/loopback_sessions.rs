//! Two full runtimes chatting over the in-memory radio

use std::time::Duration;

use bluechat_runtime::{
    AppEvent, AppEventReceiver, Command, DeviceId, LoopbackAir, Provenance, RuntimeBuilder,
    RuntimeHandle, SessionConfig, SessionRole,
};
use futures::future::join;
use tokio::time::timeout;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

struct Peer {
    handle: RuntimeHandle,
    events: AppEventReceiver,
}

impl Peer {
    async fn send(&self, command: Command) {
        self.handle.send_command(command).await.unwrap();
    }

    /// Wait for the first app event matching `pred`
    async fn until<F>(&mut self, mut pred: F) -> AppEvent
    where
        F: FnMut(&AppEvent) -> bool,
    {
        timeout(Duration::from_secs(2), async {
            loop {
                let event = self.events.recv().await.expect("runtime alive");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("expected app event within timeout")
    }

    async fn message(&mut self, provenance: Provenance) -> String {
        match self
            .until(|e| matches!(e, AppEvent::MessagePublished(m) if m.provenance() == provenance))
            .await
        {
            AppEvent::MessagePublished(m) => m.text().to_string(),
            _ => unreachable!(),
        }
    }

    async fn role(&mut self, role: SessionRole) {
        self.until(|e| matches!(e, AppEvent::RoleChanged { to, .. } if *to == role))
            .await;
    }
}

async fn peer(air: &LoopbackAir, id: &str) -> Peer {
    let radio = air.radio(id, format!("{}'s phone", id)).await;
    let mut handle = RuntimeBuilder::new(SessionConfig::default())
        .with_radio(Box::new(radio))
        .start_immediately(true)
        .build_and_start()
        .await
        .unwrap();
    let events = handle.take_app_event_receiver().unwrap();
    Peer { handle, events }
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_first_message_is_echoed_and_delivered() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    let mut bob = peer(&air, "bob").await;
    alice.role(SessionRole::Scanning).await;
    bob.role(SessionRole::Scanning).await;

    alice.send(Command::Submit { text: "hi".into() }).await;

    let (local, remote) = join(alice.message(Provenance::Local), bob.message(Provenance::Remote)).await;
    assert_eq!(local, "hi");
    assert_eq!(remote, "hi");
}

#[tokio::test]
async fn test_both_directions_after_session_forms() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    let mut bob = peer(&air, "bob").await;
    alice.role(SessionRole::Scanning).await;
    bob.role(SessionRole::Scanning).await;

    alice.send(Command::Submit { text: "hi".into() }).await;
    bob.message(Provenance::Remote).await;

    bob.send(Command::Submit { text: "hey".into() }).await;
    assert_eq!(alice.message(Provenance::Remote).await, "hey");
}

#[tokio::test]
async fn test_discovered_device_is_listed() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    let mut bob = peer(&air, "bob").await;
    bob.role(SessionRole::Scanning).await;
    alice.role(SessionRole::Scanning).await;

    alice.send(Command::Submit { text: "hi".into() }).await;
    let event = bob
        .until(|e| matches!(e, AppEvent::DeviceListChanged(_)))
        .await;
    let AppEvent::DeviceListChanged(devices) = event else {
        unreachable!()
    };
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, DeviceId::new("alice"));
    assert_eq!(devices[0].name, "alice's phone");
}

#[tokio::test]
async fn test_severed_link_returns_both_to_scanning() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    let mut bob = peer(&air, "bob").await;
    alice.role(SessionRole::Scanning).await;
    bob.role(SessionRole::Scanning).await;

    alice.send(Command::Submit { text: "hi".into() }).await;
    alice.role(SessionRole::ConnectedAsPeripheral).await;
    bob.role(SessionRole::ConnectedAsCentral).await;

    assert!(air.sever(&DeviceId::new("alice")).await);
    alice.role(SessionRole::Scanning).await;
    bob.role(SessionRole::Scanning).await;
    assert!(!air.is_linked(&DeviceId::new("bob")).await);
}

#[tokio::test]
async fn test_power_off_keeps_session_passive() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    alice.role(SessionRole::Scanning).await;

    assert!(air.power_off(&DeviceId::new("alice")).await);
    alice.send(Command::Submit { text: "later".into() }).await;
    alice.role(SessionRole::Advertising).await;
    assert!(alice.handle.is_running());
}

#[tokio::test]
async fn test_shutdown_releases_peer() {
    let air = LoopbackAir::new();
    let mut alice = peer(&air, "alice").await;
    let mut bob = peer(&air, "bob").await;
    alice.role(SessionRole::Scanning).await;
    bob.role(SessionRole::Scanning).await;

    alice.send(Command::Submit { text: "hi".into() }).await;
    bob.role(SessionRole::ConnectedAsCentral).await;

    alice.handle.shutdown().await.unwrap();
    assert!(!alice.handle.is_running());
    bob.role(SessionRole::Scanning).await;
}

#[tokio::test]
async fn test_build_without_radio_fails() {
    let result = RuntimeBuilder::new(SessionConfig::default())
        .build_and_start()
        .await;
    assert!(result.is_err());
}
