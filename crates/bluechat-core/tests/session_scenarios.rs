//! End-to-end scenarios between two sessions
//!
//! A tiny in-test "air" turns the effects of one session into the events the
//! other would observe, so the full scan / advertise / connect / chat cycle can
//! be exercised without a radio.

use std::collections::VecDeque;

use bluechat_core::{
    AppEvent, ChatSession, Command, DeviceId, Effect, Event, LinkRole, Message, Provenance,
    SessionConfig, SessionRole,
};

// ----------------------------------------------------------------------------
// Test Harness
// ----------------------------------------------------------------------------

#[derive(Default, Clone, Copy, PartialEq)]
struct Radio {
    scanning: bool,
    advertising: bool,
}

struct Endpoint {
    id: DeviceId,
    session: ChatSession,
    radio: Radio,
    published: Vec<Message>,
    roles: Vec<SessionRole>,
}

impl Endpoint {
    fn new(id: &str) -> Self {
        Self {
            id: DeviceId::new(id),
            session: ChatSession::new(SessionConfig::default()),
            radio: Radio::default(),
            published: Vec::new(),
            roles: Vec::new(),
        }
    }

    fn texts(&self, provenance: Provenance) -> Vec<&str> {
        self.published
            .iter()
            .filter(|m| m.provenance() == provenance)
            .map(Message::text)
            .collect()
    }
}

struct Air {
    peers: [Endpoint; 2],
    queue: VecDeque<(usize, Event)>,
}

impl Air {
    fn new() -> Self {
        Self {
            peers: [Endpoint::new("alice"), Endpoint::new("bob")],
            queue: VecDeque::new(),
        }
    }

    fn command(&mut self, who: usize, command: Command) {
        let reaction = self.peers[who].session.execute(command).unwrap();
        self.absorb(who, reaction.effects, reaction.app_events);
        self.settle();
    }

    fn inject(&mut self, who: usize, event: Event) {
        self.queue.push_back((who, event));
        self.settle();
    }

    fn settle(&mut self) {
        let mut steps = 0;
        while let Some((who, event)) = self.queue.pop_front() {
            steps += 1;
            assert!(steps < 100, "event storm");
            let reaction = self.peers[who].session.handle(event);
            self.absorb(who, reaction.effects, reaction.app_events);
        }
    }

    fn absorb(&mut self, who: usize, effects: Vec<Effect>, app_events: Vec<AppEvent>) {
        for event in app_events {
            match event {
                AppEvent::MessagePublished(m) => self.peers[who].published.push(m),
                AppEvent::RoleChanged { to, .. } => self.peers[who].roles.push(to),
                _ => {}
            }
        }
        let other = 1 - who;
        for effect in effects {
            match effect {
                Effect::BeginScanning => {
                    self.peers[who].radio = Radio {
                        scanning: true,
                        advertising: false,
                    };
                    if self.peers[other].radio.advertising {
                        self.discovered_by(who);
                    }
                }
                Effect::BeginAdvertising => {
                    self.peers[who].radio = Radio {
                        scanning: false,
                        advertising: true,
                    };
                    if self.peers[other].radio.scanning {
                        self.discovered_by(other);
                    }
                }
                Effect::ConnectTo { .. } => {
                    self.peers[who].radio.scanning = false;
                    self.peers[other].radio.advertising = false;
                    self.queue.push_back((
                        who,
                        Event::LinkEstablished {
                            role: LinkRole::Central,
                        },
                    ));
                    self.queue.push_back((other, Event::SubscriberAttached));
                }
                Effect::WriteBytes { bytes } => {
                    self.queue.push_back((other, Event::DataReceived { bytes }));
                }
                Effect::ReleaseLink => {
                    self.queue.push_back((
                        other,
                        Event::LinkLost {
                            reason: "remote released".into(),
                        },
                    ));
                }
                Effect::Stop => self.peers[who].radio = Radio::default(),
            }
        }
    }

    fn discovered_by(&mut self, scanner: usize) {
        let advertiser = 1 - scanner;
        self.queue.push_back((
            scanner,
            Event::DeviceDiscovered {
                device: self.peers[advertiser].id.clone(),
                name: Some(format!("{}-phone", self.peers[advertiser].id)),
            },
        ));
    }
}

const ALICE: usize = 0;
const BOB: usize = 1;

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[test]
fn test_first_message_forms_session_and_is_delivered() {
    let mut air = Air::new();
    air.command(ALICE, Command::Start);
    air.command(BOB, Command::Start);

    air.command(ALICE, Command::Submit { text: "hi".into() });

    let alice = &air.peers[ALICE];
    let bob = &air.peers[BOB];
    assert_eq!(alice.session.role(), SessionRole::ConnectedAsPeripheral);
    assert_eq!(bob.session.role(), SessionRole::ConnectedAsCentral);
    assert_eq!(alice.texts(Provenance::Local), vec!["hi"]);
    assert_eq!(bob.texts(Provenance::Remote), vec!["hi"]);
    assert!(alice.session.pending_text().is_none());
}

#[test]
fn test_reply_flows_back_over_the_same_link() {
    let mut air = Air::new();
    air.command(ALICE, Command::Start);
    air.command(BOB, Command::Start);
    air.command(ALICE, Command::Submit { text: "hi".into() });

    air.command(BOB, Command::Submit { text: "hey".into() });
    air.command(ALICE, Command::Submit { text: "how are you".into() });

    assert_eq!(air.peers[ALICE].texts(Provenance::Remote), vec!["hey"]);
    assert_eq!(
        air.peers[BOB].texts(Provenance::Remote),
        vec!["hi", "how are you"]
    );
    assert_eq!(air.peers[BOB].session.stats().frames_sent, 1);
}

#[test]
fn test_discovered_advertiser_is_listed_with_name() {
    let mut air = Air::new();
    air.command(BOB, Command::Start);
    air.command(ALICE, Command::Start);
    air.command(ALICE, Command::Submit { text: "hi".into() });

    let directory = air.peers[BOB].session.directory();
    assert_eq!(directory.len(), 1);
    let alice = directory.get(&DeviceId::new("alice")).unwrap();
    assert_eq!(alice.name, "alice-phone");
}

#[test]
fn test_link_loss_returns_both_sides_to_scanning() {
    let mut air = Air::new();
    air.command(ALICE, Command::Start);
    air.command(BOB, Command::Start);
    air.command(ALICE, Command::Submit { text: "hi".into() });

    air.command(BOB, Command::Disconnect);

    assert_eq!(air.peers[ALICE].session.role(), SessionRole::Scanning);
    assert_eq!(air.peers[BOB].session.role(), SessionRole::Scanning);
    assert!(!air.peers[ALICE].session.transport().is_open());
    assert!(!air.peers[BOB].session.transport().is_open());
}

#[test]
fn test_session_can_form_again_after_loss() {
    let mut air = Air::new();
    air.command(ALICE, Command::Start);
    air.command(BOB, Command::Start);
    air.command(ALICE, Command::Submit { text: "hi".into() });
    air.inject(
        ALICE,
        Event::LinkLost {
            reason: "supervision timeout".into(),
        },
    );
    assert_eq!(air.peers[ALICE].session.role(), SessionRole::Scanning);

    // This time bob opens the session
    air.command(BOB, Command::Submit { text: "back".into() });
    assert_eq!(air.peers[BOB].session.role(), SessionRole::ConnectedAsPeripheral);
    assert_eq!(air.peers[ALICE].session.role(), SessionRole::ConnectedAsCentral);
    assert_eq!(air.peers[ALICE].texts(Provenance::Remote), vec!["back"]);
}

#[test]
fn test_roles_walk_the_expected_path() {
    let mut air = Air::new();
    air.command(ALICE, Command::Start);
    air.command(BOB, Command::Start);
    air.command(ALICE, Command::Submit { text: "hi".into() });
    air.command(ALICE, Command::Stop);

    assert_eq!(
        air.peers[ALICE].roles,
        vec![
            SessionRole::Scanning,
            SessionRole::Advertising,
            SessionRole::ConnectedAsPeripheral,
            SessionRole::Idle,
        ]
    );
}
