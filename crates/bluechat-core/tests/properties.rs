//! Property-based tests for the directory and the frame path

use bluechat_core::{
    DeviceDirectory, DeviceId, MessagePipeline, SessionTransport, SubmitOutcome, LinkRole,
};
use proptest::prelude::*;

fn arb_device_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-F0-9]{2}(:[A-F0-9]{2}){0,2}").unwrap()
}

proptest! {
    /// The directory holds each id once, in first-seen order
    #[test]
    fn prop_directory_dedups_in_first_seen_order(
        sightings in prop::collection::vec((arb_device_id(), prop::option::of("[a-z]{1,8}")), 0..64)
    ) {
        let mut directory = DeviceDirectory::new();
        for (id, name) in &sightings {
            directory.record(DeviceId::new(id.clone()), name.clone());
        }

        let mut expected: Vec<&String> = Vec::new();
        for (id, _) in &sightings {
            if !expected.contains(&id) {
                expected.push(id);
            }
        }
        let actual: Vec<&str> = directory.all().iter().map(|d| d.id.as_str()).collect();
        prop_assert_eq!(actual, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    }

    /// Whatever goes on the wire decodes to exactly the local echo
    #[test]
    fn prop_local_echo_matches_remote_decode(text in "\\PC{0,600}", max in 1usize..=512) {
        let mut sender = MessagePipeline::new();
        let receiver = MessagePipeline::new();
        let mut transport = SessionTransport::new(max);
        transport.open(LinkRole::Peripheral, None);
        transport.mark_ready();

        let SubmitOutcome::Sent { delivery, message } = sender.submit(text.clone(), &mut transport).unwrap() else {
            panic!("ready link should send");
        };
        prop_assert!(delivery.bytes.len() <= max);
        prop_assert!(text.starts_with(message.text()));

        let remote = receiver.on_bytes_received(&delivery.bytes);
        prop_assert_eq!(remote.text(), message.text());
    }
}
