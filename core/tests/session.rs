use ndef_hce::apdu::{Command, Response, StatusWord};
use ndef_hce::ndef::{self, Message};
use ndef_hce::nfc::{ApduService, DeactivationReason};
use ndef_hce::reader::Reader;
use ndef_hce::{Card, Profile, Selection};

fn transmit(card: &mut Card, command: Command) -> Response {
    Response::from_bytes(card.process((), &command.into_bytes().unwrap()))
}

#[test]
fn test_phone_reads_uri() {
    let mut card = Card::default();
    let message = Reader::new(&mut card).read_message(()).unwrap();

    assert_eq!(1, message.records.len());
    assert_eq!(
        "https://www.google.co.jp/",
        message.records[0].to_uri().unwrap()
    );
    assert_eq!(Selection::NdefFileSelected, card.selection());
}

#[test]
fn test_sessions_are_independent() {
    let mut card = Card::default();

    Reader::new(&mut card).read_ndef(()).unwrap();
    card.deactivate((), DeactivationReason::LinkLoss);
    assert_eq!(Selection::None, card.selection());

    // A read right after deactivation is the degenerate default, not a rejection
    let response = transmit(&mut card, Command::read_binary(0, 0x12));
    assert_eq!(StatusWord::SUCCESS, response.trailer());
    assert!(response.payload().is_empty());

    let message = Reader::new(&mut card).read_ndef(()).unwrap();
    assert_eq!(ndef::DEFAULT_MESSAGE.to_vec(), message);
}

#[test]
fn test_length_then_body() {
    let mut card = Card::default();

    transmit(&mut card, Command::select_file(0x00, 0x0C, vec![0xE1, 0x04]));

    let length = transmit(&mut card, Command::read_binary(0, 2));
    assert_eq!(&[0x00, 0x12], length.payload());

    for _ in 0..3 {
        let body = transmit(&mut card, Command::read_binary(2, 0x12));
        assert!(body.is_ok());

        let message = Message::parse(body.payload()).unwrap();
        assert_eq!(
            "https://www.google.co.jp/",
            message.records[0].to_uri().unwrap()
        );
    }
}

#[test]
fn test_rejections_are_file_not_found() {
    let mut card = Card::default();

    transmit(&mut card, Command::select_file(0x00, 0x0C, vec![0xE1, 0x03]));

    let response = transmit(&mut card, Command::read_binary(0, 2));
    assert_eq!(StatusWord::FILE_NOT_FOUND, response.trailer());

    // UPDATE BINARY is not supported, whatever is selected
    let response = transmit(
        &mut card,
        Command::new_with_payload(0x00, 0xD6, 0x00, 0x00, vec![0x00, 0x00]),
    );
    assert_eq!(StatusWord::FILE_NOT_FOUND, response.trailer());
    assert_eq!(Selection::CapabilityContainerSelected, card.selection());
}

#[test]
fn test_custom_uri() {
    let mut card = Card::new(Profile::default().with_uri("https://example.com/tag").unwrap());
    let message = Reader::new(&mut card).read_message(()).unwrap();

    assert_eq!(
        "https://example.com/tag",
        message.records[0].to_uri().unwrap()
    );
}

#[test]
fn test_unsupported_instructions_on_fresh_card() {
    let mut card = Card::default();

    for command in [
        Command::new(0x00, 0xCA, 0x00, 0x00),
        Command::new_with_le(0x00, 0xC0, 0x00, 0x00, 0x10),
        Command::new_with_payload(0x00, 0xD6, 0x00, 0x00, vec![0xE1, 0x04]),
    ] {
        let response = transmit(&mut card, command);
        assert_eq!(StatusWord::FILE_NOT_FOUND, response.trailer());
        assert!(response.payload().is_empty());
        assert_eq!(Selection::None, card.selection());
    }
}

#[test]
fn test_uri_too_long_for_tag() {
    let uri = format!("https://example.com/{}", "a".repeat(70000));

    assert!(matches!(
        Profile::default().with_uri(uri),
        Err(ndef_hce::profile::Error::MessageTooLong(70020))
    ));
}
