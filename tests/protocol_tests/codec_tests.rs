//! Codec Tests
//!
//! Tests for envelope encoding/decoding against the command catalog.

use agora::protocol::{
    decode, encode, Annonce, AnnonceFromDomain, AnnonceFromDomainOk, CreateAnnonce,
    CreateAnnonceOk, Domain, DomainsListOk, ErrorLogMessage, Failure, KeyExchange,
    KeyExchangeOk, NoParams, ProtocolCommand, RemoveAnnonce, Request, RequestUdpCoordinates,
    SignIn, SignInOk, SignUp, UdpCoordinate, UdpCoordinatesOk, UdpServer, UpdateAnnonce,
};
use agora::AgoraError;
use serde_json::{json, Value};

fn annonce(id: i64) -> Annonce {
    Annonce {
        domain: Domain::new("Vehicles"),
        title: format!("Bike {}", id),
        descriptif: "Barely used".to_string(),
        price: 120,
        id,
        owner: "alice@agora.test".to_string(),
    }
}

/// One representative envelope per command
fn every_command() -> Vec<Request> {
    let ko = |error| Failure::from(error);
    vec![
        Request::KeyExchange(KeyExchange {
            public_key: vec![0x30, 0x82, 0x01, 0x22],
            iv: vec![7u8; 16],
        }),
        Request::KeyExchangeOk(KeyExchangeOk {
            public_key: vec![0x30, 0x81],
            session_key: vec![0xAB; 128],
        }),
        Request::KeyExchangeKo(ko(ErrorLogMessage::HandshakeFailed)),
        Request::SignUp(SignUp {
            mail: "alice@agora.test".to_string(),
            name: "Alice".to_string(),
            pwd: "s3cret".to_string(),
        }),
        Request::SignUpOk(NoParams {}),
        Request::SignUpKo(ko(ErrorLogMessage::MailAlreadyTaken)),
        Request::SignIn(SignIn {
            mail: "alice@agora.test".to_string(),
            pwd: "s3cret".to_string(),
            send_domain_list: true,
        }),
        Request::SignInOk(SignInOk {
            name: "Alice".to_string(),
        }),
        Request::SignInKo(ko(ErrorLogMessage::InvalidCredentials)),
        Request::SignOut(NoParams {}),
        Request::SignOutOk(NoParams {}),
        Request::DomainsList(NoParams {}),
        Request::DomainsListOk(DomainsListOk {
            domains: vec![Domain::new("Vehicles"), Domain::new("Housing")],
        }),
        Request::CreateAnnonce(CreateAnnonce {
            domain: Domain::new("Vehicles"),
            title: "Bike".to_string(),
            descriptif: "Barely used".to_string(),
            price: 120,
        }),
        Request::CreateAnnonceOk(CreateAnnonceOk { id: 42 }),
        Request::CreateAnnonceKo(ko(ErrorLogMessage::UnknownDomain)),
        Request::UpdateAnnonce(UpdateAnnonce {
            title: "Bike".to_string(),
            descriptif: "Now with a bell".to_string(),
            price: 100,
            id: 42,
        }),
        Request::UpdateAnnonceOk(NoParams {}),
        Request::UpdateAnnonceKo(ko(ErrorLogMessage::NotOwner)),
        Request::RemoveAnnonce(RemoveAnnonce { id: 42 }),
        Request::RemoveAnnonceOk(NoParams {}),
        Request::RemoveAnnonceKo(ko(ErrorLogMessage::AnnonceNotFound)),
        Request::AnnonceFromDomain(AnnonceFromDomain {
            domain: Domain::new("Vehicles"),
        }),
        Request::AnnonceFromDomainOk(AnnonceFromDomainOk {
            annonces_from_domain: vec![annonce(1), annonce(2)],
        }),
        Request::AnnonceFromDomainKo(ko(ErrorLogMessage::EmptyDomain)),
        Request::UdpServer(UdpServer {
            address: "192.168.1.10".to_string(),
            port: 51820,
        }),
        Request::UdpServerOk(NoParams {}),
        Request::UdpServerKo(ko(ErrorLogMessage::InvalidAddress)),
        Request::RequestUdpCoordinates(RequestUdpCoordinates {
            mail: "bob@agora.test".to_string(),
        }),
        Request::RequestUdpCoordinatesOk(UdpCoordinatesOk {
            mail: "bob@agora.test".to_string(),
            coord: UdpCoordinate {
                addr: "192.168.1.10".to_string(),
                port: 51820,
            },
        }),
        Request::RequestUdpCoordinatesKo(ko(ErrorLogMessage::UnknownUser)),
    ]
}

fn to_json(request: &Request) -> Value {
    serde_json::from_slice(&encode(request).unwrap()).unwrap()
}

fn decode_json(value: Value) -> agora::Result<Request> {
    decode(&serde_json::to_vec(&value).unwrap())
}

fn assert_malformed(result: agora::Result<Request>, expected: ProtocolCommand) {
    match result {
        Err(AgoraError::MalformedPayload { command, .. }) => assert_eq!(command, Some(expected)),
        other => panic!("Expected MalformedPayload for {}, got {:?}", expected, other),
    }
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_every_command_round_trips() {
    let requests = every_command();
    assert_eq!(requests.len(), ProtocolCommand::ALL.len());

    for request in requests {
        let decoded = decode(&encode(&request).unwrap()).unwrap();
        assert_eq!(decoded, request);
    }
}

#[test]
fn test_envelope_shape() {
    let value = to_json(&Request::SignIn(SignIn {
        mail: "a@b.com".to_string(),
        pwd: "x".to_string(),
        send_domain_list: false,
    }));

    assert_eq!(
        value,
        json!({
            "command": "SIGN_IN",
            "param": { "Mail": "a@b.com", "Pwd": "x", "SendDomainList": false }
        })
    );
}

#[test]
fn test_zero_field_command_encodes_empty_param() {
    let value = to_json(&Request::SignOut(NoParams {}));
    assert_eq!(value, json!({ "command": "SIGN_OUT", "param": {} }));
}

#[test]
fn test_ko_carries_error_text() {
    let value = to_json(&Request::SignUpKo(Failure::from(ErrorLogMessage::MailAlreadyTaken)));
    assert_eq!(value["param"]["Error"], json!(ErrorLogMessage::MailAlreadyTaken.message()));
}

#[test]
fn test_bytes_are_base64() {
    let value = to_json(&Request::KeyExchange(KeyExchange {
        public_key: b"key".to_vec(),
        iv: vec![0u8; 16],
    }));
    assert_eq!(value["param"]["PublicKey"], json!("a2V5"));
    assert_eq!(value["param"]["IV"], json!("AAAAAAAAAAAAAAAAAAAAAA=="));
}

#[test]
fn test_annonce_objects_use_lowercase_fields() {
    let value = to_json(&Request::AnnonceFromDomainOk(AnnonceFromDomainOk {
        annonces_from_domain: vec![annonce(3)],
    }));
    let first = &value["param"]["AnnoncesFromDomain"][0];
    assert_eq!(first["domain"], json!("Vehicles"));
    assert_eq!(first["id"], json!(3));
    assert_eq!(first["owner"], json!("alice@agora.test"));
}

// =============================================================================
// Decoding Edge Cases
// =============================================================================

#[test]
fn test_unknown_command() {
    let result = decode_json(json!({ "command": "BUY_EVERYTHING", "param": {} }));
    match result {
        Err(AgoraError::UnknownCommand(name)) => assert_eq!(name, "BUY_EVERYTHING"),
        other => panic!("Expected UnknownCommand, got {:?}", other),
    }
}

#[test]
fn test_missing_command() {
    let result = decode_json(json!({ "param": {} }));
    assert!(matches!(
        result,
        Err(AgoraError::MalformedPayload { command: None, .. })
    ));
}

#[test]
fn test_invalid_json() {
    let result = decode(b"{\"command\": ");
    assert!(matches!(
        result,
        Err(AgoraError::MalformedPayload { command: None, .. })
    ));
}

#[test]
fn test_envelope_not_an_object() {
    let result = decode_json(json!(["SIGN_IN"]));
    assert!(matches!(
        result,
        Err(AgoraError::MalformedPayload { command: None, .. })
    ));
}

#[test]
fn test_missing_field_is_never_defaulted() {
    // SendDomainList absent must not become false
    let result = decode_json(json!({
        "command": "SIGN_IN",
        "param": { "Mail": "a@b.com", "Pwd": "x" }
    }));
    assert_malformed(result, ProtocolCommand::SignIn);
}

#[test]
fn test_wrong_field_type() {
    let result = decode_json(json!({
        "command": "CREATE_ANNONCE",
        "param": { "Domain": "Vehicles", "Title": "Bike", "Descriptif": "", "Price": "cheap" }
    }));
    assert_malformed(result, ProtocolCommand::CreateAnnonce);
}

#[test]
fn test_port_out_of_range() {
    let result = decode_json(json!({
        "command": "UDP_SERVER",
        "param": { "Address": "10.0.0.1", "Port": 70000 }
    }));
    assert_malformed(result, ProtocolCommand::UdpServer);
}

#[test]
fn test_unknown_error_text() {
    let result = decode_json(json!({
        "command": "SIGN_UP_KO",
        "param": { "Error": "Something went wrong" }
    }));
    assert_malformed(result, ProtocolCommand::SignUpKo);
}

#[test]
fn test_invalid_base64() {
    let result = decode_json(json!({
        "command": "REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_AND_SEND_IV",
        "param": { "PublicKey": "not base64!", "IV": "AAAA" }
    }));
    assert_malformed(result, ProtocolCommand::KeyExchange);
}

#[test]
fn test_param_not_an_object() {
    let result = decode_json(json!({ "command": "SIGN_OUT", "param": "nothing" }));
    assert_malformed(result, ProtocolCommand::SignOut);
}

#[test]
fn test_zero_field_command_without_param() {
    let absent = decode_json(json!({ "command": "DOMAINS_LIST" })).unwrap();
    let null = decode_json(json!({ "command": "DOMAINS_LIST", "param": null })).unwrap();
    assert_eq!(absent, Request::DomainsList(NoParams {}));
    assert_eq!(null, Request::DomainsList(NoParams {}));
}

#[test]
fn test_empty_array_differs_from_absent_array() {
    let empty = decode_json(json!({
        "command": "DOMAINS_LIST_OK",
        "param": { "Domains": [] }
    }))
    .unwrap();
    assert_eq!(empty, Request::DomainsListOk(DomainsListOk { domains: vec![] }));

    let absent = decode_json(json!({ "command": "DOMAINS_LIST_OK", "param": {} }));
    assert_malformed(absent, ProtocolCommand::DomainsListOk);
}

#[test]
fn test_malformed_annonce_element() {
    let result = decode_json(json!({
        "command": "ANNONCE_FROM_DOMAIN_OK",
        "param": { "AnnoncesFromDomain": [ { "domain": "Vehicles", "title": "Bike" } ] }
    }));
    assert_malformed(result, ProtocolCommand::AnnonceFromDomainOk);
}

#[test]
fn test_undeclared_fields_are_ignored() {
    let decoded = decode_json(json!({
        "command": "REMOVE_ANNONCE",
        "param": { "Id": 9, "Force": true },
        "extra": 1
    }))
    .unwrap();
    assert_eq!(decoded, Request::RemoveAnnonce(RemoveAnnonce { id: 9 }));
}

#[test]
fn test_negative_price_is_well_formed() {
    // Price validation is the marketplace's job, not the codec's
    let decoded = decode_json(json!({
        "command": "CREATE_ANNONCE",
        "param": { "Domain": "Jobs", "Title": "Help", "Descriptif": "", "Price": -1 }
    }))
    .unwrap();
    match decoded {
        Request::CreateAnnonce(request) => assert_eq!(request.price, -1),
        other => panic!("Expected CREATE_ANNONCE, got {:?}", other),
    }
}
