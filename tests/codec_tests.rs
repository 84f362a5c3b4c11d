use spartan_forwarder::dns::{
    DecodeError, Header, Message, Question, Rcode, ResourceClass, ResourceType,
};

fn sample_message() -> Message {
    Message {
        header: Header {
            id: 0x1234,
            qr: false,
            opcode: 0,
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            z: 0,
            rcode: 0,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        questions: vec![Question {
            labels: vec!["example".to_string(), "com".to_string()],
            qtype: ResourceType::A,
            qclass: ResourceClass::IN,
        }],
    }
}

#[test]
fn encode_then_decode_preserves_header_and_question() {
    let message = sample_message();
    let bytes = message.encode().expect("encode succeeds");
    let decoded = Message::decode(&bytes).expect("decode succeeds");

    assert_eq!(decoded.header.id, message.header.id);
    assert_eq!(decoded.header.rd, message.header.rd);
    assert_eq!(decoded.questions.len(), 1);
    assert_eq!(decoded.questions[0].name(), "example.com");
    assert_eq!(decoded.questions[0].qtype, ResourceType::A);
}

#[test]
fn to_servfail_preserves_id_and_question_but_sets_rcode() {
    let message = sample_message();
    let servfail = message.to_servfail();

    assert_eq!(servfail.header.id, message.header.id);
    assert_eq!(servfail.header.rcode, Rcode::SERVER_FAILURE);
    assert!(servfail.header.qr);
    assert_eq!(servfail.header.ancount, 0);
    assert_eq!(servfail.questions, message.questions);
}

#[test]
fn servfail_round_trips_through_encode_and_decode() {
    let message = sample_message();
    let servfail = message.to_servfail();
    let bytes = servfail.encode().expect("encode succeeds");
    let redecoded = Message::decode(&bytes).expect("decode succeeds");

    assert_eq!(redecoded.header.rcode, Rcode::SERVER_FAILURE);
    assert_eq!(redecoded.questions, servfail.questions);
}

#[test]
fn decode_truncated_buffer_fails() {
    let too_short = [0u8; 4];
    assert!(Message::decode(&too_short).is_err());
}

#[test]
fn decode_follows_compression_pointer_to_an_earlier_name() {
    let mut buf = Vec::new();
    // header: id=0x4242, RD=1, qdcount=2
    buf.extend_from_slice(&[0x42, 0x42, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    // question 1, offset 12: "example.com" A IN, spelled out in full.
    buf.push(7);
    buf.extend_from_slice(b"example");
    buf.push(3);
    buf.extend_from_slice(b"com");
    buf.push(0);
    buf.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

    // question 2, offset 29: a compression pointer back to offset 12 (the
    // start of "example.com"'s label sequence), same A IN.
    buf.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);

    let message = Message::decode(&buf).expect("decode succeeds");
    assert_eq!(message.questions.len(), 2);
    assert_eq!(message.questions[0].name(), "example.com");
    assert_eq!(message.questions[1].name(), "example.com");
    assert_eq!(message.questions[1].qtype, ResourceType::A);
}

#[test]
fn decode_rejects_a_self_referencing_compression_pointer() {
    let mut buf = vec![0u8; 12];
    buf[4] = 0;
    buf[5] = 1; // qdcount = 1
    // A pointer at offset 12 that points right back at offset 12: every
    // jump lands on the same two bytes, forever, short of the guard.
    buf.extend_from_slice(&[0xC0, 0x0C]);

    let result = Message::decode(&buf);
    assert!(matches!(result, Err(DecodeError::LabelLoop)));
}

#[test]
fn decode_rejects_oversized_label() {
    // A length byte of 64 is not a valid plain label (max 63) nor a
    // compression pointer prefix (0xC0..).
    let mut buf = vec![0u8; 12]; // header, with qdcount set to 1 below
    buf[4] = 0;
    buf[5] = 1;
    buf.push(64);
    let result = Message::decode(&buf);
    assert!(result.is_err());
}
