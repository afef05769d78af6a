//! Compose-then-parse tests for the full message pipeline.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use mailwire_mime::transparency::{TERMINATOR, dot_unstuff};
use mailwire_mime::{Attachment, Body, Composer, Draft, Mailbox, Message};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn composer(seed: u64) -> Composer<StdRng> {
    let date = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
    Composer::new(StdRng::seed_from_u64(seed)).with_date(date)
}

fn draft(subject: &str, body: Body) -> Draft {
    Draft::new(
        Mailbox::with_name("Jörg Schmidt", "jorg@example.com").unwrap(),
        vec![
            Mailbox::new("a@example.com").unwrap(),
            Mailbox::with_name("B", "b@example.org").unwrap(),
        ],
        subject,
        body,
    )
}

#[test]
fn plain_text_round_trip() {
    let message = composer(1).render_message(&draft("Hello", Body::Text("Hello World".into())));
    let parsed = Message::parse(message.as_bytes()).unwrap();

    assert_eq!(parsed.text().unwrap().as_deref(), Some("Hello World"));
    assert_eq!(parsed.subject().as_deref(), Some("Hello"));
    assert_eq!(
        parsed.header("from").as_deref(),
        Some("Jörg Schmidt <jorg@example.com>")
    );
    assert_eq!(
        parsed.header("to").as_deref(),
        Some("a@example.com, \"B\" <b@example.org>")
    );
}

#[test]
fn non_ascii_subject_round_trip() {
    let subject = "订单确认 - Order #12345 ?=_";
    let message = composer(1).render_message(&draft(subject, Body::Text("x".into())));
    let parsed = Message::parse(message.as_bytes()).unwrap();
    assert_eq!(parsed.subject().as_deref(), Some(subject));
}

#[test]
fn alternative_round_trip() {
    let text = "Línea uno\r\nLine two\r\n";
    let html = "<p>Grüße</p>";
    let message = composer(2).render_message(&draft(
        "Both",
        Body::Alternative {
            text: text.into(),
            html: html.into(),
        },
    ));
    let parsed = Message::parse(message.as_bytes()).unwrap();

    assert_eq!(parsed.text().unwrap().as_deref(), Some(text));
    assert_eq!(parsed.html().unwrap().as_deref(), Some(html));
    assert!(parsed.attachments().is_empty());
}

#[test]
fn long_lines_are_wrapped_without_changing_content() {
    let sentence = "The quick brown fox jumps over the lazy dog. Ok ";
    assert_eq!(sentence.len(), 48);
    let long = sentence.repeat(50);

    let message = composer(3).render_message(&draft(
        "Long",
        Body::Alternative {
            text: long.clone(),
            html: format!("<p>{long}</p>"),
        },
    ));

    let longest = message.split("\r\n").map(str::len).max().unwrap();
    assert!(longest <= 998, "longest line is {longest}");
    assert!(longest <= 78, "longest line is {longest}");

    let parsed = Message::parse(message.as_bytes()).unwrap();
    assert_eq!(parsed.text().unwrap(), Some(long.clone()));
    assert_eq!(parsed.html().unwrap(), Some(format!("<p>{long}</p>")));
}

#[test]
fn dot_stuffed_payload() {
    let body = ".\r\nLine two\r\n.Line three\r\n..Line four";
    let payload = composer(4).render(&draft("Dots", Body::Text(body.into())));
    let text = String::from_utf8(payload.clone()).unwrap();

    assert!(text.ends_with("\r\n.\r\n"));
    let before_terminator = &text[..text.len() - TERMINATOR.len()];
    assert!(!before_terminator.contains("\r\n.\r\n"));
    assert!(text.contains("\r\n..\r\nLine two\r\n..Line three\r\n...Line four\r\n"));

    let unstuffed = dot_unstuff(&payload);
    let parsed = Message::parse(&unstuffed).unwrap();
    assert_eq!(
        parsed.text().unwrap().map(|t| t.trim_end().to_string()).as_deref(),
        Some(body)
    );
}

#[test]
fn same_seed_is_byte_identical() {
    let draft = draft(
        "Same",
        Body::Alternative {
            text: "t".into(),
            html: "h".into(),
        },
    );
    assert_eq!(
        composer(9).render_message(&draft),
        composer(9).render_message(&draft)
    );
}

#[test]
fn different_seeds_keep_semantic_content() {
    let mut draft = draft(
        "Same",
        Body::Alternative {
            text: "t".into(),
            html: "h".into(),
        },
    );
    draft
        .attachments
        .push(Attachment::new("notes.txt", "some notes"));

    let first = Message::parse(composer(10).render_message(&draft).as_bytes()).unwrap();
    let second = Message::parse(composer(11).render_message(&draft).as_bytes()).unwrap();

    assert_ne!(first.header("message-id"), second.header("message-id"));
    assert_eq!(first.subject(), second.subject());
    assert_eq!(first.text().unwrap(), second.text().unwrap());
    assert_eq!(first.html().unwrap(), second.html().unwrap());
    assert_eq!(
        first.attachments()[0].decode_body().unwrap(),
        second.attachments()[0].decode_body().unwrap()
    );
}

#[test]
fn attachments_round_trip() {
    let image = (0u8..=255).cycle().take(3000).collect::<Vec<u8>>();
    let mut draft = draft(
        "Files",
        Body::Html("<img src=\"cid:logo@company\">".into()),
    );
    draft.attachments.push(
        Attachment::new("logo.png", image.clone())
            .with_mime_type("image/png")
            .unwrap()
            .with_content_id("logo@company"),
    );
    draft.attachments.push(
        Attachment::from_base64("document.pdf", "JVBERi0xLjQ=")
            .unwrap()
            .with_mime_type("application/pdf")
            .unwrap(),
    );

    let message = composer(5).render_message(&draft);
    let parsed = Message::parse(message.as_bytes()).unwrap();

    let root_type = parsed.root().content_type().unwrap();
    assert!(root_type.is("multipart", "mixed"));
    let related = &parsed.root().parts()[0];
    assert!(related.content_type().unwrap().is("multipart", "related"));

    let attachments = parsed.attachments();
    assert_eq!(attachments.len(), 2);

    assert_eq!(attachments[0].content_id(), Some("logo@company"));
    assert_eq!(attachments[0].disposition().as_deref(), Some("inline"));
    assert_eq!(attachments[0].decode_body().unwrap(), image);

    assert_eq!(attachments[1].filename().as_deref(), Some("document.pdf"));
    assert_eq!(attachments[1].disposition().as_deref(), Some("attachment"));
    assert_eq!(attachments[1].decode_body().unwrap(), b"%PDF-1.4");

    assert_eq!(
        parsed.html().unwrap().as_deref(),
        Some("<img src=\"cid:logo@company\">")
    );
}

#[test]
fn non_ascii_attachment_name_round_trip() {
    let mut draft = draft("File", Body::Text("see file".into()));
    draft
        .attachments
        .push(Attachment::new("Bericht für März.txt", "data"));

    let message = composer(6).render_message(&draft);
    let parsed = Message::parse(message.as_bytes()).unwrap();
    assert_eq!(
        parsed.attachments()[0].filename().as_deref(),
        Some("Bericht für März.txt")
    );
}
