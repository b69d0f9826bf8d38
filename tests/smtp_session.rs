//! Whole-dialogue tests of the SMTP-receive session over in-process pipes.

mod common;

use common::*;
use postale::smtp::session::SessionParams;
use postale::storage::UserId;

#[tokio::test]
async fn full_dialogue_delivers_to_the_resolved_recipient() {
    let fixture = demo_stores();
    let (mut client, task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());

    client.expect("220 SMTP Service Ready").await;
    client.send("HELO tester").await;
    client.expect("250 localhost Hello tester").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250 Sender OK").await;
    client.send("RCPT TO:<b@example.com>").await;
    client.expect("250 Recipient OK").await;
    client.send("DATA").await;
    client.expect("354 End data with <CR><LF>.<CR><LF>").await;
    client.send("From: a@example.com").await;
    client.send("To: b@example.com").await;
    client.send("Subject: greetings").await;
    client.send("").await;
    client.send("hello over the wire").await;
    client.send(".").await;
    client.expect("250 Message accepted for delivery").await;
    client.send("QUIT").await;
    client.expect("221 Bye").await;
    client.expect_eof().await;
    task.await.unwrap();

    let stored = fixture.emails.messages_for(&UserId("dev_user".into()));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].subject, "greetings");
    assert_eq!(stored[0].from_address.email, "a@example.com");
    assert_eq!(stored[0].to_addresses.len(), 1);
    assert_eq!(stored[0].to_addresses[0].email, "b@example.com");
    assert!(stored[0].body.contains("hello over the wire"));
}

#[tokio::test]
async fn dot_stuffed_lines_are_unescaped_and_terminator_excluded() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());

    client.expect("220").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<b@example.com>").await;
    client.expect("250").await;
    client.send("DATA").await;
    client.expect("354").await;
    client.send("Subject: dots").await;
    client.send("").await;
    client.send("before").await;
    client.send("..").await;
    client.send("after").await;
    client.send(".").await;
    client.expect("250").await;

    let stored = fixture.emails.messages_for(&UserId("dev_user".into()));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].body, "before\r\n.\r\nafter\r\n");
}

#[tokio::test]
async fn transaction_ordering_violations_get_503() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());
    client.expect("220").await;

    client.send("RCPT TO:<b@example.com>").await;
    client.expect("503 Need MAIL command").await;
    client.send("DATA").await;
    client.expect("503 Need MAIL command").await;

    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("MAIL FROM:<other@example.com>").await;
    client.expect("503 Sender already specified").await;

    client.send("DATA").await;
    client.expect("503 Need RCPT command").await;

    // RSET discards the open transaction, a fresh MAIL is accepted again.
    client.send("RSET").await;
    client.expect("250 Reset OK").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
}

#[tokio::test]
async fn missing_addresses_get_501() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());
    client.expect("220").await;

    client.send("MAIL").await;
    client.expect("501 Sender address required").await;
    client.send("MAIL FROM:<>").await;
    client.expect("501 Sender address required").await;

    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT").await;
    client.expect("501 Recipient address required").await;
}

#[tokio::test]
async fn canned_and_unknown_replies() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());
    client.expect("220").await;

    client.send("NOOP").await;
    client.expect("250 OK").await;
    client.send("VRFY someone").await;
    client.expect("252 User not verified").await;
    client.send("EXPN list").await;
    client.expect("252 List not expanded").await;
    client.send("HELP").await;
    client.expect("214 Help message").await;
    client.send("BOGUS").await;
    client.expect("500 Unknown command").await;
}

#[tokio::test]
async fn one_unresolvable_recipient_does_not_block_the_other() {
    let fixture = static_stores(&[("known@example.com", "alice")]);
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());

    client.expect("220").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<known@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<stranger@example.com>").await;
    client.expect("250").await;
    client.send("DATA").await;
    client.expect("354").await;
    client.send("Subject: split delivery").await;
    client.send("").await;
    client.send("body").await;
    client.send(".").await;
    // The client still sees success even though one recipient was skipped.
    client.expect("250 Message accepted for delivery").await;

    let delivered = fixture.emails.messages_for(&UserId("alice".into()));
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].subject, "split delivery");
}

#[tokio::test]
async fn data_timeout_fails_transaction_but_not_session() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), short_params());

    client.expect("220").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<b@example.com>").await;
    client.expect("250").await;
    client.send("DATA").await;
    client.expect("354").await;

    // No terminator and no further lines: the per-line timeout fires.
    client.expect("500 Data timeout").await;
    assert!(fixture
        .emails
        .messages_for(&UserId("dev_user".into()))
        .is_empty());

    // The session survives and can run a fresh transaction.
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250 Sender OK").await;
}

#[tokio::test]
async fn data_line_cap_aborts_oversized_messages() {
    let fixture = demo_stores();
    let params = SessionParams {
        data_max_lines: 5,
        ..short_params()
    };
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), params);

    client.expect("220").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<b@example.com>").await;
    client.expect("250").await;
    client.send("DATA").await;
    client.expect("354").await;
    for _ in 0..10 {
        client.send("x").await;
    }
    client.expect("500 Message too long").await;
}

#[tokio::test]
async fn multipart_attachment_is_persisted_per_recipient() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_smtp(fixture.stores.clone(), SessionParams::default());

    client.expect("220").await;
    client.send("MAIL FROM:<a@example.com>").await;
    client.expect("250").await;
    client.send("RCPT TO:<b@example.com>").await;
    client.expect("250").await;
    client.send("DATA").await;
    client.expect("354").await;
    for line in [
        "From: a@example.com",
        "Subject: with attachment",
        "Content-Type: multipart/mixed; boundary=\"b\"",
        "",
        "--b",
        "Content-Type: text/plain",
        "",
        "see attachment",
        "--b",
        "Content-Type: application/pdf; name=\"doc.pdf\"",
        "Content-Disposition: attachment; filename=\"doc.pdf\"",
        "",
        "%PDF-1.4 data",
        "--b--",
        ".",
    ] {
        client.send(line).await;
    }
    client.expect("250 Message accepted for delivery").await;

    let owner = UserId("dev_user".into());
    let saved = fixture.attachments.saved_for(&owner);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].filename, "doc.pdf");
    assert_eq!(saved[0].content_type, "application/pdf");

    let stored = fixture.emails.messages_for(&owner);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].attachments.len(), 1);
    assert_eq!(stored[0].attachments[0].filename, "doc.pdf");
    assert_eq!(stored[0].body, "see attachment");
}
