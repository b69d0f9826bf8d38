//! Whole-dialogue tests of the IMAP session over in-process pipes.

mod common;

use common::*;
use postale::storage::{EmailStatus, UserId};

#[tokio::test]
async fn greeting_then_capability() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);

    client.expect("* OK IMAP4rev1 Service Ready").await;
    client.send("a1 CAPABILITY").await;
    let lines = client.until_tag("a1").await;
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN AUTH=LOGIN"));
    assert_eq!(lines[1], "a1 OK CAPABILITY completed");
}

#[tokio::test]
async fn select_before_login_is_rejected() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);

    client.expect("* OK").await;
    client.send("a1 SELECT INBOX").await;
    client.expect("a1 BAD Not authenticated").await;
}

#[tokio::test]
async fn select_reports_mailbox_counts_from_the_store() {
    let fixture = demo_stores();
    let owner = UserId("alice".into());
    fixture
        .emails
        .seed(&owner, message("first", EmailStatus::Received), true);
    fixture
        .emails
        .seed(&owner, message("second", EmailStatus::Received), false);
    fixture
        .emails
        .seed(&owner, message("outbound", EmailStatus::Sent), true);

    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK LOGIN completed").await;

    client.send("a2 SELECT INBOX").await;
    let lines = client.until_tag("a2").await;
    assert!(lines.contains(&"* 2 EXISTS".to_string()));
    assert!(lines.contains(&"* 0 RECENT".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("* OK [UNSEEN 1]")));
    assert!(lines.iter().any(|l| l.starts_with("* OK [UIDNEXT 3]")));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("a2 OK [READ-WRITE] INBOX selected")
    );

    // Re-select from the SELECTED state switches mailboxes.
    client.send("a3 SELECT \"Sent\"").await;
    let lines = client.until_tag("a3").await;
    assert!(lines.contains(&"* 1 EXISTS".to_string()));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("a3 OK [READ-WRITE] Sent selected")
    );
}

#[tokio::test]
async fn list_returns_the_fixed_mailbox_set() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK").await;

    client.send("a2 LIST \"\" \"*\"").await;
    let lines = client.until_tag("a2").await;
    assert_eq!(lines.len(), 6);
    for (line, mailbox) in lines.iter().zip(["INBOX", "Sent", "Drafts", "Trash", "Spam"]) {
        assert_eq!(
            line,
            &format!("* LIST (\\HasNoChildren) \"/\" \"{}\"", mailbox)
        );
    }
    assert_eq!(lines[5], "a2 OK LIST completed");
}

#[tokio::test]
async fn selected_state_stubs_answer_the_fixed_subset() {
    let fixture = demo_stores();
    let owner = UserId("alice".into());
    fixture
        .emails
        .seed(&owner, message("sized", EmailStatus::Received), false);

    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK").await;
    client.send("a2 SELECT INBOX").await;
    client.until_tag("a2").await;

    client.send("a3 FETCH 1 FULL").await;
    let lines = client.until_tag("a3").await;
    assert_eq!(
        lines[0],
        format!(
            "* 1 FETCH (FLAGS (\\Seen) UID 1 RFC822.SIZE {})",
            "stored body".len()
        )
    );
    assert_eq!(lines[1], "a3 OK FETCH completed");

    client.send("a4 SEARCH ALL").await;
    let lines = client.until_tag("a4").await;
    assert_eq!(lines[0], "* SEARCH 1 2 3 4 5");
    assert_eq!(lines[1], "a4 OK SEARCH completed");

    client.send("a5 STORE 1 +FLAGS (\\Seen)").await;
    client.expect("a5 OK STORE completed").await;
    client.send("a6 EXPUNGE").await;
    client.expect("a6 OK EXPUNGE completed").await;

    client.send("a7 FETCH 1").await;
    client
        .expect("a7 BAD FETCH requires message set and data items")
        .await;
}

#[tokio::test]
async fn stub_commands_require_a_selected_mailbox() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK").await;

    client.send("a2 FETCH 1 FULL").await;
    client.expect("a2 BAD No mailbox selected").await;
    client.send("a3 SEARCH ALL").await;
    client.expect("a3 BAD No mailbox selected").await;
}

#[tokio::test]
async fn logout_is_accepted_from_every_state() {
    // NOT_AUTHENTICATED
    let fixture = demo_stores();
    let (mut client, task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGOUT").await;
    client.expect("a1 OK LOGOUT completed").await;
    client.expect_eof().await;
    task.await.unwrap();

    // AUTHENTICATED
    let (mut client, task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK").await;
    client.send("a2 LOGOUT").await;
    client.expect("a2 OK LOGOUT completed").await;
    client.expect_eof().await;
    task.await.unwrap();

    // SELECTED
    let (mut client, task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;
    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 OK").await;
    client.send("a2 SELECT INBOX").await;
    client.until_tag("a2").await;
    client.send("a3 LOGOUT").await;
    client.expect("a3 OK LOGOUT completed").await;
    client.expect_eof().await;
    task.await.unwrap();
}

#[tokio::test]
async fn authenticate_mechanisms_and_repeat_attempts() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;

    client.send("a1 AUTHENTICATE CRAM-MD5").await;
    client.expect("a1 BAD Unsupported authentication method").await;

    client.send("a2 AUTHENTICATE PLAIN").await;
    client.expect("a2 OK Authentication successful").await;

    client.send("a3 AUTHENTICATE LOGIN").await;
    client.expect("a3 BAD Already authenticated").await;
    client.send("a4 LOGIN alice secret").await;
    client.expect("a4 BAD Already authenticated").await;
}

#[tokio::test]
async fn starttls_is_only_acknowledged_before_authentication() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;

    client.send("a1 STARTTLS").await;
    client.expect("a1 OK Begin TLS negotiation now").await;

    client.send("a2 LOGIN alice secret").await;
    client.expect("a2 OK").await;
    client.send("a3 STARTTLS").await;
    client.expect("a3 BAD STARTTLS not allowed in current state").await;
}

#[tokio::test]
async fn authentication_fails_outside_development_mode() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), false);
    client.expect("* OK").await;

    client.send("a1 LOGIN alice secret").await;
    client.expect("a1 NO Login failed").await;
    client.send("a2 AUTHENTICATE PLAIN").await;
    client.expect("a2 NO Authentication failed").await;
}

#[tokio::test]
async fn malformed_lines_get_an_untagged_bad() {
    let fixture = demo_stores();
    let (mut client, _task) = spawn_imap(fixture.stores.clone(), true);
    client.expect("* OK").await;

    client.send("lonelytag").await;
    client.expect("* BAD Invalid command format").await;

    client.send("a1 FROBNICATE").await;
    client.expect("a1 BAD Unknown command").await;
}
