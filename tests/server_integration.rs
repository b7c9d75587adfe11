//! Server integration tests: validates catcher→compose→execute round-trip
//! through the public API.

use report_server::message::HandlerInfo;
use report_server::recording::{MemoryDatabase, MessageDatabase, RecordingStream};
use report_server::services::RecordingTermination;
use report_server::sink::{CapturedConsole, LogFile};
use report_server::time::ManualClock;
use report_server::{
    Action, CatchAction, Config, CoreServices, Disposition, FileSink, ReportMessage,
    ReportServer, Severity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

/// Helper: server with captured console, manual clock and a recording hook.
fn setup(name: &str) -> (Arc<ReportServer>, CapturedConsole, Arc<RecordingTermination>) {
    let hook = Arc::new(RecordingTermination::new());
    let services = Arc::new(CoreServices::new(hook.clone()));
    let console = CapturedConsole::new();
    let server = ReportServer::new(name, services)
        .with_console(Arc::new(console.clone()))
        .with_clock(Arc::new(ManualClock::new(0)));
    (Arc::new(server), console, hook)
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_default_error_displays_and_counts() {
    let (server, console, hook) = setup("main");
    server.set_max_quit_count(3, true);

    let mut msg = ReportMessage::error("CHK", "mismatch")
        .with_origin("scoreboard", HandlerInfo::new("rh", "uvm_test_top.env.sb"));
    let outcome = server.process(&mut msg);

    assert_eq!(outcome, Disposition::Executed(Action::DISPLAY | Action::COUNT));
    assert_eq!(
        console.lines(),
        vec!["UVM_ERROR @ 0NS: uvm_test_top.env.sb [CHK] mismatch"]
    );
    assert_eq!(server.quit_count(), 1);
    assert_eq!(hook.die_count(), 0);
}

#[test]
fn test_default_fatal_exits() {
    let (server, console, hook) = setup("main");
    let mut msg = ReportMessage::fatal("BOOM", "unrecoverable");

    let outcome = server.process(&mut msg);

    assert_eq!(outcome, Disposition::Executed(Action::DISPLAY | Action::EXIT));
    assert_eq!(console.lines().len(), 1);
    assert_eq!(hook.die_count(), 1);
    assert_eq!(server.severity_count(Severity::Fatal), 1);
}

#[test]
fn test_catcher_demotes_error_to_warning() {
    let (server, console, hook) = setup("main");
    server.set_max_quit_count(1, true);
    server.catchers().add_fn("demote_known", |m| {
        if m.id == "KNOWN_ISSUE" {
            m.severity = Severity::Warning;
            m.action = Action::DISPLAY;
        }
        CatchAction::Throw
    });

    let mut msg = ReportMessage::error("KNOWN_ISSUE", "tolerated");
    server.process(&mut msg);

    assert!(console.lines()[0].starts_with("UVM_WARNING @ 0NS"));
    assert_eq!(server.severity_count(Severity::Error), 0);
    assert_eq!(server.severity_count(Severity::Warning), 1);
    assert_eq!(server.quit_count(), 0);
    assert_eq!(hook.die_count(), 0);
    assert_eq!(server.catchers().stats().demoted(Severity::Error), 1);
}

#[test]
fn test_active_server_handles_reports_of_others() {
    let hook = Arc::new(RecordingTermination::new());
    let services = Arc::new(CoreServices::new(hook));
    let active_console = CapturedConsole::new();
    let active = Arc::new(
        ReportServer::new("active", services.clone())
            .with_console(Arc::new(active_console.clone()))
            .with_clock(Arc::new(ManualClock::new(7))),
    );
    services.set_active_server(active.clone());

    let local_console = CapturedConsole::new();
    let local = ReportServer::new("local", services.clone())
        .with_console(Arc::new(local_console.clone()));

    let mut msg = ReportMessage::info("HELLO", "routed");
    local.process(&mut msg);

    assert_eq!(msg.server(), Some("local"));
    assert!(local_console.lines().is_empty());
    assert_eq!(active_console.lines(), vec!["UVM_INFO @ 7NS: NO_REPORT_OBJECT [HELLO] routed"]);
    assert_eq!(active.id_count("HELLO"), 1);
    assert_eq!(local.id_count("HELLO"), 0);

    services.clear_active_server();
}

#[test]
fn test_log_file_shared_between_messages() {
    let (server, console, _) = setup("main");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.log");
    let file = LogFile::append(&path).unwrap();

    for id in ["A", "B"] {
        let mut msg = ReportMessage::info(id, "logged")
            .with_action(Action::DISPLAY | Action::LOG)
            .with_file_sink(FileSink::File(file.clone()));
        server.process(&mut msg);
    }

    assert_eq!(console.lines().len(), 2);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "UVM_INFO @ 0NS: NO_REPORT_OBJECT [A] logged\nUVM_INFO @ 0NS: NO_REPORT_OBJECT [B] logged\n"
    );
}

// =============================================================================
// Recording
// =============================================================================

#[test]
fn test_record_all_messages_records_display_only_reports() {
    let (server, _, _) = setup("main");
    let db = Arc::new(MemoryDatabase::new());
    server.set_message_database(db.clone());
    server.set_record_all_messages(true);

    let mut msg = ReportMessage::warning("W", "recorded anyway")
        .with_location("top.sv", 12)
        .with_origin("env", HandlerInfo::new("rh", "top.env"));
    let outcome = server.process(&mut msg);

    assert_eq!(outcome, Disposition::Executed(Action::DISPLAY | Action::RECORD));
    let transactions = db.transactions();
    assert_eq!(transactions.len(), 1);
    let fields: Vec<&str> = transactions[0].fields.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        fields,
        vec!["severity", "id", "message", "verbosity", "filename", "line", "context_name", "action"]
    );

    let json: serde_json::Value = serde_json::from_str(&db.to_json().unwrap()).unwrap();
    assert_eq!(json[0]["name"], "report_message");
    assert_eq!(json[0]["type_name"], "report_message");
    assert_eq!(db.streams()[0].name, "env");
}

struct CountingDatabase {
    inner: MemoryDatabase,
    opens: AtomicUsize,
}

impl MessageDatabase for CountingDatabase {
    fn open_stream(&self, name: &str, scope: &str, kind: &str) -> Option<Arc<dyn RecordingStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_stream(name, scope, kind)
    }
}

#[test]
fn test_stream_opened_once_under_concurrency() {
    let (server, _, _) = setup("main");
    let db = Arc::new(CountingDatabase {
        inner: MemoryDatabase::new(),
        opens: AtomicUsize::new(0),
    });
    server.set_message_database(db.clone());

    std::thread::scope(|s| {
        for _ in 0..8 {
            let server = &server;
            s.spawn(move || {
                for i in 0..25 {
                    let mut msg = ReportMessage::info("R", format!("msg {i}"))
                        .with_action(Action::RECORD)
                        .with_origin("env", HandlerInfo::new("rh", "top.env"));
                    server.process(&mut msg);
                }
            });
        }
    });

    assert_eq!(db.opens.load(Ordering::SeqCst), 1);
    assert_eq!(db.inner.transactions().len(), 200);
}

/// Database that reports through the server while it opens a stream.
struct ChattyDatabase {
    inner: MemoryDatabase,
    server: OnceLock<Weak<ReportServer>>,
}

impl MessageDatabase for ChattyDatabase {
    fn open_stream(&self, name: &str, scope: &str, kind: &str) -> Option<Arc<dyn RecordingStream>> {
        if let Some(server) = self.server.get().and_then(Weak::upgrade) {
            server.process(&mut ReportMessage::info("DB/OPEN", format!("opening {name}")));
        }
        self.inner.open_stream(name, scope, kind)
    }
}

#[test]
fn test_database_reporting_while_opening_stream() {
    let (server, console, _) = setup("main");
    let db = Arc::new(ChattyDatabase {
        inner: MemoryDatabase::new(),
        server: OnceLock::new(),
    });
    let _ = db.server.set(Arc::downgrade(&server));
    server.set_message_database(db.clone());
    server.set_record_all_messages(true);

    let (done_tx, done_rx) = mpsc::channel();
    let worker = server.clone();
    std::thread::spawn(move || {
        let mut routed = ReportMessage::info("ENV", "first")
            .with_origin("env", HandlerInfo::new("rh", "top.env"));
        worker.process(&mut routed);
        let mut orphan = ReportMessage::info("ORPHAN", "second");
        worker.process(&mut orphan);
        let _ = done_tx.send(());
    });
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("processing blocked on the stream cache");

    // Opening ("env", "rh") reports DB/OPEN, which opens ("", ""), which
    // reports DB/OPEN again into the key still opening: that one is shown
    // but not recorded. ORPHAN reuses ("", "").
    assert_eq!(server.id_count("DB/OPEN"), 2);
    assert_eq!(db.inner.stream_count(), 2);
    let recorded: Vec<String> = db
        .inner
        .transactions()
        .iter()
        .map(|t| t.fields[1].1.to_string())
        .collect();
    assert_eq!(recorded.len(), 3);
    assert!(recorded.contains(&"ENV".to_string()));
    assert!(recorded.contains(&"ORPHAN".to_string()));
    assert_eq!(console.lines().len(), 4);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exits_from_threshold_onwards() {
    let (server, _, hook) = setup("main");
    server.set_max_quit_count(50, true);

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let server = server.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let mut exits = 0;
            for i in 0..10 {
                let mut msg = ReportMessage::error(format!("W{worker}"), format!("{i}"))
                    .with_action(Action::COUNT);
                if let Disposition::Executed(action) = server.process(&mut msg) {
                    if action.contains(Action::EXIT) {
                        exits += 1;
                    }
                }
            }
            exits
        }));
    }
    let mut exits = 0;
    for task in tasks {
        exits += task.await.unwrap();
    }

    // The 50th COUNT and every one after it escalate.
    assert_eq!(server.quit_count(), 80);
    assert_eq!(exits, 31);
    assert_eq!(hook.die_count(), 31);
    assert_eq!(server.severity_count(Severity::Error), 80);
    assert_eq!(server.id_count("W0"), 10);
}

#[test]
fn test_threshold_crossed_by_exactly_one_thread() {
    let (server, _, hook) = setup("main");
    server.set_max_quit_count(100, true);
    server.set_quit_count(90);

    let crossings = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..10 {
            s.spawn(|| {
                let mut msg = ReportMessage::error("RACE", "x").with_action(Action::COUNT);
                if let Disposition::Executed(action) = server.process(&mut msg) {
                    if action.contains(Action::EXIT) {
                        crossings.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(server.quit_count(), 100);
    assert_eq!(crossings.load(Ordering::SeqCst), 1);
    assert_eq!(hook.die_count(), 1);
}

// =============================================================================
// Summary and configuration
// =============================================================================

#[test]
fn test_summary_after_run() {
    let (server, _, _) = setup("main");
    server.set_max_quit_count(2, true);
    server.process(&mut ReportMessage::info("B", "x"));
    server.process(&mut ReportMessage::error("A", "y"));
    server.process(&mut ReportMessage::error("A", "z"));

    let summary = server.summary_text();
    assert!(summary.starts_with("\n--- UVM Report Summary ---\n\n"));
    assert!(summary.contains("Quit count reached!\nQuit count : 2 of 2\n"));
    assert!(summary.contains("UVM_INFO : 1\nUVM_WARNING : 0\nUVM_ERROR : 2\nUVM_FATAL : 0\n"));
    assert!(summary.ends_with("** Report counts by id\n[A] 2\n[B] 1\n"));

    server.set_enable_id_summary(false);
    assert!(!server.summary_text().contains("by id"));
}

#[test]
fn test_summarize_to_file() {
    let (server, console, _) = setup("main");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.log");
    let file = LogFile::append(&path).unwrap();

    server.process(&mut ReportMessage::info("X", "x"));
    console.clear();
    server.report_summarize(FileSink::File(file));

    assert_eq!(console.lines().len(), 1);
    let logged = std::fs::read_to_string(&path).unwrap();
    assert!(logged.starts_with("UVM_INFO @ 0NS: NO_REPORT_OBJECT [UVM/REPORT/SERVER] "));
    assert!(logged.contains("[X] 1\n"));
}

#[test]
fn test_server_from_json_config() {
    let mut config = Config::from_json_str(
        r#"{ "server": { "name": "cfg", "max_quit_count": 1, "show_verbosity": true } }"#,
    )
    .unwrap();
    config
        .apply_overrides_from(|key| (key == "REPORT_SHOW_TERMINATOR").then(|| "1".to_string()))
        .unwrap();

    let hook = Arc::new(RecordingTermination::new());
    let services = Arc::new(CoreServices::new(hook.clone()));
    let console = CapturedConsole::new();
    let server = ReportServer::from_config(&config.server, services)
        .with_console(Arc::new(console.clone()))
        .with_clock(Arc::new(ManualClock::new(0)));

    server.process(&mut ReportMessage::error("E", "fails"));

    assert_eq!(
        console.lines(),
        vec!["UVM_ERROR(UVM_MEDIUM) @ 0NS: NO_REPORT_OBJECT [E] fails -UVM_ERROR"]
    );
    assert_eq!(hook.die_count(), 1);
}
