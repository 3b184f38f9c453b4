//! Plugin loading integration tests
//! Run with: cargo test --test plugin_loading_test

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use nology_bot::domain::traits::HostServices;
use nology_bot::infrastructure::plugins::{
    CommandRegistry, HandlerCatalog, ManifestDirectory, PluginLoader, PluginWatcher,
};
use nology_bot::{
    handler_fn, reply_fn, CommandError, Config, DispatchOutcome, Dispatcher, InboundMessage, PluginError,
    ReplyFn,
};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write plugin file");
}

fn loader_for(dir: &Path) -> (Arc<CommandRegistry>, PluginLoader) {
    let registry = Arc::new(CommandRegistry::new());
    let catalog = HandlerCatalog::new("Nology", &registry).with_native(
        "shout",
        handler_fn(|_, args| async move { args.reply(args.text.to_uppercase()).await }),
    );
    let source = ManifestDirectory::new(
        dir,
        vec!["yaml".to_string(), "yml".to_string(), "json".to_string()],
        catalog,
    );
    let loader = PluginLoader::new(Arc::clone(&registry), Arc::new(source));
    (registry, loader)
}

fn recording_reply() -> (ReplyFn, Arc<Mutex<Vec<String>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&sent);
    let reply = reply_fn(move |text| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(text);
            Ok(())
        }
    });
    (reply, sent)
}

/// Poll until `check` holds, giving the watcher a few seconds
async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

const PING: &str = "command: [ping, p]\nhandler:\n  kind: reply\n  text: pong\n";

/// One good unit and one broken unit: the good one still loads
#[test]
fn test_broken_plugin_does_not_abort_batch() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.yaml", "command: [a]\nhandler:\n  kind: reply\n  text: A\n");
    write(dir.path(), "broken.yaml", "command: [b\nhandler: {{{");

    let (registry, loader) = loader_for(dir.path());
    let report = loader.load_all().unwrap();

    assert!(registry.lookup("a").is_some());
    assert_eq!(report.aliases, 1);
    assert_eq!(report.loaded, vec!["a.yaml"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].unit, "broken.yaml");
}

/// Registry size equals the alias count of the valid units only
#[test]
fn test_alias_count_across_units() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ping.yaml", PING);
    write(
        dir.path(),
        "shout.json",
        r#"{"command": ["shout", "yell", "SCREAM"], "handler": {"kind": "native", "name": "shout"}}"#,
    );
    write(dir.path(), "menu.yml", "command: [menu, help]\ntags: [utility]\nhandler:\n  kind: menu\n");
    write(dir.path(), "no-aliases.yaml", "command: []\nhandler:\n  kind: menu\n");
    write(dir.path(), "unknown-native.yaml", "command: [x]\nhandler:\n  kind: native\n  name: nope\n");
    write(dir.path(), "readme.txt", "not a plugin");
    write(dir.path(), ".hidden.yaml", PING);

    let (registry, loader) = loader_for(dir.path());
    let report = loader.load_all().unwrap();

    assert_eq!(registry.size(), 7);
    assert_eq!(report.aliases, 7);
    assert_eq!(report.loaded.len(), 3);
    assert_eq!(report.failures.len(), 2);
    assert!(registry.lookup("scream").is_some());
    assert_eq!(registry.descriptors().len(), 3);
}

#[test]
fn test_descriptor_carries_manifest_fields() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "owner.yaml",
        "command: [Owner]\nhelp: [Owner tools]\ntags: [admin]\nis-bot: true\nprivate: true\nhandler:\n  kind: reply\n  text: ok\n",
    );

    let (registry, loader) = loader_for(dir.path());
    loader.load_all().unwrap();

    let owner = registry.lookup("OWNER").unwrap();
    assert_eq!(owner.name(), "Owner");
    assert_eq!(owner.help_text(), "Owner tools");
    assert_eq!(owner.tag_text(), "admin");
    assert!(owner.restrict_bot_sender);
    assert!(owner.restrict_to_private);
    assert_eq!(owner.source.as_deref(), Some(dir.path().join("owner.yaml").as_path()));
}

/// Removed and edited units are reflected after a reload
#[tokio::test]
async fn test_reload_replaces_stale_commands() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ping.yaml", PING);
    write(dir.path(), "old.yaml", "command: [old]\nhandler:\n  kind: reply\n  text: old\n");

    let (registry, loader) = loader_for(dir.path());
    loader.reload().await.unwrap();
    assert!(registry.lookup("old").is_some());

    fs::remove_file(dir.path().join("old.yaml")).unwrap();
    write(dir.path(), "ping.yaml", "command: [ping]\nhandler:\n  kind: reply\n  text: pong v2\n");
    let report = loader.reload().await.unwrap();

    assert!(registry.lookup("old").is_none());
    assert!(registry.lookup("p").is_none());
    assert_eq!(report.aliases, 1);
}

#[test]
fn test_missing_directory_keeps_registry() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ping.yaml", PING);
    let (registry, loader) = loader_for(dir.path());
    loader.load_all().unwrap();

    let gone = dir.path().join("gone");
    let (_, missing) = loader_for(&gone);
    assert!(matches!(missing.load_all(), Err(PluginError::Directory { .. })));
    assert_eq!(registry.size(), 2);
}

/// Loaded plugins dispatch end to end, including the menu
#[tokio::test]
async fn test_loaded_plugins_dispatch() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ping.yaml", PING);
    write(dir.path(), "menu.yaml", "command: [menu, help]\nhelp: [Shows the command menu.]\ntags: [utility]\nhandler:\n  kind: menu\n");
    write(dir.path(), "shout.yaml", "command: [shout]\nhandler:\n  kind: native\n  name: shout\n");

    let (registry, loader) = loader_for(dir.path());
    loader.load_all().unwrap();
    let dispatcher = Dispatcher::new(registry, &Config::default());

    let (reply, sent) = recording_reply();

    let message = InboundMessage::new("1@s.whatsapp.net", "").with_push_name("Ana");
    assert_eq!(
        dispatcher.execute("!P", &message, Arc::clone(&reply)).await,
        DispatchOutcome::Completed("p".into())
    );
    dispatcher.execute("!shout hello  world", &message, Arc::clone(&reply)).await;
    dispatcher.execute("!HELP", &message, reply).await;

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0], "pong");
    assert_eq!(sent[1], "HELLO WORLD");
    assert!(sent[2].contains("Hi Ana! I am Nology"));
    assert!(sent[2].contains("  - !menu: _Shows the command menu._"));
    assert!(sent[2].contains("  - !ping: _No description_"));
    assert_eq!(sent.len(), 3);
}

/// Creating and deleting plugin files is picked up without a restart
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_reloads_on_file_changes() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.yaml", "command: [a]\nhandler:\n  kind: reply\n  text: A\n");

    let (registry, loader) = loader_for(dir.path());
    loader.reload().await.unwrap();
    assert_eq!(registry.size(), 1);

    let watcher = PluginWatcher::spawn(loader.clone(), Duration::from_millis(50)).unwrap();

    write(dir.path(), "b.yaml", "command: [b, bb]\nhandler:\n  kind: reply\n  text: B\n");
    assert!(eventually(|| registry.lookup("b").is_some()).await);
    assert_eq!(registry.size(), 3);

    fs::remove_file(dir.path().join("a.yaml")).unwrap();
    assert!(eventually(|| registry.lookup("a").is_none()).await);
    assert_eq!(registry.size(), 2);
    assert!(registry.lookup("bb").is_some());

    watcher.stop();
}

/// Overlapping reload requests run one at a time and agree on the result
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reloads_agree() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ping.yaml", PING);
    write(dir.path(), "a.yaml", "command: [a]\nhandler:\n  kind: reply\n  text: A\n");

    let (registry, loader) = loader_for(dir.path());
    let reloads = (0..8).map(|_| {
        let loader = loader.clone();
        async move { loader.reload().await }
    });
    let reports = futures::future::join_all(reloads).await;

    for report in reports {
        let report = report.unwrap();
        assert_eq!(report.aliases, 3);
        assert!(report.is_clean());
    }
    assert_eq!(registry.size(), 3);
}

/// Host whose fetches return a fixed JSON body
struct CannedHost(serde_json::Value);

#[async_trait]
impl HostServices for CannedHost {
    async fn sleep(&self, _duration: Duration) {}

    async fn fetch_json(&self, _url: &str) -> Result<serde_json::Value, CommandError> {
        Ok(self.0.clone())
    }
}

/// A fetch-json manifest replies with the selected field, or the error notice when it is missing
#[tokio::test]
async fn test_fetch_json_plugin_dispatch() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "joke.json",
        r#"{"command": ["joke"], "handler": {"kind": "fetch-json", "url": "https://api.example.com/joke", "pointer": "/setup"}}"#,
    );
    write(
        dir.path(),
        "punch.json",
        r#"{"command": ["punch"], "handler": {"kind": "fetch-json", "url": "https://api.example.com/joke", "pointer": "/punchline"}}"#,
    );

    let (registry, loader) = loader_for(dir.path());
    loader.load_all().unwrap();
    let config = Config::default();
    let dispatcher = Dispatcher::new(registry, &config)
        .with_host(Arc::new(CannedHost(serde_json::json!({"setup": "Knock knock"}))));

    let (reply, sent) = recording_reply();
    let message = InboundMessage::new("1@s.whatsapp.net", "");
    assert_eq!(
        dispatcher.execute("!joke", &message, Arc::clone(&reply)).await,
        DispatchOutcome::Completed("joke".into())
    );
    assert_eq!(
        dispatcher.execute("!punch", &message, reply).await,
        DispatchOutcome::Failed("punch".into())
    );

    let sent = sent.lock().unwrap();
    assert_eq!(*sent, vec!["Knock knock".to_string(), config.messages.error.clone()]);
}
