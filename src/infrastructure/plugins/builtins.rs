//! Built-in handler kinds and the native handler catalog
//!
//! Manifests cannot carry code, so every handler a plugin binds to is either
//! one of the kinds below or a native handler the host registered by name.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

use super::manifest::HandlerSpec;
use super::registry::CommandRegistry;
use crate::application::errors::{CommandError, PluginError};
use crate::domain::entities::{CommandArgs, CommandHandler, InboundMessage};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

/// Substitute `{name}` placeholders; unknown names are left as written
pub fn render_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn bundle_value(args: &CommandArgs, name: &str) -> Option<String> {
    match name {
        "prefix" => Some(args.prefix.clone()),
        "command" => Some(args.command.clone()),
        "text" => Some(args.text.clone()),
        "pushname" => Some(args.push_name.clone()),
        _ => None,
    }
}

/// Host-side table of handlers plugins can bind with `kind: native`
pub struct HandlerCatalog {
    bot_name: String,
    registry: Weak<CommandRegistry>,
    native: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerCatalog {
    pub fn new(bot_name: impl Into<String>, registry: &Arc<CommandRegistry>) -> Self {
        Self {
            bot_name: bot_name.into(),
            registry: Arc::downgrade(registry),
            native: HashMap::new(),
        }
    }

    /// Make a handler available to manifests under `name`
    pub fn register_native(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.native.insert(name.into(), handler);
    }

    pub fn with_native(mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.register_native(name, handler);
        self
    }

    /// Names manifests may bind with `kind: native`, sorted
    pub fn native_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.native.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Turn a manifest's handler spec into a callable handler
    pub fn build(&self, spec: &HandlerSpec) -> Result<Arc<dyn CommandHandler>, PluginError> {
        let handler: Arc<dyn CommandHandler> = match spec {
            HandlerSpec::Reply { text, usage, delay_ms } => Arc::new(ReplyHandler {
                template: text.clone(),
                usage: usage.clone(),
                delay: delay_ms.map(Duration::from_millis),
            }),
            HandlerSpec::FetchJson { url, query, pointer, template, usage } => Arc::new(FetchJsonHandler {
                url: url.clone(),
                query: query.clone(),
                pointer: pointer.clone(),
                template: template.clone(),
                usage: usage.clone(),
            }),
            HandlerSpec::Menu => Arc::new(MenuHandler {
                bot_name: self.bot_name.clone(),
                registry: Weak::clone(&self.registry),
            }),
            HandlerSpec::Native { name } => self
                .native
                .get(name)
                .cloned()
                .ok_or_else(|| PluginError::UnknownHandler(name.clone()))?,
        };
        Ok(handler)
    }
}

/// Replies with a rendered template
pub struct ReplyHandler {
    template: String,
    usage: Option<String>,
    delay: Option<Duration>,
}

#[async_trait]
impl CommandHandler for ReplyHandler {
    async fn call(&self, _message: &InboundMessage, args: &CommandArgs) -> Result<(), CommandError> {
        if let Some(usage) = self.usage.as_deref().filter(|_| args.text.is_empty()) {
            return args.reply(render_template(usage, |name| bundle_value(args, name))).await;
        }
        if let Some(delay) = self.delay {
            args.sleep(delay).await;
        }
        args.reply(render_template(&self.template, |name| bundle_value(args, name))).await
    }
}

/// Fetches a JSON document and replies with the selected value
pub struct FetchJsonHandler {
    url: String,
    query: Option<String>,
    pointer: Option<String>,
    template: Option<String>,
    usage: Option<String>,
}

impl FetchJsonHandler {
    /// Request URL with placeholders percent-encoded and the query parameter bound
    fn request_url(&self, args: &CommandArgs) -> Result<String, CommandError> {
        let base = render_template(&self.url, |name| {
            bundle_value(args, name).map(|v| urlencoding::encode(&v).into_owned())
        });
        match &self.query {
            Some(param) => reqwest::Url::parse_with_params(&base, &[(param.as_str(), args.text.as_str())])
                .map(String::from)
                .map_err(|e| CommandError::InvalidArgs(format!("bad url {}: {}", base, e))),
            None => Ok(base),
        }
    }

    /// Select the configured value from a response body and format the reply
    fn render_value(&self, body: serde_json::Value, args: &CommandArgs) -> Result<String, CommandError> {
        let value = match &self.pointer {
            Some(pointer) => body
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| CommandError::ExecutionFailed(format!("no value at {} in response", pointer)))?,
            None => body,
        };
        let value = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        Ok(match &self.template {
            Some(template) => render_template(template, |name| match name {
                "value" => Some(value.clone()),
                other => bundle_value(args, other),
            }),
            None => value,
        })
    }
}

#[async_trait]
impl CommandHandler for FetchJsonHandler {
    async fn call(&self, _message: &InboundMessage, args: &CommandArgs) -> Result<(), CommandError> {
        if let Some(usage) = self.usage.as_deref().filter(|_| args.text.is_empty()) {
            return args.reply(render_template(usage, |name| bundle_value(args, name))).await;
        }

        let url = self.request_url(args)?;
        let body = args.fetch_json(&url).await?;
        let reply = self.render_value(body, args)?;
        args.reply(reply).await
    }
}

/// Lists every registered command once, grouped by tag
pub struct MenuHandler {
    bot_name: String,
    registry: Weak<CommandRegistry>,
}

impl MenuHandler {
    pub fn render(bot_name: &str, registry: &CommandRegistry, args: &CommandArgs) -> String {
        let mut by_tag: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for cmd in registry.descriptors() {
            let tag = capitalize(&cmd.tag_text());
            by_tag
                .entry(format!("*{}*", tag))
                .or_default()
                .push(format!("  - {}{}: _{}_", args.prefix, cmd.name(), cmd.help_text()));
        }

        let mut menu = format!("Hi {}! I am {}, a chat bot.\n\n", args.push_name, bot_name);
        menu.push_str("*Available Commands*\n");
        for (tag, lines) in by_tag {
            menu.push_str(&format!("\n{}\n", tag));
            menu.push_str(&lines.join("\n"));
        }
        menu.push_str(&format!("\n\n_Use {}command <query> to use a command._", args.prefix));
        menu
    }
}

#[async_trait]
impl CommandHandler for MenuHandler {
    async fn call(&self, _message: &InboundMessage, args: &CommandArgs) -> Result<(), CommandError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| CommandError::ExecutionFailed("command registry dropped".to_string()))?;
        let menu = Self::render(&self.bot_name, &registry, args);
        args.reply(menu).await
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use serde_json::json;
    use crate::domain::entities::{handler_fn, reply_fn, CommandDescriptor};
    use crate::domain::traits::HostServices;

    /// Host that answers every fetch with a fixed body and records the URLs
    struct CannedHost {
        body: serde_json::Value,
        fetched: Mutex<Vec<String>>,
    }

    impl CannedHost {
        fn new(body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                body,
                fetched: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HostServices for CannedHost {
        async fn sleep(&self, _duration: Duration) {}

        async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, CommandError> {
            self.fetched.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn args_with_host(text: &str, host: Arc<dyn HostServices>) -> (CommandArgs, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let reply = reply_fn(move |t| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(t);
                Ok(())
            }
        });
        let message = InboundMessage::new("1@s.whatsapp.net", "").with_push_name("Ana");
        let args = CommandArgs::new("!", "say", text, &message, true, reply, host);
        (args, sent)
    }

    fn args_with_sink(text: &str) -> (CommandArgs, Arc<Mutex<Vec<String>>>) {
        args_with_host(text, CannedHost::new(serde_json::Value::Null))
    }

    fn fetch(url: &str) -> FetchJsonHandler {
        FetchJsonHandler {
            url: url.into(),
            query: None,
            pointer: None,
            template: None,
            usage: None,
        }
    }

    #[test]
    fn test_render_template() {
        let out = render_template("{a} and {b} but not {c}", |n| match n {
            "a" => Some("1".into()),
            "b" => Some("2".into()),
            _ => None,
        });
        assert_eq!(out, "1 and 2 but not {c}");
    }

    #[tokio::test]
    async fn test_reply_handler_renders_bundle() {
        let handler = ReplyHandler {
            template: "{pushname} said: {text} via {prefix}{command}".into(),
            usage: None,
            delay: None,
        };
        let (args, sent) = args_with_sink("hello world");
        let message = InboundMessage::new("1@s.whatsapp.net", "");
        handler.call(&message, &args).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["Ana said: hello world via !say"]);
    }

    #[tokio::test]
    async fn test_reply_handler_sends_usage_without_text() {
        let handler = ReplyHandler {
            template: "{text}".into(),
            usage: Some("Usage: {prefix}{command} <text>".into()),
            delay: None,
        };
        let (args, sent) = args_with_sink("");
        let message = InboundMessage::new("1@s.whatsapp.net", "");
        handler.call(&message, &args).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["Usage: !say <text>"]);
    }

    #[test]
    fn test_fetch_json_request_url_binds_query() {
        let handler = FetchJsonHandler {
            query: Some("q".into()),
            ..fetch("https://api.example.com/search")
        };
        let (args, _) = args_with_sink("rust lang");
        assert_eq!(
            handler.request_url(&args).unwrap(),
            "https://api.example.com/search?q=rust+lang"
        );
    }

    #[test]
    fn test_fetch_json_url_placeholders_are_encoded() {
        let handler = fetch("https://api.example.com/define/{text}?lang=en");
        let (args, _) = args_with_sink("a&b=c?d#e f");
        assert_eq!(
            handler.request_url(&args).unwrap(),
            "https://api.example.com/define/a%26b%3Dc%3Fd%23e%20f?lang=en"
        );
    }

    #[test]
    fn test_fetch_json_pointer_selects_string_unquoted() {
        let handler = FetchJsonHandler {
            pointer: Some("/joke/setup".into()),
            ..fetch("https://api.example.com")
        };
        let (args, _) = args_with_sink("x");
        let body = json!({"joke": {"setup": "Why?", "id": 7}});
        assert_eq!(handler.render_value(body, &args).unwrap(), "Why?");
    }

    #[test]
    fn test_fetch_json_non_string_values_use_json_text() {
        let handler = FetchJsonHandler {
            pointer: Some("/id".into()),
            ..fetch("https://api.example.com")
        };
        let (args, _) = args_with_sink("x");
        assert_eq!(handler.render_value(json!({"id": 7}), &args).unwrap(), "7");

        let whole = fetch("https://api.example.com");
        assert_eq!(whole.render_value(json!({"ok": true}), &args).unwrap(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_fetch_json_template_substitutes_value() {
        let handler = FetchJsonHandler {
            pointer: Some("/temp".into()),
            template: Some("{pushname}, it is {value} in {text}".into()),
            ..fetch("https://api.example.com")
        };
        let (args, _) = args_with_sink("Jakarta");
        assert_eq!(
            handler.render_value(json!({"temp": 31.5}), &args).unwrap(),
            "Ana, it is 31.5 in Jakarta"
        );
    }

    #[test]
    fn test_fetch_json_missing_pointer_fails() {
        let handler = FetchJsonHandler {
            pointer: Some("/missing".into()),
            ..fetch("https://api.example.com")
        };
        let (args, _) = args_with_sink("x");
        let err = handler.render_value(json!({"id": 7}), &args).unwrap_err();
        assert!(matches!(err, CommandError::ExecutionFailed(msg) if msg.contains("/missing")));
    }

    #[tokio::test]
    async fn test_fetch_json_sends_usage_without_fetching() {
        let host = CannedHost::new(json!({"setup": "Why?"}));
        let handler = FetchJsonHandler {
            usage: Some("Usage: {prefix}{command} <word>".into()),
            ..fetch("https://api.example.com/{text}")
        };
        let (args, sent) = args_with_host("", host.clone());
        let message = InboundMessage::new("1@s.whatsapp.net", "");

        handler.call(&message, &args).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["Usage: !say <word>"]);
        assert!(host.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_json_call_replies_with_selected_value() {
        let host = CannedHost::new(json!({"setup": "Why did the crab cross?"}));
        let handler = FetchJsonHandler {
            query: Some("q".into()),
            pointer: Some("/setup".into()),
            ..fetch("https://api.example.com/joke")
        };
        let (args, sent) = args_with_host("crab", host.clone());
        let message = InboundMessage::new("1@s.whatsapp.net", "");

        handler.call(&message, &args).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["Why did the crab cross?"]);
        assert_eq!(
            *host.fetched.lock().unwrap(),
            vec!["https://api.example.com/joke?q=crab"]
        );
    }

    #[test]
    fn test_menu_lists_each_command_once() {
        let registry = Arc::new(CommandRegistry::new());
        let noop = || handler_fn(|_, _| async { Ok(()) });
        registry.register(
            CommandDescriptor::new(["menu", "help"], noop())
                .with_help(vec!["Shows the command menu.".into()])
                .with_tags(vec!["utility".into()]),
        );
        registry.register(CommandDescriptor::new(["ping"], noop()));

        let (args, _) = args_with_sink("");
        let menu = MenuHandler::render("Nology", &registry, &args);

        assert!(menu.starts_with("Hi Ana! I am Nology"));
        assert_eq!(menu.matches("!menu:").count(), 1);
        assert!(!menu.contains("!help:"));
        assert!(menu.contains("*Uncategorized*\n  - !ping: _No description_"));
        assert!(menu.contains("*Utility*\n  - !menu: _Shows the command menu._"));
    }

    #[test]
    fn test_unknown_native_handler() {
        let registry = Arc::new(CommandRegistry::new());
        let catalog = HandlerCatalog::new("bot", &registry);
        let err = catalog
            .build(&HandlerSpec::Native { name: "missing".into() })
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::UnknownHandler(name) if name == "missing"));
    }

    #[test]
    fn test_native_names_are_sorted() {
        let registry = Arc::new(CommandRegistry::new());
        let noop = || handler_fn(|_, _| async { Ok(()) });
        let catalog = HandlerCatalog::new("bot", &registry)
            .with_native("whoami", noop())
            .with_native("ping", noop());
        assert_eq!(catalog.native_names(), vec!["ping", "whoami"]);
    }
}
