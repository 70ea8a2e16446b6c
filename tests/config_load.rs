// tests/config_load.rs
use std::{env, fs};

use topic_digest::config::{
    config_path, AgentConfig, DeliveryConfig, LlmProviderConfig, SearchConfig, ENV_CONFIG_PATH,
};

const FULL: &str = r#"
name = "Markets"
description = "Macro and market-moving news"
query = "fed rates"
window_days = 2
max_results = 50
prefilter_max = 20
report_size = 8
schedule_secs = 3600

[search]
kind = "newsapi"
api_key = "ENV"
language = "en"

[llm]
kind = "anthropic"
api_key = "env:MY_CLAUDE_KEY"
timeout_secs = 12

[delivery]
kind = "telegram"
bot_token = "ENV"
chat_id = "-100123"
"#;

#[serial_test::serial]
#[test]
fn secrets_are_resolved_from_env() {
    env::set_var("NEWSAPI_KEY", "news-key");
    env::set_var("MY_CLAUDE_KEY", "claude-key");
    env::set_var("TELEGRAM_BOT_TOKEN", "123:tok");

    let cfg = AgentConfig::from_toml_str(FULL).unwrap();
    assert_eq!(cfg.schedule_secs, Some(3600));
    match &cfg.search {
        SearchConfig::Newsapi {
            api_key, language, ..
        } => {
            assert_eq!(api_key, "news-key");
            assert_eq!(language.as_deref(), Some("en"));
        }
        other => panic!("unexpected search {other:?}"),
    }
    match &cfg.llm.provider {
        LlmProviderConfig::Anthropic { api_key, .. } => assert_eq!(api_key, "claude-key"),
        other => panic!("unexpected llm {other:?}"),
    }
    assert_eq!(cfg.llm.timeout_secs, 12);
    match &cfg.delivery {
        DeliveryConfig::Telegram {
            bot_token, chat_id, ..
        } => {
            assert_eq!(bot_token, "123:tok");
            assert_eq!(chat_id, "-100123");
        }
        other => panic!("unexpected delivery {other:?}"),
    }

    env::remove_var("NEWSAPI_KEY");
    env::remove_var("MY_CLAUDE_KEY");
    env::remove_var("TELEGRAM_BOT_TOKEN");
}

#[serial_test::serial]
#[test]
fn missing_secret_is_a_load_error() {
    env::remove_var("NEWSAPI_KEY");
    env::set_var("MY_CLAUDE_KEY", "x");
    env::set_var("TELEGRAM_BOT_TOKEN", "x");
    let err = AgentConfig::from_toml_str(FULL).unwrap_err();
    assert!(format!("{err:#}").contains("NEWSAPI_KEY"));
    env::remove_var("MY_CLAUDE_KEY");
    env::remove_var("TELEGRAM_BOT_TOKEN");
}

#[serial_test::serial]
#[test]
fn loads_from_file_and_path_resolution_prefers_explicit() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("agent.toml");
    fs::write(
        &p,
        r#"
        name = "File agent"
        query = "tokio"
        [search]
        kind = "rss"
        feeds = ["https://tokio.rs/blog/feed.xml"]
        [delivery]
        kind = "stdout"
        "#,
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    assert_eq!(config_path(None), p);
    let explicit = tmp.path().join("other.toml");
    assert_eq!(config_path(Some(explicit.clone())), explicit);
    env::remove_var(ENV_CONFIG_PATH);
    assert_eq!(config_path(None).to_str(), Some("config/agent.toml"));

    let cfg = AgentConfig::load_from_file(&p).unwrap();
    assert_eq!(cfg.name, "File agent");
    assert!(AgentConfig::load_from_file(tmp.path().join("missing.toml")).is_err());
}

#[serial_test::serial]
#[test]
fn shipped_example_config_is_valid() {
    env::set_var("OPENAI_API_KEY", "sk-test");
    env::set_var("TELEGRAM_BOT_TOKEN", "1:t");
    let cfg = AgentConfig::load_from_file("config/agent.example.toml").unwrap();
    assert_eq!(cfg.report_size, 10);
    assert!(matches!(cfg.llm.provider, LlmProviderConfig::Openai { .. }));
    env::remove_var("OPENAI_API_KEY");
    env::remove_var("TELEGRAM_BOT_TOKEN");
}
