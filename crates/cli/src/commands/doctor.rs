//! The `doctor` command — sanity-check configuration and credentials.

use newsbrief_config::AppConfig;

fn check(label: &str, ok: bool, hint: &str) {
    if ok {
        println!("  ✓ {label}");
    } else {
        println!("  ✗ {label} — {hint}");
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("newsbrief doctor\n");

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✓ Configuration loads");
            config
        }
        Err(e) => {
            println!("  ✗ Configuration failed to load: {e}");
            return Ok(());
        }
    };

    check(
        "LLM API key",
        config.has_api_key(),
        "set NEWSBRIEF_API_KEY or OPENAI_API_KEY",
    );
    check(
        "Graph credentials",
        config.has_graph_credentials(),
        "set graph.client_id, graph.tenant_id, graph.user_id and GRAPH_CLIENT_SECRET",
    );
    check(
        "Digest recipient",
        !config.graph.receiver_email.is_empty(),
        "set graph.receiver_email",
    );
    check(
        "Newsletter senders",
        !config.graph.senders.is_empty(),
        "add at least one address to graph.senders",
    );

    println!(
        "\n  Model: {}  (embeddings: {})",
        config.default_model, config.embedding_model
    );
    println!("  Database: {}", config.storage.database_path);
    println!("  Transition budget: {}", config.agent.max_transitions);

    Ok(())
}
