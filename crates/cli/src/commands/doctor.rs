//! `bixso doctor` — Diagnose configuration and connectivity.

use bixso_config::AppConfig;
use bixso_core::{DocumentStore as _, Provider as _};

pub async fn run() -> anyhow::Result<()> {
    println!("🩺 Bixso Doctor — System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue found. See above for details.");
            return Ok(());
        }
    };

    // API key
    if config.has_api_key() {
        println!("  ✅ API key configured ({})", config.default_provider);
    } else {
        println!(
            "  ⚠️  No API key for provider '{}' — set OPENAI_API_KEY or GOOGLE_API_KEY",
            config.default_provider
        );
        issues += 1;
    }

    // Provider reachability
    match bixso_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ❌ Provider '{}' unreachable", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider check failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ⚠️  Provider not built: {e}");
            issues += 1;
        }
    }

    // Store reachability
    match bixso_store::build_from_config(&config.store) {
        Ok(store) => match store.health_check().await {
            Ok(true) => println!("  ✅ Store '{}' reachable", config.store.backend),
            Ok(false) => {
                println!("  ❌ Store '{}' unreachable", config.store.backend);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Store check failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ⚠️  Store not built: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
