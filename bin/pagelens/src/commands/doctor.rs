use pagelens_core::{Config, Paths};
use pagelens_providers::{LanguageModel, LocalModel};

use super::provider;

/// Run full environment diagnostics.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("🩺 pagelens doctor — Environment Diagnostics");
    println!("================================");
    println!();

    let mut ok_count = 0u32;
    let mut warn_count = 0u32;
    let mut err_count = 0u32;

    // --- 1. Config ---
    println!("📋 Configuration");
    let config_file = paths.config_file();
    let config = if config_file.exists() {
        match Config::load(&config_file) {
            Ok(config) => {
                print_ok("Config file parses", &config_file.display().to_string());
                ok_count += 1;
                config
            }
            Err(e) => {
                print_err("Config file unreadable", &e.to_string());
                err_count += 1;
                Config::default()
            }
        }
    } else {
        print_warn(
            "No config file yet",
            "Defaults are in effect; `pagelens config set` creates one",
        );
        warn_count += 1;
        Config::default()
    };

    if config.settings.enabled {
        print_ok("Annotations enabled", "");
        ok_count += 1;
    } else {
        print_warn("Annotations disabled", "Set settings.enabled to true to annotate pages");
        warn_count += 1;
    }
    println!(
        "  Theme: {} ({})",
        config.settings.theme.name,
        match config.settings.theme.mode {
            pagelens_core::ThemeMode::Auto => "auto",
            pagelens_core::ThemeMode::Light => "light",
            pagelens_core::ThemeMode::Dark => "dark",
        }
    );
    println!();

    // --- 2. Storage ---
    println!("📁 Storage");
    if paths.base.exists() {
        print_ok("Data directory exists", &paths.base.display().to_string());
        ok_count += 1;

        // Check writable
        let test_file = paths.base.join(".doctor_test");
        match std::fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_file);
                print_ok("Data directory writable", "");
                ok_count += 1;
            }
            Err(e) => {
                print_err("Data directory not writable", &e.to_string());
                err_count += 1;
            }
        }
    } else {
        print_warn(
            "Data directory not created yet",
            "Created on the first config write",
        );
        warn_count += 1;
    }

    let reports = paths.reports_dir();
    if reports.exists() {
        print_ok("Reports directory", &reports.display().to_string());
        ok_count += 1;
    }
    println!();

    // --- 3. Detection ---
    println!("🔍 Detection");
    check_toggle("ads", config.settings.detect_ads);
    check_toggle("links", config.settings.detect_links);
    check_toggle("forms", config.settings.detect_forms);
    check_toggle("hidden", config.settings.detect_hidden);
    check_toggle("indicators", config.settings.show_indicators);
    println!();

    // --- 4. Model ---
    println!("🤖 Model");
    let (api_base, model_name) = provider::model_endpoint();
    if config.settings.ai_enabled {
        let model = LocalModel::new(Some(&api_base), Some(&model_name));
        if model.is_available().await {
            print_ok(
                "Model server reachable",
                &format!("{} ({})", api_base, model_name),
            );
            ok_count += 1;
        } else {
            print_warn(
                &format!("Model server unreachable at {}", api_base),
                "Start the server or set PAGELENS_MODEL_URL",
            );
            warn_count += 1;
        }
        println!(
            "  Budget: {} calls/min, cache {} entries / {} min",
            config.tuning.model_calls_per_minute,
            config.tuning.model_cache_capacity,
            config.tuning.model_cache_ttl_ms / 60_000
        );
    } else {
        println!("  ⚪ AI insights off (settings.aiEnabled); heuristics only");
    }
    println!();

    // --- 5. Look Out ---
    println!("🔭 Look Out");
    let lookout = &config.look_out_config;
    if lookout.enabled {
        if lookout.criteria.is_empty() {
            print_warn(
                "Enabled with no criteria",
                "Add one with `pagelens lookout add`",
            );
            warn_count += 1;
        } else {
            print_ok(
                &format!(
                    "{} criteri{} active",
                    lookout.criteria.len(),
                    if lookout.criteria.len() == 1 { "on" } else { "a" }
                ),
                "",
            );
            ok_count += 1;
        }
    } else {
        println!("  ⚪ disabled (lookOutConfig.enabled)");
    }
    println!(
        "  Relevance threshold: {}/100",
        config.tuning.lookout_threshold
    );
    println!();

    // --- Summary ---
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "  ✅ {} passed  ⚠️  {} warnings  ❌ {} errors",
        ok_count, warn_count, err_count
    );

    if err_count > 0 {
        println!();
        println!("  {} error(s) must be fixed before normal use.", err_count);
    } else if warn_count > 0 {
        println!();
        println!("  Core features OK. Some optional features not ready.");
    } else {
        println!();
        println!("  🎉 All good!");
    }
    println!();

    Ok(())
}

fn print_ok(label: &str, detail: &str) {
    if detail.is_empty() {
        println!("  ✅ {}", label);
    } else {
        println!("  ✅ {} — {}", label, detail);
    }
}

fn print_warn(label: &str, hint: &str) {
    if hint.is_empty() {
        println!("  ⚠️  {}", label);
    } else {
        println!("  ⚠️  {} — {}", label, hint);
    }
}

fn print_err(label: &str, hint: &str) {
    if hint.is_empty() {
        println!("  ❌ {}", label);
    } else {
        println!("  ❌ {} — {}", label, hint);
    }
}

fn check_toggle(name: &str, enabled: bool) {
    if enabled {
        println!("  ✅ {:<10} on", name);
    } else {
        println!("  ⚪ {:<10} off", name);
    }
}
