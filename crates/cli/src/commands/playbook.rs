//! `quillmind apply|recall|show|feedback|reset|stats`: playbook commands.

use quillmind_core::operation::{parse_feedback, parse_operations};
use quillmind_memory::PlaybookService;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Read a JSON document from `file`, or stdin when absent.
fn read_json(file: Option<&Path>) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON input: {e}"))?)
}

pub async fn apply(
    service: &PlaybookService,
    work_id: &str,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let operations = parse_operations(&read_json(file)?);
    let outcome = service.apply(work_id, &operations).await;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

pub async fn recall(
    service: &PlaybookService,
    work_id: &str,
    query: &str,
    top_k: Option<usize>,
    budget: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let injection = service.recall(work_id, query, top_k, budget).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&injection)?);
    } else if injection.text.is_empty() {
        eprintln!("No matching bullets.");
    } else {
        print!("{}", injection.text);
    }
    Ok(())
}

pub async fn show(
    service: &PlaybookService,
    work_id: &str,
    budget: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = service.curator_view(work_id, budget).await;
    print!("{}", view.text);
    Ok(())
}

pub async fn feedback(
    service: &PlaybookService,
    work_id: &str,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = parse_feedback(&read_json(file)?);
    let updated = service.feedback(work_id, &entries).await;
    println!("{}", serde_json::json!({ "updated": updated }));
    Ok(())
}

pub async fn reset(
    service: &PlaybookService,
    work_id: &str,
    confirm: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !confirm {
        println!("⚠️  This will delete every bullet for work '{work_id}'.");
        println!("   Run with --confirm to proceed:");
        println!("   quillmind reset --work {work_id} --confirm");
        return Ok(());
    }
    service.reset(work_id).await;
    println!("✅ Playbook for '{work_id}' reset.");
    Ok(())
}

pub async fn stats(service: &PlaybookService, work_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stats = service.stats(work_id).await;

    println!("Playbook: {}", stats.work_id);
    println!("==========");
    println!("  Bullets:   {}", stats.total_bullets);
    println!("  Next id:   {}", stats.next_bullet_seq);
    println!("  Backend:   {}", service.store().backend_name());
    println!("  Embedder:  {}", service.embeddings().provider_name());
    println!();
    for section in &stats.sections {
        println!(
            "  {:<14} {:>4} bullets  hits={:<5} helpful={:<4} harmful={}",
            section.title, section.bullets, section.hits, section.helpful, section.harmful
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_json_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");
        std::fs::write(&path, r#"[{"type":"ADD","section":"misc","content":"A sufficiently long note"}]"#)
            .unwrap();
        let value = read_json(Some(&path)).unwrap();
        assert_eq!(parse_operations(&value).len(), 1);
    }

    #[test]
    fn read_json_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_json(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON input"));
    }
}
